//! Agent-side remote control for Minecraft instances running the MCio mod.
//!
//! The mod exposes two localhost TCP channels: the agent pushes
//! [`ActionPacket`]s (keyboard, mouse, cursor and server-command inputs) and
//! pulls [`ObservationPacket`]s (the rendered frame plus structured game
//! state). Two controllers sit on top of that exchange: [`ControllerSync`]
//! pairs every action with the next observation, while [`ControllerAsync`]
//! streams and keeps only the freshest observation. The [`env`] module builds
//! reinforcement-learning style environments on the controllers,
//! [`env::McioEnv`] and [`env::MinerlEnv`].

pub mod controller;
pub mod env;
pub mod glfw;
pub mod net;
pub mod util;

pub use controller::{Controller, ControllerAsync, ControllerSync};
pub use env::{McioBaseEnv, McioEnv, MinerlEnv, ResetOptions, RunOptions, StepOutcome};
pub use net::{
    ActionPacket, ConnectError, ConnectOptions, Connection, InputEvent, InputId, InputType,
    McioMode, ObservationOption, ObservationPacket, PROTOCOL_VERSION,
};
pub use util::{LatestItemQueue, RecvError, TrackPerSecond};
