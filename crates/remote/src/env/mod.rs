pub mod base;
pub mod cursor;
pub mod input;
pub mod mcio;
pub mod minerl;
pub mod stats;

pub use base::{
    DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, EnvError, EnvInfo, EnvSpace, EnvState, FrameSink,
    Launcher, McioBaseEnv, RenderMode, ResetOptions, RunOptions, StepOutcome,
};
pub use cursor::{DEGREES_PER_PIXEL, DegreesToPixels, PIXELS_PER_DEGREE, draw_crosshair};
pub use input::InputStateManager;
pub use mcio::{MAX_CURSOR_DELTA, McioAction, McioEnv, McioObservation, McioSpace};
pub use minerl::{MinerlAction, MinerlEnv, MinerlObservation, MinerlSpace};
pub use stats::StatsCache;
