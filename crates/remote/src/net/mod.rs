mod codec;
mod connection;
mod protocol;
mod transport;

pub use codec::{CodecError, MCIO_TYPE_KEY, McioType, Tag, decode, encode};
pub use connection::{ConnectError, ConnectOptions, Connection};
pub use protocol::{
    ActionPacket, DEFAULT_ACTION_PORT, DEFAULT_HOST, DEFAULT_OBSERVATION_PORT, InputEvent, InputId,
    InputType, InventorySlot, McioMode, ObservationOption, ObservationPacket, PROTOCOL_VERSION,
    StatCategory, StatEntry, StatsSnapshot,
};
pub use transport::POLL_INTERVAL;
