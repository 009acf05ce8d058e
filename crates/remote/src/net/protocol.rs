//! MCio protocol messages.
//!
//! Two packet types cross the wire: [`ActionPacket`] (agent to mod) and
//! [`ObservationPacket`] (mod to agent). Both are CBOR maps tagged with the
//! [`MCIO_TYPE_KEY`](super::codec::MCIO_TYPE_KEY) discriminator; see the
//! codec module for the encoding rules.

use std::fmt;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;

use super::codec::{self, CodecError, McioType, Tag};
use crate::glfw;

pub const PROTOCOL_VERSION: u32 = 3;

// For security, only localhost.
pub const DEFAULT_HOST: std::net::IpAddr =
    std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
pub const DEFAULT_ACTION_PORT: u16 = 4001; // 4ction
pub const DEFAULT_OBSERVATION_PORT: u16 = 8001; // 8bservation

/// The mod's operating mode. In sync mode the game advances one tick per
/// received action; in async mode observations stream at the game's own
/// cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum McioMode {
    Sync,
    #[default]
    Async,
}

impl McioMode {
    /// The mode string carried in [`ObservationPacket::mode`].
    pub fn wire_name(&self) -> &'static str {
        match self {
            McioMode::Sync => "SYNC",
            McioMode::Async => "ASYNC",
        }
    }
}

/// Whether an input is a keyboard key or a mouse button. Encoded as an
/// integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputType {
    Key,
    Mouse,
}

impl Serialize for InputType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(match self {
            InputType::Key => 0,
            InputType::Mouse => 1,
        })
    }
}

impl<'de> Deserialize<'de> for InputType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i64::deserialize(deserializer)? {
            0 => Ok(InputType::Key),
            1 => Ok(InputType::Mouse),
            other => Err(de::Error::custom(format_args!(
                "invalid input type: {other}"
            ))),
        }
    }
}

/// Identifies one hold-able input: a key or a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputId {
    pub kind: InputType,
    pub code: i32,
}

impl InputId {
    pub const fn new(kind: InputType, code: i32) -> Self {
        Self { kind, code }
    }
}

/// A press or release edge for a single input. `action` is a GLFW input
/// action, [`glfw::PRESS`] or [`glfw::RELEASE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(rename = "__mcio_type__", default)]
    tag: Tag<InputEvent>,
    #[serde(rename = "type")]
    pub kind: InputType,
    pub code: i32,
    pub action: i32,
}

impl InputEvent {
    pub fn new(kind: InputType, code: i32, action: i32) -> Self {
        Self {
            tag: Tag::default(),
            kind,
            code,
            action,
        }
    }

    pub fn from_id(id: InputId, action: i32) -> Self {
        Self::new(id.kind, id.code, action)
    }

    pub fn id(&self) -> InputId {
        InputId::new(self.kind, self.code)
    }
}

impl McioType for InputEvent {
    const TAG: &'static str = ".InputEvent";
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySlot {
    pub slot: i32,
    pub id: String,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatEntry {
    pub id: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatCategory {
    pub category: String,
    pub stats: Vec<StatEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub categories: Vec<StatCategory>,
}

/// Auxiliary payloads attached to an observation. The concrete variant is
/// selected by the `__mcio_type__` discriminator; unrecognized tags decode to
/// [`ObservationOption::Unknown`] so one unexpected option cannot take down
/// the whole packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__mcio_type__")]
pub enum ObservationOption {
    /// Authoritative snapshot of every stat counter.
    #[serde(rename = ".StatsFullOption")]
    StatsFull(StatsSnapshot),
    /// Incremental stat deltas since the previous update.
    #[serde(rename = ".StatsUpdateOption")]
    StatsUpdate(StatsSnapshot),
    #[serde(other)]
    Unknown,
}

/// One game tick's worth of world state, received from the mod.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationPacket {
    #[serde(rename = "__mcio_type__")]
    pub tag: Tag<ObservationPacket>,
    pub version: u32,
    pub sequence: u64,
    /// "SYNC" or "ASYNC".
    pub mode: String,
    /// Sequence of the last action the mod had processed when this frame was
    /// captured.
    pub last_action_sequence: u64,
    /// Frame number since Minecraft started.
    pub frame_sequence: u64,
    /// Compressed frame bytes, PNG or JPEG. The format is discoverable from
    /// the bytes themselves.
    pub frame: ByteBuf,
    /// [`glfw::CURSOR_NORMAL`] or [`glfw::CURSOR_DISABLED`].
    pub cursor_mode: i32,
    pub cursor_pos: (i32, i32),
    pub health: f32,
    /// Float world coordinates; the fraction is the position within the block.
    pub player_pos: (f32, f32, f32),
    pub player_pitch: f32,
    pub player_yaw: f32,
    pub inventory_main: Vec<InventorySlot>,
    pub inventory_armor: Vec<InventorySlot>,
    pub inventory_offhand: Vec<InventorySlot>,
    pub options: Vec<ObservationOption>,
}

impl McioType for ObservationPacket {
    const TAG: &'static str = ".ObservationPacket";
}

impl Default for ObservationPacket {
    fn default() -> Self {
        Self {
            tag: Tag::default(),
            version: PROTOCOL_VERSION,
            sequence: 0,
            mode: String::new(),
            last_action_sequence: 0,
            frame_sequence: 0,
            frame: ByteBuf::new(),
            cursor_mode: glfw::CURSOR_NORMAL,
            cursor_pos: (0, 0),
            health: 0.0,
            player_pos: (0.0, 0.0, 0.0),
            player_pitch: 0.0,
            player_yaw: 0.0,
            inventory_main: Vec::new(),
            inventory_armor: Vec::new(),
            inventory_offhand: Vec::new(),
            options: Vec::new(),
        }
    }
}

// Hand-written so the frame bytes show up as a length instead of a dump.
impl fmt::Debug for ObservationPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationPacket")
            .field("version", &self.version)
            .field("sequence", &self.sequence)
            .field("mode", &self.mode)
            .field("last_action_sequence", &self.last_action_sequence)
            .field("frame_sequence", &self.frame_sequence)
            .field("frame_len", &self.frame.len())
            .field("cursor_mode", &self.cursor_mode)
            .field("cursor_pos", &self.cursor_pos)
            .field("health", &self.health)
            .field("player_pos", &self.player_pos)
            .field("player_pitch", &self.player_pitch)
            .field("player_yaw", &self.player_yaw)
            .field("inventory_main", &self.inventory_main)
            .field("inventory_armor", &self.inventory_armor)
            .field("inventory_offhand", &self.inventory_offhand)
            .field("options", &self.options)
            .finish()
    }
}

impl ObservationPacket {
    /// Decode an observation. Returns `None` on any decode failure or
    /// protocol version mismatch; both are logged and the packet dropped.
    pub fn unpack(data: &[u8]) -> Option<Self> {
        let obs: Self = match codec::decode(data) {
            Ok(obs) => obs,
            Err(err) => {
                log::error!("observation decode error: {err}");
                return None;
            }
        };
        if obs.version != PROTOCOL_VERSION {
            let err = CodecError::VersionMismatch {
                actual: obs.version,
                expected: PROTOCOL_VERSION,
            };
            log::error!("{err}");
            return None;
        }
        for opt in &obs.options {
            if matches!(opt, ObservationOption::Unknown) {
                log::error!("observation carried an unknown option type");
            }
        }
        Some(obs)
    }

    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Guess the frame's image format from its bytes.
    pub fn frame_format(&self) -> Option<image::ImageFormat> {
        image::guess_format(&self.frame).ok()
    }

    /// Decode the compressed frame into an RGB image.
    pub fn frame_image(&self) -> Result<image::RgbImage, image::ImageError> {
        image::load_from_memory(&self.frame).map(|img| img.to_rgb8())
    }
}

/// One step's worth of agent intent, sent to the mod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPacket {
    #[serde(rename = "__mcio_type__")]
    pub tag: Tag<ActionPacket>,
    pub version: u32,
    /// Set by the controller at send time; caller-supplied values are
    /// overwritten.
    pub sequence: u64,
    /// Server commands to execute (teleport, time set, etc.). No leading
    /// slash.
    pub commands: Vec<String>,
    /// Tell Minecraft to exit cleanly.
    pub stop: bool,
    /// Release all held keys and buttons before applying this action.
    pub clear_input: bool,
    pub inputs: Vec<InputEvent>,
    /// Absolute cursor positions, applied in order.
    pub cursor_pos: Vec<(i32, i32)>,
}

impl McioType for ActionPacket {
    const TAG: &'static str = ".ActionPacket";
}

impl Default for ActionPacket {
    fn default() -> Self {
        Self {
            tag: Tag::default(),
            version: PROTOCOL_VERSION,
            sequence: 0,
            commands: Vec::new(),
            stop: false,
            clear_input: false,
            inputs: Vec::new(),
            cursor_pos: Vec::new(),
        }
    }
}

impl ActionPacket {
    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Decode an action. Used by the Minecraft side of the connection; the
    /// failure behavior matches [`ObservationPacket::unpack`].
    pub fn unpack(data: &[u8]) -> Option<Self> {
        let action: Self = match codec::decode(data) {
            Ok(action) => action,
            Err(err) => {
                log::error!("action decode error: {err}");
                return None;
            }
        };
        if action.version != PROTOCOL_VERSION {
            let err = CodecError::VersionMismatch {
                actual: action.version,
                expected: PROTOCOL_VERSION,
            };
            log::error!("{err}");
            return None;
        }
        Some(action)
    }
}
