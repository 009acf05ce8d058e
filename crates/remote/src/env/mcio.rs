//! The native MCio action and observation space: per-step held/not-held
//! flags for a fixed set of keys and buttons, plus a relative cursor delta in
//! pixels.

use image::RgbImage;

use super::base::{EnvState, EnvSpace, McioBaseEnv};
use super::cursor::DEGREES_PER_PIXEL;
use super::input::InputStateManager;
use crate::glfw;
use crate::net::{ActionPacket, InputId, InputType, ObservationPacket};

/// Action name to Minecraft input.
pub const INPUT_MAP: &[(&str, InputId)] = &[
    ("LEFT_BUTTON", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_LEFT)),
    ("RIGHT_BUTTON", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_RIGHT)),
    ("MIDDLE_BUTTON", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_MIDDLE)),
    ("W", InputId::new(InputType::Key, glfw::KEY_W)),
    ("A", InputId::new(InputType::Key, glfw::KEY_A)),
    ("D", InputId::new(InputType::Key, glfw::KEY_D)),
    ("S", InputId::new(InputType::Key, glfw::KEY_S)),
    ("Q", InputId::new(InputType::Key, glfw::KEY_Q)),
    ("E", InputId::new(InputType::Key, glfw::KEY_E)),
    ("SPACE", InputId::new(InputType::Key, glfw::KEY_SPACE)),
    ("LEFT_SHIFT", InputId::new(InputType::Key, glfw::KEY_LEFT_SHIFT)),
    ("LEFT_CONTROL", InputId::new(InputType::Key, glfw::KEY_LEFT_CONTROL)),
    ("F", InputId::new(InputType::Key, glfw::KEY_F)),
    ("1", InputId::new(InputType::Key, glfw::KEY_1)),
    ("2", InputId::new(InputType::Key, glfw::KEY_2)),
    ("3", InputId::new(InputType::Key, glfw::KEY_3)),
    ("4", InputId::new(InputType::Key, glfw::KEY_4)),
    ("5", InputId::new(InputType::Key, glfw::KEY_5)),
    ("6", InputId::new(InputType::Key, glfw::KEY_6)),
    ("7", InputId::new(InputType::Key, glfw::KEY_7)),
    ("8", InputId::new(InputType::Key, glfw::KEY_8)),
    ("9", InputId::new(InputType::Key, glfw::KEY_9)),
];

/// Largest cursor move accepted per step: a 180 degree turn.
pub const MAX_CURSOR_DELTA: i32 = (180.0 / DEGREES_PER_PIXEL) as i32;

/// One step's inputs. Every flag means "hold this input down for the step";
/// the environment converts the flags into press/release edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McioAction {
    pub left_button: bool,
    pub right_button: bool,
    pub middle_button: bool,
    pub w: bool,
    pub a: bool,
    pub d: bool,
    pub s: bool,
    pub q: bool,
    pub e: bool,
    pub space: bool,
    pub left_shift: bool,
    pub left_control: bool,
    pub f: bool,
    pub key_1: bool,
    pub key_2: bool,
    pub key_3: bool,
    pub key_4: bool,
    pub key_5: bool,
    pub key_6: bool,
    pub key_7: bool,
    pub key_8: bool,
    pub key_9: bool,
    /// Cursor movement in pixels relative to the current position, clamped
    /// to ±[`MAX_CURSOR_DELTA`].
    pub cursor_delta: (i32, i32),
}

impl McioAction {
    /// The action's `(name, held)` pairs, keyed like [`INPUT_MAP`].
    pub fn held_inputs(&self) -> [(&'static str, bool); 22] {
        [
            ("LEFT_BUTTON", self.left_button),
            ("RIGHT_BUTTON", self.right_button),
            ("MIDDLE_BUTTON", self.middle_button),
            ("W", self.w),
            ("A", self.a),
            ("D", self.d),
            ("S", self.s),
            ("Q", self.q),
            ("E", self.e),
            ("SPACE", self.space),
            ("LEFT_SHIFT", self.left_shift),
            ("LEFT_CONTROL", self.left_control),
            ("F", self.f),
            ("1", self.key_1),
            ("2", self.key_2),
            ("3", self.key_3),
            ("4", self.key_4),
            ("5", self.key_5),
            ("6", self.key_6),
            ("7", self.key_7),
            ("8", self.key_8),
            ("9", self.key_9),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct McioObservation {
    pub frame: RgbImage,
    pub pos: (f32, f32, f32),
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Default)]
pub struct McioSpace {
    input_mgr: InputStateManager,
}

impl McioSpace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvSpace for McioSpace {
    type Action = McioAction;
    type Observation = McioObservation;

    fn reset_state(&mut self) {
        self.input_mgr = InputStateManager::new();
    }

    fn action_to_packet(
        &mut self,
        state: &EnvState,
        action: &McioAction,
        commands: &[String],
    ) -> ActionPacket {
        let (dx, dy) = action.cursor_delta;
        let cursor_pos = (
            state.last_cursor_pos.0 + dx.clamp(-MAX_CURSOR_DELTA, MAX_CURSOR_DELTA),
            state.last_cursor_pos.1 + dy.clamp(-MAX_CURSOR_DELTA, MAX_CURSOR_DELTA),
        );
        ActionPacket {
            inputs: self.input_mgr.process_action(action.held_inputs(), INPUT_MAP),
            cursor_pos: vec![cursor_pos],
            commands: commands.to_vec(),
            ..ActionPacket::default()
        }
    }

    fn packet_to_observation(
        &mut self,
        state: &EnvState,
        packet: &ObservationPacket,
    ) -> McioObservation {
        McioObservation {
            frame: state
                .last_frame
                .clone()
                .unwrap_or_else(|| RgbImage::new(0, 0)),
            pos: packet.player_pos,
            pitch: packet.player_pitch,
            yaw: packet.player_yaw,
        }
    }

    fn process_step(
        &mut self,
        _action: &McioAction,
        _observation: &McioObservation,
    ) -> (f32, bool, bool) {
        (0.0, false, false)
    }

    fn noop_action(&self) -> McioAction {
        McioAction::default()
    }
}

/// Environment with the native MCio action space.
pub type McioEnv = McioBaseEnv<McioSpace>;
