//! Environment compatible with the MineRL 1.0 action and observation spaces.
//!
//! Only the spaces are replicated: the same named inputs, a `camera` action
//! carrying `(pitch_delta, yaw_delta)` in degrees, and a `pov` observation.
//! The camera is relative movement. Absolute pitch is limited to -90 (up) to
//! 90 (down) by the game, which also wraps yaw, so no clamping happens here.

use image::RgbImage;

use super::base::{EnvState, EnvSpace, McioBaseEnv};
use super::cursor::DegreesToPixels;
use super::input::InputStateManager;
use crate::glfw;
use crate::net::{ActionPacket, InputId, InputType, ObservationPacket};

/// MineRL action name to Minecraft input. The action space additionally has
/// `ESC` and `camera`, which never reach the mod.
pub const INPUT_MAP: &[(&str, InputId)] = &[
    ("attack", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_LEFT)),
    ("use", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_RIGHT)),
    ("pickItem", InputId::new(InputType::Mouse, glfw::MOUSE_BUTTON_MIDDLE)),
    ("forward", InputId::new(InputType::Key, glfw::KEY_W)),
    ("left", InputId::new(InputType::Key, glfw::KEY_A)),
    ("right", InputId::new(InputType::Key, glfw::KEY_D)),
    ("back", InputId::new(InputType::Key, glfw::KEY_S)),
    ("drop", InputId::new(InputType::Key, glfw::KEY_Q)),
    ("inventory", InputId::new(InputType::Key, glfw::KEY_E)),
    ("jump", InputId::new(InputType::Key, glfw::KEY_SPACE)),
    ("sneak", InputId::new(InputType::Key, glfw::KEY_LEFT_SHIFT)),
    ("sprint", InputId::new(InputType::Key, glfw::KEY_LEFT_CONTROL)),
    ("swapHands", InputId::new(InputType::Key, glfw::KEY_F)),
    ("hotbar.1", InputId::new(InputType::Key, glfw::KEY_1)),
    ("hotbar.2", InputId::new(InputType::Key, glfw::KEY_2)),
    ("hotbar.3", InputId::new(InputType::Key, glfw::KEY_3)),
    ("hotbar.4", InputId::new(InputType::Key, glfw::KEY_4)),
    ("hotbar.5", InputId::new(InputType::Key, glfw::KEY_5)),
    ("hotbar.6", InputId::new(InputType::Key, glfw::KEY_6)),
    ("hotbar.7", InputId::new(InputType::Key, glfw::KEY_7)),
    ("hotbar.8", InputId::new(InputType::Key, glfw::KEY_8)),
    ("hotbar.9", InputId::new(InputType::Key, glfw::KEY_9)),
];

/// One step in the MineRL action space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinerlAction {
    pub attack: bool,
    pub use_item: bool,
    pub pick_item: bool,
    pub forward: bool,
    pub left: bool,
    pub right: bool,
    pub back: bool,
    pub drop: bool,
    pub inventory: bool,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
    pub swap_hands: bool,
    pub hotbar_1: bool,
    pub hotbar_2: bool,
    pub hotbar_3: bool,
    pub hotbar_4: bool,
    pub hotbar_5: bool,
    pub hotbar_6: bool,
    pub hotbar_7: bool,
    pub hotbar_8: bool,
    pub hotbar_9: bool,
    /// Special case: not passed to Minecraft, signals the environment to
    /// terminate.
    pub esc: bool,
    /// View change in degrees, `(pitch_delta, yaw_delta)`, each within
    /// ±180.
    pub camera: (f32, f32),
}

impl MinerlAction {
    pub fn held_inputs(&self) -> [(&'static str, bool); 22] {
        [
            ("attack", self.attack),
            ("use", self.use_item),
            ("pickItem", self.pick_item),
            ("forward", self.forward),
            ("left", self.left),
            ("right", self.right),
            ("back", self.back),
            ("drop", self.drop),
            ("inventory", self.inventory),
            ("jump", self.jump),
            ("sneak", self.sneak),
            ("sprint", self.sprint),
            ("swapHands", self.swap_hands),
            ("hotbar.1", self.hotbar_1),
            ("hotbar.2", self.hotbar_2),
            ("hotbar.3", self.hotbar_3),
            ("hotbar.4", self.hotbar_4),
            ("hotbar.5", self.hotbar_5),
            ("hotbar.6", self.hotbar_6),
            ("hotbar.7", self.hotbar_7),
            ("hotbar.8", self.hotbar_8),
            ("hotbar.9", self.hotbar_9),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct MinerlObservation {
    pub pov: RgbImage,
}

#[derive(Debug, Default)]
pub struct MinerlSpace {
    input_mgr: InputStateManager,
    cursor_map: DegreesToPixels,
    terminated: bool,
    /// Extra state updated from observations.
    pub last_pitch: f32,
    pub last_yaw: f32,
}

impl MinerlSpace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvSpace for MinerlSpace {
    type Action = MinerlAction;
    type Observation = MinerlObservation;

    fn reset_state(&mut self) {
        *self = Self::new();
    }

    fn action_to_packet(
        &mut self,
        _state: &EnvState,
        action: &MinerlAction,
        commands: &[String],
    ) -> ActionPacket {
        let (pitch_delta, yaw_delta) = action.camera;
        let (x, y) = self
            .cursor_map
            .update(yaw_delta as f64, pitch_delta as f64);

        if action.esc {
            // Signal termination without involving the mod.
            self.terminated = true;
        }

        ActionPacket {
            inputs: self.input_mgr.process_action(action.held_inputs(), INPUT_MAP),
            cursor_pos: vec![(x.round() as i32, y.round() as i32)],
            commands: commands.to_vec(),
            ..ActionPacket::default()
        }
    }

    fn packet_to_observation(
        &mut self,
        state: &EnvState,
        packet: &ObservationPacket,
    ) -> MinerlObservation {
        // Re-anchor the camera mapping to the cursor position the mod
        // actually applied, so the view does not drift.
        let (x, y) = state.last_cursor_pos;
        self.cursor_map.set(x as f64, y as f64);
        self.last_pitch = packet.player_pitch;
        self.last_yaw = packet.player_yaw;
        MinerlObservation {
            pov: state
                .last_frame
                .clone()
                .unwrap_or_else(|| RgbImage::new(0, 0)),
        }
    }

    fn process_step(
        &mut self,
        _action: &MinerlAction,
        _observation: &MinerlObservation,
    ) -> (f32, bool, bool) {
        (0.0, self.terminated, false)
    }

    fn noop_action(&self) -> MinerlAction {
        // Camera stays put for a noop.
        MinerlAction::default()
    }
}

/// Environment with the MineRL 1.0 spaces.
pub type MinerlEnv = McioBaseEnv<MinerlSpace>;
