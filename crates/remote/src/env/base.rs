//! Base environment shared by the concrete action/observation spaces.
//!
//! [`McioBaseEnv`] owns the controller and the state carried across steps;
//! an [`EnvSpace`] implementation defines the action and observation shapes
//! and the translation to and from protocol packets.

use std::collections::HashMap;
use std::time::Duration;

use image::RgbImage;

use super::cursor;
use crate::controller::{Controller, ControllerAsync, ControllerSync};
use crate::glfw;
use crate::net::{
    ActionPacket, ConnectError, ConnectOptions, DEFAULT_ACTION_PORT, DEFAULT_OBSERVATION_PORT,
    InputEvent, InputId, InputType, McioMode, ObservationPacket,
};

pub const DEFAULT_WINDOW_WIDTH: u32 = 854;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 480;

/// Extra key/value details returned from reset and step.
pub type EnvInfo = HashMap<String, String>;

/// Configuration for an environment run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Frame width the Minecraft window was launched with.
    pub width: u32,
    /// Frame height the Minecraft window was launched with.
    pub height: u32,
    pub mode: McioMode,
    pub action_port: u16,
    pub observation_port: u16,
    pub wait_for_connection: bool,
    pub connection_timeout: Option<Duration>,
    /// How many no-op steps reset() may spend waiting for the player to
    /// leave the death screen. Even with immediate respawn enabled the
    /// respawn takes a few ticks; slow machines may need a larger bound.
    pub respawn_retry_steps: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            mode: McioMode::default(),
            action_port: DEFAULT_ACTION_PORT,
            observation_port: DEFAULT_OBSERVATION_PORT,
            wait_for_connection: true,
            connection_timeout: None,
            respawn_retry_steps: 10,
        }
    }
}

impl RunOptions {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            action_port: self.action_port,
            observation_port: self.observation_port,
            wait_for_connection: self.wait_for_connection,
            connection_timeout: self.connection_timeout,
        }
    }
}

/// Options for reset() and step().
///
/// `commands` are server commands used to set up the world (teleport, time
/// set, etc.). No leading slash. Commands take a varying number of ticks to
/// take effect in Minecraft; follow up with
/// [`skip_steps`](McioBaseEnv::skip_steps) to let them settle.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Push frames to the attached [`FrameSink`].
    Human,
    /// Return frames from [`McioBaseEnv::render`].
    RgbArray,
}

/// Display collaborator for [`RenderMode::Human`]. The environment only
/// pushes frames; window management is the sink's concern.
pub trait FrameSink {
    fn show(&mut self, frame: &RgbImage);
    fn close(&mut self) {}
}

/// Handle to a Minecraft process the caller launched. The environment only
/// needs to shut it down on close; everything else about launching is the
/// caller's concern.
pub trait Launcher {
    fn close(&mut self);
}

#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("environment still terminated after {steps} respawn steps")]
    ResetFailed { steps: u32 },
    #[error("environment is not connected, call reset() first")]
    NotConnected,
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepOutcome<O> {
    pub observation: O,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: EnvInfo,
}

/// Common state tracked across steps and readable by spaces.
#[derive(Debug, Clone)]
pub struct EnvState {
    /// Decoded last frame, with the cursor drawn in when it is visible.
    pub last_frame: Option<RgbImage>,
    pub last_cursor_pos: (i32, i32),
    pub health: f32,
    /// Tracks health reaching zero. It is left to callers to reset when
    /// termination occurs.
    pub terminated: bool,
}

impl Default for EnvState {
    fn default() -> Self {
        Self {
            last_frame: None,
            last_cursor_pos: (0, 0),
            health: 20.0,
            terminated: false,
        }
    }
}

/// Defines an environment's action/observation shapes and their translation
/// to and from protocol packets.
pub trait EnvSpace {
    type Action;
    type Observation;

    /// Called on every reset before the first action goes out.
    fn reset_state(&mut self) {}

    /// Convert an action to the packet to send, attaching `commands`.
    fn action_to_packet(
        &mut self,
        state: &EnvState,
        action: &Self::Action,
        commands: &[String],
    ) -> ActionPacket;

    /// Convert a received packet to an observation. `state` already reflects
    /// the packet.
    fn packet_to_observation(
        &mut self,
        state: &EnvState,
        packet: &ObservationPacket,
    ) -> Self::Observation;

    /// Returns `(reward, terminated, truncated)` for the step just taken.
    /// The base environment additionally forces `terminated` when health
    /// reaches zero.
    fn process_step(
        &mut self,
        action: &Self::Action,
        observation: &Self::Observation,
    ) -> (f32, bool, bool);

    /// An action that does nothing.
    fn noop_action(&self) -> Self::Action;

    fn info(&self) -> EnvInfo {
        EnvInfo::new()
    }
}

/// Base environment. Construct through one of the space type aliases, e.g.
/// `McioEnv::new(McioSpace::new(), RunOptions::default())`.
pub struct McioBaseEnv<S: EnvSpace> {
    space: S,
    run_options: RunOptions,
    render_mode: Option<RenderMode>,
    state: EnvState,
    ctrl: Option<Box<dyn Controller>>,
    frame_sink: Option<Box<dyn FrameSink>>,
    launcher: Option<Box<dyn Launcher>>,
}

impl<S: EnvSpace> McioBaseEnv<S> {
    pub fn new(space: S, run_options: RunOptions) -> Self {
        Self {
            space,
            run_options,
            render_mode: None,
            state: EnvState::default(),
            ctrl: None,
            frame_sink: None,
            launcher: None,
        }
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = Some(mode);
        self
    }

    /// Attach the display collaborator used by [`RenderMode::Human`].
    /// Dropped again on [`close`](Self::close).
    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.frame_sink = Some(sink);
    }

    /// Attach a handle to a Minecraft process the caller launched. While a
    /// launcher is attached, [`close`](Self::close) asks Minecraft for a
    /// clean exit and then closes the handle. Reset closes the previous
    /// session, so re-attach after each reset if the instance is relaunched.
    pub fn set_launcher(&mut self, launcher: Box<dyn Launcher>) {
        self.launcher = Some(launcher);
    }

    pub fn state(&self) -> &EnvState {
        &self.state
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn run_options(&self) -> &RunOptions {
        &self.run_options
    }

    pub fn noop_action(&self) -> S::Action {
        self.space.noop_action()
    }

    /// Start (or restart) a session: build a fresh controller, clear all
    /// input state and send the initialization commands. Returns the first
    /// observation.
    pub fn reset(&mut self, options: ResetOptions) -> Result<(S::Observation, EnvInfo), EnvError> {
        // Supports repeated resets: drop any previous session first. The
        // frame sink survives resets.
        self.close_session();
        self.state = EnvState::default();
        self.space.reset_state();

        let ctrl: Box<dyn Controller> = match self.run_options.mode {
            McioMode::Sync => Box::new(ControllerSync::connect(&self.run_options.connect_options())?),
            McioMode::Async => {
                Box::new(ControllerAsync::connect(&self.run_options.connect_options())?)
            }
        };
        self.ctrl = Some(ctrl);

        // The reset action triggers the initial observation.
        let reset_action = ActionPacket {
            clear_input: true,
            commands: options.commands,
            ..ActionPacket::default()
        };
        self.send_packet(reset_action)?;
        let mut observation = self.receive_observation()?;

        if let Some(frame) = &self.state.last_frame {
            let mc = frame.dimensions();
            let env = (self.run_options.width, self.run_options.height);
            if mc != env {
                log::warn!("frame size mismatch: env={env:?} mcio={mc:?}");
            }
        }

        if self.state.terminated {
            // Player spawned into the death screen; wait out the respawn.
            observation = self.respawn_after_reset()?;
        }

        Ok((observation, self.space.info()))
    }

    /// With immediate respawn set it still takes a few ticks for the player
    /// to come back. Skip steps until the health recovers.
    fn respawn_after_reset(&mut self) -> Result<S::Observation, EnvError> {
        let max_steps = self.run_options.respawn_retry_steps;
        let mut observation = None;
        for _ in 0..max_steps {
            if !self.state.terminated {
                break;
            }
            observation = Some(self.skip_steps(1)?.observation);
        }
        if self.state.terminated {
            return Err(EnvError::ResetFailed { steps: max_steps });
        }
        observation.ok_or(EnvError::ResetFailed { steps: max_steps })
    }

    pub fn step(&mut self, action: &S::Action) -> Result<StepOutcome<S::Observation>, EnvError> {
        self.step_with_options(action, ResetOptions::default())
    }

    /// Step with extra options, allowing commands to be injected mid-episode.
    pub fn step_with_options(
        &mut self,
        action: &S::Action,
        options: ResetOptions,
    ) -> Result<StepOutcome<S::Observation>, EnvError> {
        let packet = self
            .space
            .action_to_packet(&self.state, action, &options.commands);
        self.send_packet(packet)?;
        let observation = self.receive_observation()?;

        let (reward, terminated, truncated) = self.space.process_step(action, &observation);
        self.state.terminated = terminated || self.state.health == 0.0;

        Ok(StepOutcome {
            observation,
            reward,
            terminated: self.state.terminated,
            truncated,
            info: self.space.info(),
        })
    }

    /// Send `n_steps` empty actions and return the final observation. Use to
    /// skip over game ticks, e.g. while commands settle.
    pub fn skip_steps(&mut self, n_steps: u32) -> Result<StepOutcome<S::Observation>, EnvError> {
        assert!(n_steps > 0, "n_steps must be at least 1");
        let mut observation = None;
        for _ in 0..n_steps {
            self.send_packet(ActionPacket::default())?;
            observation = Some(self.receive_observation()?);
        }
        let observation = observation.ok_or(EnvError::NotConnected)?;
        Ok(StepOutcome {
            observation,
            reward: 0.0,
            terminated: self.state.terminated,
            truncated: false,
            info: EnvInfo::new(),
        })
    }

    pub fn render(&mut self) -> Option<&RgbImage> {
        match self.render_mode {
            Some(RenderMode::Human) => {
                if let (Some(sink), Some(frame)) = (&mut self.frame_sink, &self.state.last_frame) {
                    sink.show(frame);
                }
                None
            }
            Some(RenderMode::RgbArray) => self.state.last_frame.as_ref(),
            None => None,
        }
    }

    /// Send a raw action packet and return the raw observation. Debug
    /// helper; does not update the carried state.
    pub fn step_raw(&mut self, packet: ActionPacket) -> Result<ObservationPacket, EnvError> {
        let ctrl = self.ctrl.as_mut().ok_or(EnvError::NotConnected)?;
        ctrl.send_action(packet);
        Ok(ctrl.recv_observation())
    }

    /// Toggle the debug screen.
    pub fn toggle_f3(&mut self) -> Result<(), EnvError> {
        let f3 = InputId::new(InputType::Key, glfw::KEY_F3);
        let packet = ActionPacket {
            inputs: vec![
                InputEvent::from_id(f3, glfw::PRESS),
                InputEvent::from_id(f3, glfw::RELEASE),
            ],
            ..ActionPacket::default()
        };
        self.step_raw(packet)?;
        Ok(())
    }

    /// Tear down everything. Idempotent and safe on a partially constructed
    /// environment.
    pub fn close(&mut self) {
        if let Some(mut sink) = self.frame_sink.take() {
            sink.close();
        }
        self.close_session();
    }

    /// Tear down the controller and any launched Minecraft process.
    fn close_session(&mut self) {
        if let Some(mut ctrl) = self.ctrl.take() {
            if self.launcher.is_some() {
                // We launched Minecraft; try for a clean exit.
                ctrl.send_stop();
            }
            ctrl.close();
        }
        if let Some(mut launcher) = self.launcher.take() {
            launcher.close();
        }
    }

    fn send_packet(&mut self, packet: ActionPacket) -> Result<(), EnvError> {
        let ctrl = self.ctrl.as_mut().ok_or(EnvError::NotConnected)?;
        ctrl.send_action(packet);
        Ok(())
    }

    /// Receive an observation, refresh the carried state and convert through
    /// the space.
    fn receive_observation(&mut self) -> Result<S::Observation, EnvError> {
        let ctrl = self.ctrl.as_mut().ok_or(EnvError::NotConnected)?;
        let packet = ctrl.recv_observation();

        self.state.last_frame = Some(self.decode_frame(&packet));
        self.state.last_cursor_pos = packet.cursor_pos;
        self.state.health = packet.health;
        self.state.terminated = packet.health == 0.0;

        Ok(self.space.packet_to_observation(&self.state, &packet))
    }

    /// Decode the compressed frame, falling back to a blank frame so a step
    /// against an empty sentinel observation still completes.
    fn decode_frame(&self, packet: &ObservationPacket) -> RgbImage {
        let blank = || RgbImage::new(self.run_options.width, self.run_options.height);
        let mut frame = if packet.frame.is_empty() {
            blank()
        } else {
            match packet.frame_image() {
                Ok(frame) => frame,
                Err(err) => {
                    log::error!("frame decode error: {err}");
                    blank()
                }
            }
        };
        if packet.cursor_mode == glfw::CURSOR_NORMAL {
            // The OS cursor is not part of the captured frame; draw one in.
            cursor::draw_crosshair(&mut frame, packet.cursor_pos);
        }
        frame
    }
}

impl<S: EnvSpace> Drop for McioBaseEnv<S> {
    fn drop(&mut self) {
        self.close();
    }
}
