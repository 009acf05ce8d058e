//! Sync and async controllers over an MCio connection.
//!
//! [`ControllerSync`] pairs every action with the next observation; the game
//! only advances when the agent sends. [`ControllerAsync`] lets the mod
//! stream observations at its own cadence and always hands the agent the
//! freshest one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::net::{
    ActionPacket, ConnectError, ConnectOptions, Connection, McioMode, ObservationPacket,
};
use crate::util::{LatestItemQueue, RecvError};

/// The controller interface shared by the sync and async implementations.
pub trait Controller: Send {
    /// Send an action to Minecraft. The controller assigns
    /// `action.sequence`; caller-supplied values are overwritten.
    fn send_action(&mut self, action: ActionPacket);

    /// Block until the next observation. Returns an empty packet when the
    /// connection has been torn down, so step loops can still complete.
    fn recv_observation(&mut self) -> ObservationPacket;

    /// Send a stop packet. This should cause Minecraft to cleanly exit.
    fn send_stop(&mut self);

    fn close(&mut self);
}

fn warn_on_mode_mismatch(expected: McioMode, observation: &ObservationPacket) {
    if observation.mode != expected.wire_name() {
        log::warn!(
            "mode mismatch: controller={} mcio={}",
            expected.wire_name(),
            observation.mode
        );
    }
}

/// Handles SYNC mode connections. Blocks in recv waiting for the next
/// observation and deliberately never times out; agents wrap it with their
/// own watchdog if they need one.
pub struct ControllerSync {
    conn: Connection,
    last_sequence: u64,
    check_mode: bool,
}

impl ControllerSync {
    pub fn connect(options: &ConnectOptions) -> Result<Self, ConnectError> {
        Ok(Self {
            conn: Connection::connect(options)?,
            last_sequence: 0,
            check_mode: true,
        })
    }

    /// Sequence number assigned to the most recently sent action.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

impl Controller for ControllerSync {
    fn send_action(&mut self, mut action: ActionPacket) {
        self.last_sequence += 1;
        action.sequence = self.last_sequence;
        self.conn.send_action(&action);
    }

    fn recv_observation(&mut self) -> ObservationPacket {
        let Some(observation) = self.conn.recv_observation(true) else {
            // Shutting down or packet decode error.
            return ObservationPacket::default();
        };
        if self.check_mode {
            self.check_mode = false;
            warn_on_mode_mismatch(McioMode::Sync, &observation);
        }
        observation
    }

    fn send_stop(&mut self) {
        self.conn.send_stop();
    }

    fn close(&mut self) {
        self.conn.close();
    }
}

/// Default bound for [`ControllerAsync::send_and_recv_match`]. Only
/// observations already in flight when the action went out should ever be
/// skipped, so a small bound is plenty.
pub const DEFAULT_MAX_SKIP: u32 = 5;

/// Handles ASYNC mode connections. A receiver thread feeds a single-slot
/// queue, so the agent always reads the most recent observation and stale
/// ones are dropped.
pub struct ControllerAsync {
    conn: Arc<Connection>,
    queue: Arc<LatestItemQueue<ObservationPacket>>,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
    last_sequence: u64,
}

impl ControllerAsync {
    pub fn connect(options: &ConnectOptions) -> Result<Self, ConnectError> {
        let conn = Arc::new(Connection::connect(options)?);
        let queue = Arc::new(LatestItemQueue::new());
        let running = Arc::new(AtomicBool::new(true));

        let receiver = {
            let conn = Arc::clone(&conn);
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            thread::spawn(move || observation_loop(conn, queue, running))
        };
        log::info!("controller init complete");

        Ok(Self {
            conn,
            queue,
            running,
            receiver: Some(receiver),
            last_sequence: 0,
        })
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// The most recent observation, without waiting.
    pub fn try_recv_observation(&self) -> Result<ObservationPacket, RecvError> {
        self.queue.try_get()
    }

    /// The most recent observation, waiting at most `timeout`.
    pub fn recv_observation_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ObservationPacket, RecvError> {
        self.queue.get_timeout(timeout)
    }

    /// Send an action and wait for an observation known to come after it,
    /// i.e. one whose `last_action_sequence` has reached the sequence just
    /// sent. Observations already in flight when the action went out are
    /// discarded. `max_skip` (usually [`DEFAULT_MAX_SKIP`]) bounds the wait
    /// against a lost action: once that many observations have been skipped,
    /// the latest one is returned as-is with a logged warning. `None` waits
    /// for a match indefinitely.
    pub fn send_and_recv_match(
        &mut self,
        action: ActionPacket,
        max_skip: Option<u32>,
    ) -> ObservationPacket {
        self.send_action(action);
        let wait_seq = self.last_sequence;
        let mut skipped = 0;
        loop {
            let observation = match self.queue.get() {
                Ok(observation) => observation,
                Err(_) => return ObservationPacket::default(),
            };
            if observation.last_action_sequence >= wait_seq {
                return observation;
            }
            skipped += 1;
            if let Some(max_skip) = max_skip {
                if skipped >= max_skip {
                    log::warn!(
                        "skip limit reached waiting for action {wait_seq}, returning observation \
                         with last_action_sequence={}",
                        observation.last_action_sequence
                    );
                    return observation;
                }
            }
            log::debug!(
                "skipping obs={} last_action={} < waiting={}",
                observation.sequence,
                observation.last_action_sequence,
                wait_seq
            );
        }
    }
}

fn observation_loop(
    conn: Arc<Connection>,
    queue: Arc<LatestItemQueue<ObservationPacket>>,
    running: Arc<AtomicBool>,
) {
    log::info!("observation receiver started");
    let mut check_mode = true;
    while running.load(Ordering::SeqCst) {
        let Some(observation) = conn.recv_observation(true) else {
            // Shutting down or packet decode error.
            continue;
        };
        if check_mode {
            check_mode = false;
            warn_on_mode_mismatch(McioMode::Async, &observation);
        }
        if queue.put(observation) {
            // Normal in async mode: the agent reads slower than the game
            // produces frames.
            log::debug!("dropped observation from the processing queue");
        }
    }
    log::info!("observation receiver done");
}

impl Controller for ControllerAsync {
    fn send_action(&mut self, mut action: ActionPacket) {
        self.last_sequence += 1;
        action.sequence = self.last_sequence;
        self.conn.send_action(&action);
    }

    fn recv_observation(&mut self) -> ObservationPacket {
        self.queue.get().unwrap_or_default()
    }

    fn send_stop(&mut self) {
        self.conn.send_stop();
    }

    fn close(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.queue.close();
            self.conn.close();
            if let Some(receiver) = self.receiver.take() {
                let _ = receiver.join();
            }
        }
    }
}

impl Drop for ControllerAsync {
    fn drop(&mut self) {
        self.close();
    }
}
