//! The agent side of the MCio connection.
//!
//! Owns both message channels. Used by the controllers; agents normally do
//! not touch this directly.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::protocol::{
    ActionPacket, DEFAULT_ACTION_PORT, DEFAULT_HOST, DEFAULT_OBSERVATION_PORT, ObservationPacket,
};
use super::transport::{POLL_INTERVAL, PullChannel, PushChannel};
use crate::util::TrackPerSecond;

#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("failed to connect to Minecraft within timeout: {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub action_port: u16,
    pub observation_port: u16,
    /// Block construction until both channels are connected.
    pub wait_for_connection: bool,
    /// Only used when `wait_for_connection` is set.
    pub connection_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            action_port: DEFAULT_ACTION_PORT,
            observation_port: DEFAULT_OBSERVATION_PORT,
            wait_for_connection: true,
            connection_timeout: None,
        }
    }
}

pub struct Connection {
    running: Arc<AtomicBool>,
    action: PushChannel,
    observation: PullChannel,
    send_counter: Mutex<TrackPerSecond>,
    recv_counter: Mutex<TrackPerSecond>,
}

impl Connection {
    pub fn connect(options: &ConnectOptions) -> Result<Self, ConnectError> {
        log::info!("connecting to Minecraft");
        let running = Arc::new(AtomicBool::new(true));
        let action_addr = SocketAddr::new(DEFAULT_HOST, options.action_port);
        let observation_addr = SocketAddr::new(DEFAULT_HOST, options.observation_port);

        let conn = Self {
            action: PushChannel::spawn("action", action_addr, Arc::clone(&running)),
            observation: PullChannel::spawn(
                "observation",
                observation_addr,
                Arc::clone(&running),
            ),
            running,
            send_counter: Mutex::new(TrackPerSecond::new("SendActionPPS")),
            recv_counter: Mutex::new(TrackPerSecond::new("RecvObservationPPS")),
        };

        if options.wait_for_connection {
            if let Err(err) = conn.wait_for_connections(options.connection_timeout) {
                conn.close();
                return Err(err);
            }
            log::info!("Minecraft connections established");
        }
        Ok(conn)
    }

    fn wait_for_connections(&self, timeout: Option<Duration>) -> Result<(), ConnectError> {
        let start = Instant::now();
        let mut last_log = start;
        while self.running.load(Ordering::SeqCst) {
            if self.action.is_connected() && self.observation.is_connected() {
                return Ok(());
            }
            let now = Instant::now();
            if now - last_log >= Duration::from_secs(1) {
                log::info!("waiting for connections... {}s", (now - start).as_secs());
                last_log = now;
            }
            if let Some(timeout) = timeout {
                if now - start >= timeout {
                    return Err(ConnectError::Timeout(timeout));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(ConnectError::Timeout(start.elapsed()))
    }

    /// Send an action. Never blocks: when the outbound queue is full (the mod
    /// has stalled) the action is dropped with a logged error.
    pub fn send_action(&self, action: &ActionPacket) {
        let bytes = match action.pack() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("action encode error: {err}");
                return;
            }
        };
        self.send_counter.lock().unwrap().count();
        if !self.action.send(bytes) {
            log::error!(
                "send queue full, dropping action sequence={}",
                action.sequence
            );
        }
    }

    /// Receive an observation.
    ///
    /// Non-blocking: one attempt, `None` when nothing is ready. Blocking:
    /// polls until a packet arrives or the connection is shut down. A packet
    /// that fails to decode also yields `None`; the error is logged and the
    /// connection stays usable.
    pub fn recv_observation(&self, block: bool) -> Option<ObservationPacket> {
        let bytes = if block {
            self.observation.recv_blocking()?
        } else {
            self.observation.try_recv()?
        };
        self.recv_counter.lock().unwrap().count();
        let observation = ObservationPacket::unpack(&bytes)?;
        log::debug!("{observation:?}");
        Some(observation)
    }

    /// Ask Minecraft to exit cleanly.
    pub fn send_stop(&self) {
        let action = ActionPacket {
            stop: true,
            ..ActionPacket::default()
        };
        self.send_action(&action);
    }

    pub fn action_connected(&self) -> bool {
        self.action.is_connected()
    }

    pub fn observation_connected(&self) -> bool {
        self.observation.is_connected()
    }

    /// Tear down both channels and join their workers. Safe to call more
    /// than once; any blocked receiver unblocks within one poll interval.
    pub fn close(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("closing connections");
            self.action.join();
            self.observation.join();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
