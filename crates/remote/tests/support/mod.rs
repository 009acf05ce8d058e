//! In-process stand-in for Minecraft running the MCio mod. Binds the action
//! and observation ports, records every decoded action and produces
//! observations either in lockstep (one per action, like sync mode) or as a
//! free-running stream (like async mode).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use mcio_remote::glfw;
use mcio_remote::net::{ActionPacket, McioMode, ObservationPacket};
use serde_bytes::ByteBuf;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(43000);

/// A fresh (action, observation) port pair for one test.
pub fn next_ports() -> (u16, u16) {
    let base = PORT_COUNTER.fetch_add(2, Ordering::SeqCst);
    (base, base + 1)
}

#[derive(Clone)]
pub struct MockConfig {
    pub mode: McioMode,
    /// One observation per received action. When false, observations stream
    /// at `stream_interval`.
    pub lockstep: bool,
    pub stream_interval: Duration,
    /// Observations pushed as soon as the agent connects, before any action
    /// arrives.
    pub initial_observations: u32,
    /// Health values per emitted observation; the last entry repeats.
    pub health_script: Vec<f32>,
    pub frame_size: (u32, u32),
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: McioMode::Sync,
            lockstep: true,
            stream_interval: Duration::from_millis(2),
            initial_observations: 0,
            health_script: vec![20.0],
            frame_size: (8, 8),
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub actions: Mutex<Vec<ActionPacket>>,
    pub last_action_sequence: AtomicU64,
    pub stop_received: AtomicBool,
}

pub struct MockMinecraft {
    pub action_port: u16,
    pub observation_port: u16,
    pub state: Arc<MockState>,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl MockMinecraft {
    pub fn start(config: MockConfig) -> Self {
        let (action_port, observation_port) = next_ports();
        let action_listener = TcpListener::bind(("127.0.0.1", action_port)).unwrap();
        let observation_listener = TcpListener::bind(("127.0.0.1", observation_port)).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(MockState::default());
        let (trigger_tx, trigger_rx) = mpsc::channel();

        let action_handle = {
            let running = Arc::clone(&running);
            let state = Arc::clone(&state);
            thread::spawn(move || action_thread(action_listener, running, state, trigger_tx))
        };
        let observation_handle = {
            let running = Arc::clone(&running);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                observation_thread(observation_listener, running, state, trigger_rx, config)
            })
        };

        Self {
            action_port,
            observation_port,
            state,
            running,
            handles: vec![action_handle, observation_handle],
        }
    }

    /// Wait until the mock has recorded at least `count` actions.
    pub fn wait_for_actions(&self, count: usize) {
        for _ in 0..500 {
            if self.state.actions.lock().unwrap().len() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("mock never received {count} actions");
    }

    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MockMinecraft {
    fn drop(&mut self) {
        self.close();
    }
}

fn split_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    if buf.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if buf.len() < 4 + len {
        return None;
    }
    let frame = buf[4..4 + len].to_vec();
    buf.drain(..4 + len);
    Some(frame)
}

fn action_thread(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    state: Arc<MockState>,
    trigger: Sender<()>,
) {
    listener.set_nonblocking(true).unwrap();
    let mut chunk = [0u8; 16384];
    while running.load(Ordering::SeqCst) {
        let Ok((mut stream, _)) = listener.accept() else {
            thread::sleep(Duration::from_millis(2));
            continue;
        };
        stream
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        let mut buf = Vec::new();
        while running.load(Ordering::SeqCst) {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(frame) = split_frame(&mut buf) {
                        let Some(action) = ActionPacket::unpack(&frame) else {
                            continue;
                        };
                        state
                            .last_action_sequence
                            .store(action.sequence, Ordering::SeqCst);
                        if action.stop {
                            state.stop_received.store(true, Ordering::SeqCst);
                        }
                        state.actions.lock().unwrap().push(action);
                        let _ = trigger.send(());
                    }
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut => {}
                Err(_) => break,
            }
        }
    }
}

fn make_png(size: (u32, u32)) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(size.0, size.1))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// True once the agent has closed its end of the observation socket. The
/// agent never writes on it, so any read of zero bytes means end of stream.
fn peer_closed(stream: &mut TcpStream) -> bool {
    let mut probe = [0u8; 1];
    let _ = stream.set_nonblocking(true);
    let closed = matches!(stream.read(&mut probe), Ok(0));
    let _ = stream.set_nonblocking(false);
    closed
}

fn write_observation(obs: &ObservationPacket, stream: &mut TcpStream) -> std::io::Result<()> {
    let payload = obs.pack().unwrap();
    let mut wire = (payload.len() as u32).to_be_bytes().to_vec();
    wire.extend_from_slice(&payload);
    stream.write_all(&wire)
}

fn observation_thread(
    listener: TcpListener,
    running: Arc<AtomicBool>,
    state: Arc<MockState>,
    trigger: Receiver<()>,
    config: MockConfig,
) {
    listener.set_nonblocking(true).unwrap();
    let frame = make_png(config.frame_size);
    let mut emitted: u64 = 0;
    // Lockstep trigger consumed but not yet answered (the agent reconnected
    // mid-step); re-emit on the next connection.
    let mut carry = false;

    let build = |emitted: u64, state: &MockState| -> ObservationPacket {
        let health_idx = ((emitted - 1) as usize).min(config.health_script.len() - 1);
        ObservationPacket {
            sequence: emitted,
            mode: config.mode.wire_name().to_string(),
            last_action_sequence: state.last_action_sequence.load(Ordering::SeqCst),
            frame_sequence: emitted,
            frame: ByteBuf::from(frame.clone()),
            cursor_mode: glfw::CURSOR_NORMAL,
            cursor_pos: (2, 2),
            health: config.health_script[health_idx],
            player_pos: (0.5, 64.0, 0.5),
            ..ObservationPacket::default()
        }
    };

    while running.load(Ordering::SeqCst) {
        let Ok((mut stream, _)) = listener.accept() else {
            thread::sleep(Duration::from_millis(2));
            continue;
        };

        let mut ok = true;
        for _ in 0..config.initial_observations {
            emitted += 1;
            if write_observation(&build(emitted, &state), &mut stream).is_err() {
                ok = false;
                break;
            }
        }

        'session: while ok && running.load(Ordering::SeqCst) {
            if config.lockstep && !carry {
                match trigger.recv_timeout(Duration::from_millis(10)) {
                    Ok(()) => {}
                    Err(RecvTimeoutError::Timeout) => {
                        if peer_closed(&mut stream) {
                            break 'session;
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            } else if !config.lockstep {
                thread::sleep(config.stream_interval);
            }
            carry = false;
            emitted += 1;
            if write_observation(&build(emitted, &state), &mut stream).is_err() {
                if config.lockstep {
                    carry = true;
                    emitted -= 1;
                }
                break 'session;
            }
        }
    }
}
