//! Framed TCP channels to the MCio mod.
//!
//! The mod listens on two ports; the agent connects to both. Each channel is
//! unidirectional and owned by a worker thread that connects, reconnects and
//! moves frames between the socket and an in-process queue. Every frame on
//! the wire is a `u32` big-endian length prefix followed by the payload.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Interval for all polling waits. Short enough that `close()` from another
/// thread unblocks a waiter promptly, long enough not to spin.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Outbound frames queued while the mod is slow. A full queue drops the
/// action rather than blocking the sender.
const SEND_QUEUE_LIMIT: usize = 128;

/// Frames above this size indicate a desynchronized stream.
const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

const HEADER_SIZE: usize = 4;

fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> io::Result<()> {
    let len = payload.len() as u32;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(payload)
}

/// Accumulates raw socket bytes and splits out complete length-prefixed
/// frames.
struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Split off the next complete frame, if one has fully arrived.
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame length {len} exceeds limit"),
            ));
        }
        if self.buf.len() < HEADER_SIZE + len {
            return Ok(None);
        }
        let frame = self.buf[HEADER_SIZE..HEADER_SIZE + len].to_vec();
        self.buf.drain(..HEADER_SIZE + len);
        Ok(Some(frame))
    }
}

fn connect(label: &str, addr: SocketAddr, connected: &AtomicBool) -> Option<TcpStream> {
    match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
        Ok(stream) => {
            let _ = stream.set_nodelay(true);
            connected.store(true, Ordering::SeqCst);
            log::info!("{label} socket connected to {addr}");
            Some(stream)
        }
        Err(_) => {
            thread::sleep(CONNECT_RETRY_INTERVAL);
            None
        }
    }
}

/// Outbound channel: the agent pushes frames, the worker writes them to the
/// socket. `send` never blocks.
pub(crate) struct PushChannel {
    tx: SyncSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PushChannel {
    pub fn spawn(label: &'static str, addr: SocketAddr, running: Arc<AtomicBool>) -> Self {
        let (tx, rx) = mpsc::sync_channel(SEND_QUEUE_LIMIT);
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);
        let worker = thread::spawn(move || push_worker(label, addr, running, flag, rx));
        Self {
            tx,
            connected,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue a frame for sending. Returns false when the frame had to be
    /// dropped (queue full or channel shut down).
    pub fn send(&self, payload: Vec<u8>) -> bool {
        match self.tx.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn join(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
    }
}

fn push_worker(
    label: &str,
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    rx: Receiver<Vec<u8>>,
) {
    while running.load(Ordering::SeqCst) {
        let Some(mut stream) = connect(label, addr, &connected) else {
            continue;
        };
        // A stalled peer must not wedge close(); a timed-out write counts
        // as a disconnect.
        let _ = stream.set_write_timeout(Some(CONNECT_TIMEOUT));
        'stream: while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(payload) => {
                    if let Err(err) = write_frame(&mut stream, &payload) {
                        log::info!("{label} socket disconnected: {err}");
                        break 'stream;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        connected.store(false, Ordering::SeqCst);
    }
    log::debug!("{label} send worker done");
}

/// Inbound channel: the worker reads frames off the socket into a queue the
/// agent drains.
pub(crate) struct PullChannel {
    rx: Mutex<Receiver<Vec<u8>>>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PullChannel {
    pub fn spawn(label: &'static str, addr: SocketAddr, running: Arc<AtomicBool>) -> Self {
        let (tx, rx) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);
        let run = Arc::clone(&running);
        let worker = thread::spawn(move || pull_worker(label, addr, run, flag, tx));
        Self {
            rx: Mutex::new(rx),
            connected,
            running,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// One non-blocking attempt.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.rx.lock().unwrap().try_recv().ok()
    }

    /// Poll until a frame arrives or the channel shuts down.
    pub fn recv_blocking(&self) -> Option<Vec<u8>> {
        let rx = self.rx.lock().unwrap();
        while self.running.load(Ordering::SeqCst) {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => return Some(frame),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn join(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
    }
}

fn pull_worker(
    label: &str,
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    tx: mpsc::Sender<Vec<u8>>,
) {
    let mut chunk = [0u8; 64 * 1024];
    while running.load(Ordering::SeqCst) {
        let Some(mut stream) = connect(label, addr, &connected) else {
            continue;
        };
        let _ = stream.set_read_timeout(Some(POLL_INTERVAL));
        let mut frames = FrameBuffer::new();
        'stream: while running.load(Ordering::SeqCst) {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    log::info!("{label} socket disconnected: end of stream");
                    break 'stream;
                }
                Ok(n) => {
                    frames.extend(&chunk[..n]);
                    loop {
                        match frames.next_frame() {
                            Ok(Some(frame)) => {
                                if tx.send(frame).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => break,
                            Err(err) => {
                                log::error!("{label} stream desynchronized: {err}");
                                break 'stream;
                            }
                        }
                    }
                }
                Err(ref err)
                    if err.kind() == io::ErrorKind::WouldBlock
                        || err.kind() == io::ErrorKind::TimedOut => {}
                Err(err) => {
                    log::info!("{label} socket disconnected: {err}");
                    break 'stream;
                }
            }
        }
        connected.store(false, Ordering::SeqCst);
    }
    log::debug!("{label} receive worker done");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_partial_then_complete() {
        let mut frames = FrameBuffer::new();
        let payload = b"hello";
        let mut wire = (payload.len() as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(payload);

        frames.extend(&wire[..3]);
        assert!(frames.next_frame().unwrap().is_none());
        frames.extend(&wire[3..6]);
        assert!(frames.next_frame().unwrap().is_none());
        frames.extend(&wire[6..]);
        assert_eq!(frames.next_frame().unwrap().as_deref(), Some(&payload[..]));
        assert!(frames.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_frame_buffer_back_to_back_frames() {
        let mut frames = FrameBuffer::new();
        for payload in [&b"one"[..], &b"two"[..]] {
            frames.extend(&(payload.len() as u32).to_be_bytes());
            frames.extend(payload);
        }
        assert_eq!(frames.next_frame().unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(frames.next_frame().unwrap().as_deref(), Some(&b"two"[..]));
        assert!(frames.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_frame_buffer_rejects_oversized_frame() {
        let mut frames = FrameBuffer::new();
        frames.extend(&u32::MAX.to_be_bytes());
        assert!(frames.next_frame().is_err());
    }

    #[test]
    fn test_empty_frame() {
        let mut frames = FrameBuffer::new();
        frames.extend(&0u32.to_be_bytes());
        assert_eq!(frames.next_frame().unwrap(), Some(Vec::new()));
    }
}
