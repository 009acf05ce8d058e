use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Receive failure for [`LatestItemQueue`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// Nothing was available within the allowed wait.
    #[error("no item available")]
    Empty,
    /// The queue was closed and drained.
    #[error("queue closed")]
    Closed,
}

struct Slot<T> {
    item: Option<T>,
    closed: bool,
}

/// Thread-safe queue that only keeps the most recent item. A put replaces
/// whatever is waiting; readers therefore never see a stale item when a newer
/// one has been queued.
pub struct LatestItemQueue<T> {
    slot: Mutex<Slot<T>>,
    available: Condvar,
}

impl<T> Default for LatestItemQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestItemQueue<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                item: None,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Store an item, replacing any queued one. Returns true if a previous
    /// item had to be dropped.
    pub fn put(&self, item: T) -> bool {
        let mut slot = self.slot.lock().unwrap();
        let dropped = slot.item.replace(item).is_some();
        self.available.notify_one();
        dropped
    }

    /// Block until an item arrives or the queue is closed.
    pub fn get(&self) -> Result<T, RecvError> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            if let Some(item) = slot.item.take() {
                return Ok(item);
            }
            if slot.closed {
                return Err(RecvError::Closed);
            }
            slot = self.available.wait(slot).unwrap();
        }
    }

    /// Block for at most `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, RecvError> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap();
        loop {
            if let Some(item) = slot.item.take() {
                return Ok(item);
            }
            if slot.closed {
                return Err(RecvError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(RecvError::Empty);
            }
            let (guard, _) = self.available.wait_timeout(slot, deadline - now).unwrap();
            slot = guard;
        }
    }

    /// Take the queued item without waiting.
    pub fn try_get(&self) -> Result<T, RecvError> {
        let mut slot = self.slot.lock().unwrap();
        match slot.item.take() {
            Some(item) => Ok(item),
            None if slot.closed => Err(RecvError::Closed),
            None => Err(RecvError::Empty),
        }
    }

    /// Wake all blocked readers; subsequent gets on an empty queue return
    /// [`RecvError::Closed`].
    pub fn close(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.closed = true;
        self.available.notify_all();
    }
}

/// Counts events and logs the per-second rate at a fixed interval.
pub struct TrackPerSecond {
    name: String,
    start: Instant,
    end: Instant,
    item_count: u64,
    log_start: Instant,
    log_interval: Option<Duration>,
    log_count: u64,
}

impl TrackPerSecond {
    const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new(name: &str) -> Self {
        Self::with_interval(name, Some(Self::DEFAULT_LOG_INTERVAL))
    }

    /// `log_interval = None` disables logging; the counter still tracks the
    /// average rate.
    pub fn with_interval(name: &str, log_interval: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            name: name.to_string(),
            start: now,
            end: now,
            item_count: 0,
            log_start: now,
            log_interval,
            log_count: 0,
        }
    }

    pub fn count(&mut self) {
        self.end = Instant::now();
        self.item_count += 1;
        self.log_count += 1;
        if let Some(interval) = self.log_interval {
            let elapsed = self.end - self.log_start;
            if elapsed >= interval {
                let per_sec = self.log_count as f64 / elapsed.as_secs_f64();
                log::debug!("{}: {:.1}/s", self.name, per_sec);
                self.log_count = 0;
                self.log_start = self.end;
            }
        }
    }

    /// Average rate over the counter's whole lifetime.
    pub fn avg_rate(&self) -> f64 {
        let elapsed = (self.end - self.start).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.item_count as f64 / elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latest_item_queue_basic() {
        let q = LatestItemQueue::new();
        assert!(!q.put(1)); // first item, nothing dropped
        assert!(q.put(2)); // second item drops the first
        assert_eq!(q.get(), Ok(2));
    }

    #[test]
    fn test_queue_empty_behavior() {
        let q: LatestItemQueue<String> = LatestItemQueue::new();
        assert_eq!(q.try_get(), Err(RecvError::Empty));
        assert_eq!(
            q.get_timeout(Duration::from_millis(10)),
            Err(RecvError::Empty)
        );
    }

    #[test]
    fn test_queue_closed_behavior() {
        let q: LatestItemQueue<i32> = LatestItemQueue::new();
        q.put(7);
        q.close();
        // A queued item is still delivered after close.
        assert_eq!(q.get(), Ok(7));
        assert_eq!(q.get(), Err(RecvError::Closed));
        assert_eq!(q.try_get(), Err(RecvError::Closed));
    }

    #[test]
    fn test_close_unblocks_reader() {
        let q: Arc<LatestItemQueue<i32>> = Arc::new(LatestItemQueue::new());
        let reader = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.get())
        };
        thread::sleep(Duration::from_millis(20));
        q.close();
        assert_eq!(reader.join().unwrap(), Err(RecvError::Closed));
    }

    #[test]
    fn test_threaded_operation() {
        let q: Arc<LatestItemQueue<i32>> = Arc::new(LatestItemQueue::new());
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for i in 0..3 {
                    q.put(i);
                    thread::sleep(Duration::from_millis(10));
                }
            })
        };
        producer.join().unwrap();
        // Only the final value survives.
        assert_eq!(q.get(), Ok(2));
    }

    #[test]
    fn test_track_per_second_avg_rate() {
        let mut counter = TrackPerSecond::with_interval("test", None);
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(2));
            counter.count();
        }
        assert!(counter.avg_rate() > 0.0);
    }
}
