use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, Thread};
use std::time::Instant;

use concurrent_queue::{ConcurrentQueue, PopError};
use log::trace;

use super::wait::SettleState;

/// Receives the expiry of a queued request.
pub(crate) trait ExpireWaiter: Send + Sync {
    fn expire_waiter(&self, id: u64, settle: &SettleState);
}

/// A deadline armed for one queued request.
pub(crate) struct Deadline {
    pub expire: Instant,
    pub id: u64,
    pub settle: Arc<SettleState>,
    pub target: Weak<dyn ExpireWaiter>,
}

impl Deadline {
    fn fire(self) {
        if self.settle.is_settled() {
            return;
        }
        if let Some(target) = self.target.upgrade() {
            target.expire_waiter(self.id, &self.settle);
        }
    }
}

impl Debug for Deadline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("expire", &self.expire)
            .field("id", &self.id)
            .field("settle", &self.settle)
            .finish()
    }
}

/// Handle to the background thread which fires request deadlines.
///
/// Dropping the handle closes the registration queue, which stops the thread.
pub(crate) struct DeadlineTimer {
    inject: Arc<ConcurrentQueue<Deadline>>,
    thread: Thread,
}

impl DeadlineTimer {
    pub fn start() -> io::Result<Self> {
        let inject = Arc::new(ConcurrentQueue::unbounded());
        let queue = inject.clone();
        let handle = thread::Builder::new()
            .name("slot-pool-deadline".to_owned())
            .spawn(move || run_timers(queue))?;
        Ok(Self {
            inject,
            thread: handle.thread().clone(),
        })
    }

    pub fn register(&self, deadline: Deadline) {
        // only fails once the pool is being dropped
        if self.inject.push(deadline).is_ok() {
            self.thread.unpark();
        }
    }
}

impl Debug for DeadlineTimer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineTimer")
            .field("queued", &self.inject.len())
            .finish()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.inject.close();
        self.thread.unpark();
    }
}

fn run_timers(inject: Arc<ConcurrentQueue<Deadline>>) {
    let mut timers = BTreeMap::<(Instant, u64), Deadline>::new();

    loop {
        loop {
            match inject.pop() {
                Ok(deadline) => {
                    if !deadline.settle.is_settled() {
                        timers.insert((deadline.expire, deadline.id), deadline);
                    }
                }
                Err(PopError::Empty) => break,
                Err(PopError::Closed) => {
                    trace!("Deadline thread stopped");
                    return;
                }
            }
        }

        let remain = timers.split_off(&(Instant::now(), 0));
        for (_, deadline) in std::mem::replace(&mut timers, remain) {
            deadline.fire();
        }

        // requests settled by a handoff or cancellation no longer need a timer
        timers.retain(|_, deadline| !deadline.settle.is_settled());

        match timers.keys().next() {
            Some((expire, _)) => {
                thread::park_timeout(expire.saturating_duration_since(Instant::now()))
            }
            None => thread::park(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::pool::wait::Settled;

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<u64>>,
        count: AtomicUsize,
    }

    impl ExpireWaiter for Recorder {
        fn expire_waiter(&self, id: u64, settle: &SettleState) {
            if settle.try_settle(Settled::TimedOut) {
                self.fired.lock().unwrap().push(id);
                self.count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn deadline(rec: &Arc<Recorder>, id: u64, after: Duration) -> (Deadline, Arc<SettleState>) {
        let settle = Arc::new(SettleState::new());
        let target: Weak<dyn ExpireWaiter> = Arc::downgrade(rec) as Weak<dyn ExpireWaiter>;
        (
            Deadline {
                expire: Instant::now() + after,
                id,
                settle: settle.clone(),
                target,
            },
            settle,
        )
    }

    fn wait_for(rec: &Recorder, count: usize) {
        let start = Instant::now();
        while rec.count.load(Ordering::SeqCst) < count {
            assert!(start.elapsed() < Duration::from_secs(5), "deadline never fired");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn deadlines_fire_in_order() {
        let rec = Arc::new(Recorder::default());
        let timer = DeadlineTimer::start().unwrap();
        let (late, _) = deadline(&rec, 1, Duration::from_millis(40));
        let (early, _) = deadline(&rec, 2, Duration::from_millis(10));
        timer.register(late);
        timer.register(early);
        wait_for(&rec, 2);
        assert_eq!(*rec.fired.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn settled_deadline_is_skipped() {
        let rec = Arc::new(Recorder::default());
        let timer = DeadlineTimer::start().unwrap();
        let (skipped, settle) = deadline(&rec, 1, Duration::from_millis(10));
        assert!(settle.try_settle(Settled::Fulfilled));
        let (fired, _) = deadline(&rec, 2, Duration::from_millis(20));
        timer.register(skipped);
        timer.register(fired);
        wait_for(&rec, 1);
        assert_eq!(*rec.fired.lock().unwrap(), vec![2]);
        assert_eq!(settle.get(), Some(Settled::Fulfilled));
    }
}
