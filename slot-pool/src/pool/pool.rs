use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{debug, trace};

use super::acquire::Acquire;
use super::deadline::{Deadline, DeadlineTimer, ExpireWaiter};
use super::error::{AddError, ReleaseError};
use super::slots::SlotTable;
use super::wait::{SettleState, Settled, WaitQueue, Waiter};

pub(crate) struct PoolState<T> {
    slots: SlotTable<T>,
    waiters: WaitQueue<T>,
}

impl<T> PoolState<T> {
    /// Offer a resource to the queued requests, oldest first. The resource is
    /// returned if no request accepted it.
    fn hand_off(&mut self, mut resource: Arc<T>) -> Result<u64, Arc<T>> {
        while let Some(pending) = self.waiters.pop_oldest() {
            let id = pending.id();
            match pending.fulfill(resource) {
                Ok(()) => return Ok(id),
                Err(res) => {
                    trace!("Skipped settled waiter {}", id);
                    resource = res;
                }
            }
        }
        Err(resource)
    }
}

pub(crate) struct PoolInternal<T> {
    acquire_timeout: Option<Duration>,
    state: Mutex<PoolState<T>>,
    timer: Option<DeadlineTimer>,
}

impl<T: Send + Sync + 'static> PoolInternal<T> {
    pub fn new(
        acquire_timeout: Option<Duration>,
        slots: SlotTable<T>,
        timer: Option<DeadlineTimer>,
    ) -> Self {
        Self {
            acquire_timeout,
            state: Mutex::new(PoolState {
                slots,
                waiters: WaitQueue::new(),
            }),
            timer,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState<T>> {
        // the state is never left inconsistent across a panic
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn try_acquire(&self) -> Option<Arc<T>> {
        let res = self.lock_state().slots.acquire();
        if res.is_some() {
            trace!("Acquired idle resource");
        }
        res
    }

    /// Take a free resource, or else queue a request for the next release.
    pub fn acquire_or_wait(self: &Arc<Self>) -> Result<Arc<T>, Waiter<T>> {
        let mut state = self.lock_state();
        if let Some(res) = state.slots.acquire() {
            trace!("Acquired idle resource");
            return Ok(res);
        }

        // a deadline past the range of `Instant` never fires
        let expire = self
            .acquire_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let waiter = state.waiters.register(expire);
        debug!(
            "Queued waiter {} ({} waiting)",
            waiter.id,
            state.waiters.len()
        );
        drop(state);

        if let (Some(timer), Some(expire)) = (self.timer.as_ref(), expire) {
            let target: Weak<dyn ExpireWaiter> = Arc::downgrade(self) as Weak<dyn ExpireWaiter>;
            timer.register(Deadline {
                expire,
                id: waiter.id,
                settle: waiter.settle.clone(),
                target,
            });
        }
        Err(waiter)
    }

    pub fn release(&self, resource: Arc<T>) -> Result<(), ReleaseError> {
        let mut state = self.lock_state();
        let idx = state.slots.borrowed_index(&resource)?;
        match state.hand_off(resource) {
            Ok(id) => {
                debug!("Handed off resource to waiter {}", id);
            }
            Err(_) => {
                state.slots.mark_free(idx);
                trace!("Released resource ({} free)", state.slots.free_count());
            }
        }
        Ok(())
    }

    pub fn add(&self, resource: Arc<T>) -> Result<(), AddError> {
        let mut state = self.lock_state();
        // the slot starts out borrowed so a waiter can take it directly
        let idx = state.slots.insert(resource.clone(), false)?;
        match state.hand_off(resource) {
            Ok(id) => {
                debug!("Added resource and handed off to waiter {}", id);
            }
            Err(_) => {
                state.slots.mark_free(idx);
                debug!("Added resource ({} total)", state.slots.capacity());
            }
        }
        Ok(())
    }

    /// Drop a request whose `Acquire` was abandoned before settling.
    pub fn cancel_waiter(&self, id: u64, settle: &SettleState) -> bool {
        let mut state = self.lock_state();
        if settle.try_settle(Settled::Canceled) {
            state.waiters.remove(id);
            debug!("Canceled waiter {}", id);
            true
        } else {
            false
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    pub fn capacity(&self) -> usize {
        self.lock_state().slots.capacity()
    }

    pub fn available(&self) -> usize {
        self.lock_state().slots.free_count()
    }

    pub fn waiting(&self) -> usize {
        self.lock_state().waiters.len()
    }
}

impl<T: Send + Sync + 'static> ExpireWaiter for PoolInternal<T> {
    fn expire_waiter(&self, id: u64, settle: &SettleState) {
        let mut state = self.lock_state();
        if settle.try_settle(Settled::TimedOut) {
            // dropping the sender wakes the waiter with a timeout
            let pending = state.waiters.remove(id);
            drop(state);
            drop(pending);
            debug!("Waiter {} timed out", id);
        }
    }
}

/// A resource pool instance, which lends out shared resources of type `T`.
///
/// `Pool` is a cheap handle: clones refer to the same set of resources.
pub struct Pool<T> {
    pub(crate) inner: Arc<PoolInternal<T>>,
}

impl<T: Send + Sync + 'static> Pool<T> {
    pub(crate) fn new(inner: PoolInternal<T>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns an `Acquire<T>`, a `Future` which resolves to a borrowed
    /// resource or an `AcquireError` if the acquire timeout elapses first.
    ///
    /// A free resource is taken when the future is first polled. Otherwise
    /// the request is queued behind any earlier requests.
    pub fn acquire(&self) -> Acquire<T> {
        Acquire::new(self.clone())
    }

    /// Take a free resource without waiting.
    pub fn try_acquire(&self) -> Option<Arc<T>> {
        self.inner.try_acquire()
    }

    /// Return a borrowed resource. If any requests are waiting, the oldest
    /// one receives the resource directly.
    pub fn release(&self, resource: Arc<T>) -> Result<(), ReleaseError> {
        self.inner.release(resource)
    }

    /// Add a new resource to the pool, growing its capacity by one.
    pub fn add<R>(&self, resource: R) -> Result<(), AddError>
    where
        R: Into<Arc<T>>,
    {
        self.inner.add(resource.into())
    }

    /// The timeout applied to queued acquires, if any.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.inner.acquire_timeout()
    }

    /// The number of resources owned by the pool.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// The number of resources which are not currently borrowed.
    pub fn available(&self) -> usize {
        self.inner.available()
    }

    /// The number of queued acquire requests.
    pub fn waiting(&self) -> usize {
        self.inner.waiting()
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Debug for Pool<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("Pool")
            .field("capacity", &state.slots.capacity())
            .field("available", &state.slots.free_count())
            .field("waiting", &state.waiters.len())
            .finish()
    }
}
