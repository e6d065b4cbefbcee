use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use std::time::Instant;

use futures_channel::oneshot;

const WAITING: u8 = 0;
const FULFILLED: u8 = 1;
const TIMED_OUT: u8 = 2;
const CANCELED: u8 = 3;

/// The terminal state of a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settled {
    Fulfilled,
    TimedOut,
    Canceled,
}

impl Settled {
    fn as_u8(self) -> u8 {
        match self {
            Self::Fulfilled => FULFILLED,
            Self::TimedOut => TIMED_OUT,
            Self::Canceled => CANCELED,
        }
    }
}

/// Settle-once flag shared between a queued request, its waiter and its
/// deadline. Only the first transition out of the waiting state succeeds.
pub(crate) struct SettleState {
    state: AtomicU8,
}

impl SettleState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WAITING),
        }
    }

    pub fn try_settle(&self, outcome: Settled) -> bool {
        self.state
            .compare_exchange(WAITING, outcome.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn get(&self) -> Option<Settled> {
        match self.state.load(Ordering::Acquire) {
            FULFILLED => Some(Settled::Fulfilled),
            TIMED_OUT => Some(Settled::TimedOut),
            CANCELED => Some(Settled::Canceled),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state.load(Ordering::Acquire) != WAITING
    }
}

impl Debug for SettleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SettleState").field(&self.get()).finish()
    }
}

/// The pool's side of a suspended acquire.
pub(crate) struct Pending<T> {
    id: u64,
    settle: Arc<SettleState>,
    sender: oneshot::Sender<Arc<T>>,
}

impl<T> Pending<T> {
    /// Hand a resource to the waiting acquire. The resource is returned if
    /// the request was already settled or the waiter has gone away.
    pub fn fulfill(self, resource: Arc<T>) -> Result<(), Arc<T>> {
        if self.settle.try_settle(Settled::Fulfilled) {
            self.sender.send(resource)
        } else {
            Err(resource)
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Debug for Pending<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.id)
            .field("settle", &self.settle)
            .finish()
    }
}

/// The caller's side of a suspended acquire.
pub(crate) struct Waiter<T> {
    pub id: u64,
    pub expire: Option<Instant>,
    pub settle: Arc<SettleState>,
    pub receiver: oneshot::Receiver<Arc<T>>,
}

impl<T> Debug for Waiter<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("expire", &self.expire)
            .field("settle", &self.settle)
            .finish()
    }
}

/// Pending requests in arrival order. Ids increase monotonically so the
/// first key is always the oldest request.
pub(crate) struct WaitQueue<T> {
    entries: BTreeMap<u64, Pending<T>>,
    next_id: u64,
}

impl<T> WaitQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Enqueue a new request and return the handle for its waiter.
    pub fn register(&mut self, expire: Option<Instant>) -> Waiter<T> {
        let id = self.next_id;
        self.next_id += 1;
        let settle = Arc::new(SettleState::new());
        let (sender, receiver) = oneshot::channel();
        self.entries.insert(
            id,
            Pending {
                id,
                settle: settle.clone(),
                sender,
            },
        );
        Waiter {
            id,
            expire,
            settle,
            receiver,
        }
    }

    pub fn pop_oldest(&mut self) -> Option<Pending<T>> {
        let id = *self.entries.keys().next()?;
        self.entries.remove(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<Pending<T>> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
