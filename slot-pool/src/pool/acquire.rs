use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_lite::future;
use log::warn;

use super::error::AcquireError;
use super::pool::Pool;
use super::wait::{Settled, Waiter};

enum AcquireState<T> {
    Init,
    Waiting(Waiter<T>),
}

/// A Future resolving to a borrowed resource or an `AcquireError`.
///
/// Dropping the future before it resolves withdraws the queued request.
///
/// # Panics
///
/// Polling the future again after it has returned `Poll::Ready` panics.
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<T: Send + Sync + 'static> {
    pool: Pool<T>,
    state: Option<AcquireState<T>>,
}

impl<T: Send + Sync + 'static> Acquire<T> {
    pub(crate) fn new(pool: Pool<T>) -> Self {
        Self {
            pool,
            state: Some(AcquireState::Init),
        }
    }

    /// Block the current thread until a resource is acquired or the acquire
    /// times out.
    pub fn wait(self) -> Result<Arc<T>, AcquireError> {
        future::block_on(self)
    }
}

impl<T: Send + Sync + 'static> Future for Acquire<T> {
    type Output = Result<Arc<T>, AcquireError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => panic!("Acquire polled after completion"),
        };

        loop {
            state = match state {
                AcquireState::Init => match self.pool.inner.acquire_or_wait() {
                    Ok(res) => return Poll::Ready(Ok(res)),
                    Err(waiter) => AcquireState::Waiting(waiter),
                },

                AcquireState::Waiting(mut waiter) => {
                    match Pin::new(&mut waiter.receiver).poll(cx) {
                        Poll::Pending => {
                            self.state.replace(AcquireState::Waiting(waiter));
                            return Poll::Pending;
                        }
                        Poll::Ready(Ok(res)) => return Poll::Ready(Ok(res)),
                        Poll::Ready(Err(_)) => {
                            // the sender is only dropped unused by the deadline
                            debug_assert_eq!(waiter.settle.get(), Some(Settled::TimedOut));
                            return Poll::Ready(Err(AcquireError::Timeout));
                        }
                    }
                }
            };
        }
    }
}

impl<T: Send + Sync + 'static> Debug for Acquire<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let waiter = match self.state {
            Some(AcquireState::Waiting(ref waiter)) => Some(waiter),
            _ => None,
        };
        f.debug_struct("Acquire").field("waiter", &waiter).finish()
    }
}

impl<T: Send + Sync + 'static> Drop for Acquire<T> {
    fn drop(&mut self) {
        if let Some(AcquireState::Waiting(mut waiter)) = self.state.take() {
            if self.pool.inner.cancel_waiter(waiter.id, &waiter.settle) {
                return;
            }
            // a release won the race, return the resource it handed over
            waiter.receiver.close();
            if let Ok(Some(res)) = waiter.receiver.try_recv() {
                if let Err(err) = self.pool.release(res) {
                    warn!("Failed to return resource from abandoned acquire: {}", err);
                }
            }
        }
    }
}
