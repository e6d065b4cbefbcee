use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use super::deadline::DeadlineTimer;
use super::error::ConfigError;
use super::pool::{Pool, PoolInternal};
use super::slots::SlotTable;

type CreateFn<T> = Box<dyn FnMut() -> Arc<T>>;

/// Builder for a [`Pool`] instance.
pub struct PoolConfig<T> {
    acquire_timeout: Option<Duration>,
    create: Option<CreateFn<T>>,
    size: usize,
}

impl<T: Send + Sync + 'static> PoolConfig<T> {
    /// Configure a pool whose initial resources are produced by `create`.
    ///
    /// The constructor is called exactly `size` times by `build`. It may
    /// return either a plain value or an `Arc` handle.
    pub fn new<C, R>(mut create: C) -> Self
    where
        C: FnMut() -> R + 'static,
        R: Into<Arc<T>>,
    {
        Self {
            acquire_timeout: None,
            create: Some(Box::new(move || create().into())),
            size: 0,
        }
    }

    /// Configure a pool with no constructor. Resources must be supplied with
    /// [`Pool::add`].
    pub fn empty() -> Self {
        Self {
            acquire_timeout: None,
            create: None,
            size: 0,
        }
    }

    /// Fail queued acquires which are not served within `val`. A zero
    /// duration waits indefinitely, as does a duration too large to be
    /// added to the current time.
    pub fn acquire_timeout(mut self, val: Duration) -> Self {
        if val.as_micros() > 0 {
            self.acquire_timeout.replace(val);
        } else {
            self.acquire_timeout.take();
        }
        self
    }

    /// The number of resources to create up front.
    pub fn size(mut self, val: usize) -> Self {
        self.size = val;
        self
    }

    pub fn build(self) -> Result<Pool<T>, ConfigError> {
        let slots = match self.create {
            Some(create) => SlotTable::initialize(create, self.size)
                .map_err(|err| ConfigError(format!("Resource constructor: {}", err)))?,
            None if self.size == 0 => SlotTable::with_capacity(0),
            None => {
                return Err(ConfigError(
                    "A resource constructor is required for a non-empty pool".to_owned(),
                ))
            }
        };
        let timer = match self.acquire_timeout {
            Some(_) => Some(DeadlineTimer::start().map_err(|err| {
                ConfigError(format!("Failed to start deadline thread: {}", err))
            })?),
            None => None,
        };
        Ok(Pool::new(PoolInternal::new(
            self.acquire_timeout,
            slots,
            timer,
        )))
    }
}

impl<T> Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("acquire_timeout", &self.acquire_timeout)
            .field("size", &self.size)
            .finish()
    }
}
