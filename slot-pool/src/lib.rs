//! A bounded pool of shared resources.
//!
//! Resources are created up front by a constructor function (or added later
//! with [`Pool::add`]) and lent out one caller at a time. When every resource
//! is borrowed, [`Pool::acquire`] queues the caller and the next
//! [`Pool::release`] hands the resource directly to the longest waiting
//! request. An optional acquire timeout fails queued requests which are not
//! served before their deadline.
//!
//! ```
//! use std::time::Duration;
//! use slot_pool::PoolConfig;
//!
//! let pool = PoolConfig::<String>::new(|| String::from("conn"))
//!     .size(1)
//!     .acquire_timeout(Duration::from_millis(50))
//!     .build()
//!     .unwrap();
//!
//! let conn = pool.acquire().wait().unwrap();
//! assert!(pool.acquire().wait().is_err());
//! pool.release(conn).unwrap();
//! assert_eq!(pool.available(), 1);
//! ```

mod pool;
pub use self::pool::{
    Acquire, AcquireError, AddError, ConfigError, Pool, PoolConfig, ReleaseError,
};
