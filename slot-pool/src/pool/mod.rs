mod acquire;
pub use acquire::Acquire;

mod config;
pub use config::PoolConfig;

mod deadline;

mod error;
pub use error::{AcquireError, AddError, ConfigError, ReleaseError};

mod pool;
pub use pool::Pool;

mod slots;

mod wait;
