use std::fmt::{self, Display, Formatter};

/// An error during resource acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireError {
    /// The acquire timed out while waiting for a resource
    Timeout,
}

impl Display for AcquireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "The request timed out"),
        }
    }
}

impl std::error::Error for AcquireError {}

/// An error returning a resource to the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseError {
    /// The resource is not tracked by this pool
    UnknownResource,
    /// The resource is not currently borrowed
    DoubleRelease,
}

impl Display for ReleaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResource => write!(f, "The resource does not belong to this pool"),
            Self::DoubleRelease => write!(f, "The resource was already released"),
        }
    }
}

impl std::error::Error for ReleaseError {}

/// An error adding a resource to the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddError {
    /// The resource is already tracked by this pool
    DuplicateResource,
}

impl Display for AddError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateResource => write!(f, "The resource is already in the pool"),
        }
    }
}

impl std::error::Error for AddError {}

/// A configuration error.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Config error: {}", &self.0)
    }
}

impl std::error::Error for ConfigError {}
