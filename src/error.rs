// src/error.rs

//! Error taxonomy shared by every `System` operation.

use crate::capabilities::Capabilities;
use crate::display::messages::DriverError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of resource whose creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Display,
    Surface,
    Font,
    ColorSpace,
    ColorSpaceConversion,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Display => "display",
            ResourceKind::Surface => "surface",
            ResourceKind::Font => "font",
            ResourceKind::ColorSpace => "color space",
            ResourceKind::ColorSpaceConversion => "color space conversion",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Failed to create {resource}: {reason}")]
    CreationFailed {
        resource: ResourceKind,
        reason: String,
    },
    #[error("Failed to decode '{}': {reason}", path.display())]
    DecodeFailed { path: PathBuf, reason: String },
    #[error("Capability not available on this backend: {0:?}")]
    UnsupportedCapability(Capabilities),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Handle used after the System was disposed")]
    Disposed,
    #[error("System disposed with {displays} display(s) and {surfaces} surface(s) still alive")]
    OutstandingHandles { displays: usize, surfaces: usize },
    #[error("A System instance already exists in this process")]
    AlreadyCreated,
    #[error("No System instance is registered")]
    NoInstance,
    #[error("The System instance is already borrowed")]
    InstanceBusy,
    #[error("Platform driver error: {0}")]
    Driver(#[from] DriverError),
}

impl SystemError {
    pub(crate) fn creation(resource: ResourceKind, reason: impl Into<String>) -> Self {
        SystemError::CreationFailed {
            resource,
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        SystemError::DecodeFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps a driver failure that happened while creating `resource`.
    pub(crate) fn driver_creation(resource: ResourceKind, error: DriverError) -> Self {
        match error {
            DriverError::Unsupported(what) => SystemError::creation(
                resource,
                format!("backend does not support {}", what),
            ),
            other => SystemError::creation(resource, other.to_string()),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SystemError::InvalidArgument(reason.into())
    }
}

pub type Result<T, E = SystemError> = std::result::Result<T, E>;
