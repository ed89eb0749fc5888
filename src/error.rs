//! Error taxonomy shared by the provider, registry and service.

use std::io;
use thiserror::Error;

/// Errors raised while configuring the plugin or reading a metric.
///
/// Variants carry messages rather than sources so an outcome can be cloned
/// into the cycle cache and served again within the same cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VitalsError {
    /// Invalid binding, unknown metric key or other bad setting. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration sources could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),

    /// The reading is not available right now (no sensor, path missing, ...).
    #[error("{what} unavailable: {reason}")]
    Unavailable { what: String, reason: String },

    /// Unexpected OS-level failure or unparsable provider data.
    #[error("provider failure reading {what}: {reason}")]
    Provider { what: String, reason: String },
}

impl VitalsError {
    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Classify an I/O error from reading `what`.
    ///
    /// Missing files and denied access mean the reading simply is not
    /// available on this host; anything else points at a changed environment.
    pub fn from_io(what: impl Into<String>, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::unavailable(what, err.to_string())
            }
            _ => Self::provider(what, err.to_string()),
        }
    }
}

impl From<figment::Error> for VitalsError {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(err.to_string())
    }
}

pub type Result<T, E = VitalsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_unavailable() {
        let err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        assert!(matches!(
            VitalsError::from_io("cpu_temp", &err),
            VitalsError::Unavailable { .. }
        ));
    }

    #[test]
    fn other_io_failure_is_provider_error() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "garbage");
        let classified = VitalsError::from_io("/proc/stat", &err);
        assert!(matches!(classified, VitalsError::Provider { .. }));
    }
}
