//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts them into
//! [`TinyHubError`] via `From` when crossing a port boundary.

use crate::id::DeviceIdentity;

/// Boxed error coming from an adapter (file system, broker client, …).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error shared by the application core and its ports.
#[derive(Debug, thiserror::Error)]
pub enum TinyHubError {
    /// A domain invariant was violated (rule table, identity, …).
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The persistence adapter failed.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// The pub/sub transport adapter failed.
    #[error("transport error")]
    Transport(#[source] BoxError),
}

/// Invariant violations detected while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A device identity was empty.
    #[error("device identity must not be empty")]
    EmptyIdentity,

    /// A device identity contained an MQTT wildcard or separator-only value.
    #[error("device identity {0:?} contains a wildcard character")]
    WildcardIdentity(String),

    /// The namespace prefix was empty or contained a `/`.
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    /// Two rules share the same source device.
    #[error("duplicate rule for source device {0}")]
    DuplicateSource(DeviceIdentity),

    /// A bit index does not fit in the mask width.
    #[error("bit {bit} is out of range (max {max})")]
    BitOutOfRange {
        /// Offending bit index.
        bit: u8,
        /// Largest accepted bit index.
        max: u8,
    },

    /// Two occupancy sensors drive the same light through different bits.
    #[error("light {0} is bound to more than one light bit")]
    ConflictingLightBit(DeviceIdentity),

    /// Two windows (or two lights) claim the same bit.
    #[error("bit {0} is assigned to more than one device")]
    DuplicateBit(u8),

    /// Contact rules exist but there is no filter device to drive.
    #[error("contact rules require at least one filter device")]
    NoFilters,

    /// A switch rule has no target device.
    #[error("rule for {0} has no target device")]
    NoTargets(DeviceIdentity),
}

/// A lookup by identity failed.
#[derive(Debug, thiserror::Error)]
#[error("{kind} {id} not found")]
pub struct NotFoundError {
    /// What was being looked up (e.g. `"Timer"`).
    pub kind: &'static str,
    /// The identity that was not found.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error() {
        let err: TinyHubError = ValidationError::EmptyIdentity.into();
        assert!(matches!(
            err,
            TinyHubError::Validation(ValidationError::EmptyIdentity)
        ));
    }

    #[test]
    fn should_display_not_found_error() {
        let err = NotFoundError {
            kind: "Timer",
            id: "Hall light".to_string(),
        };
        assert_eq!(err.to_string(), "Timer Hall light not found");
    }

    #[test]
    fn should_display_bit_out_of_range() {
        let err = ValidationError::BitOutOfRange { bit: 40, max: 31 };
        assert_eq!(err.to_string(), "bit 40 is out of range (max 31)");
    }
}
