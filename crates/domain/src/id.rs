//! Identifiers: device identities (strings chosen by the bus) and opaque
//! timer tokens (UUIDs minted by the controller).

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable name of a physical device or endpoint, e.g. `"Bedroom switch"`.
///
/// Used as the routing key for inbound events, the target of outbound
/// commands and the correlation key for timers. Comparison is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity(pub(crate) String);

impl DeviceIdentity {
    /// Build an identity, rejecting empty names and MQTT wildcards.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyIdentity`] or
    /// [`ValidationError::WildcardIdentity`].
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyIdentity);
        }
        if name.contains(['+', '#']) {
            return Err(ValidationError::WildcardIdentity(name));
        }
        Ok(Self(name))
    }

    /// The raw device name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceIdentity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceIdentity> for String {
    fn from(value: DeviceIdentity) -> Self {
        value.0
    }
}

impl Borrow<str> for DeviceIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(
    /// Opaque correlation token for one armed countdown.
    ///
    /// A fresh token is minted on every arm, so a notification carrying the
    /// token of a countdown that has since been re-armed or disarmed can be
    /// told apart from the live one.
    TimerToken
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_names_with_spaces() {
        let id = DeviceIdentity::new("Living room switch - door side").unwrap();
        assert_eq!(id.as_str(), "Living room switch - door side");
        assert_eq!(id.to_string(), "Living room switch - door side");
    }

    #[test]
    fn should_reject_empty_identity() {
        assert_eq!(DeviceIdentity::new(""), Err(ValidationError::EmptyIdentity));
    }

    #[test]
    fn should_reject_wildcards() {
        assert!(matches!(
            DeviceIdentity::new("lights/#"),
            Err(ValidationError::WildcardIdentity(_))
        ));
        assert!(matches!(
            DeviceIdentity::new("+"),
            Err(ValidationError::WildcardIdentity(_))
        ));
    }

    #[test]
    fn should_reject_invalid_identity_when_deserializing() {
        let result: Result<DeviceIdentity, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_generate_unique_tokens_when_called_twice() {
        let a = TimerToken::new();
        let b = TimerToken::new();
        assert_ne!(a, b);
    }

    #[test]
    fn should_display_token_as_uuid() {
        let token = TimerToken::new();
        assert_eq!(token.to_string().len(), 36);
    }
}
