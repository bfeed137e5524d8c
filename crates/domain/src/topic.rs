//! Topic naming on the device bus.
//!
//! - inbound events: `<namespace>/<device>`
//! - outbound commands: `<namespace>/<device>/set`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceIdentity;

/// Suffix appended to a device topic to address its command endpoint.
pub const COMMAND_SUFFIX: &str = "set";

/// Fixed topic segment identifying every event of the device bus
/// (`zigbee2mqtt` by default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Build a namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNamespace`] if `prefix` is empty or
    /// contains `/`, `+` or `#`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, ValidationError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.contains(['/', '+', '#']) {
            return Err(ValidationError::InvalidNamespace(prefix));
        }
        Ok(Self(prefix))
    }

    /// The bare prefix, without a trailing separator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip `<namespace>/` from a raw topic, returning the device name.
    ///
    /// Returns `None` for topics outside the namespace, and for the bare
    /// namespace with nothing after the separator.
    #[must_use]
    pub fn strip<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|device| !device.is_empty())
    }

    /// Topic on which `device` publishes its events.
    #[must_use]
    pub fn event_topic(&self, device: &DeviceIdentity) -> String {
        format!("{}/{device}", self.0)
    }

    /// Topic on which `device` accepts commands.
    #[must_use]
    pub fn command_topic(&self, device: &DeviceIdentity) -> String {
        format!("{}/{device}/{COMMAND_SUFFIX}", self.0)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self("zigbee2mqtt".to_string())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str) -> DeviceIdentity {
        DeviceIdentity::new(name).unwrap()
    }

    #[test]
    fn should_strip_matching_prefix() {
        let ns = Namespace::default();
        assert_eq!(ns.strip("zigbee2mqtt/Bedroom switch"), Some("Bedroom switch"));
    }

    #[test]
    fn should_reject_foreign_prefix() {
        let ns = Namespace::default();
        assert_eq!(ns.strip("homeassistant/Bedroom switch"), None);
    }

    #[test]
    fn should_reject_prefix_without_separator() {
        let ns = Namespace::default();
        assert_eq!(ns.strip("zigbee2mqttBedroom switch"), None);
        assert_eq!(ns.strip("zigbee2mqtt/"), None);
        assert_eq!(ns.strip("zigbee2mqtt"), None);
    }

    #[test]
    fn should_build_event_and_command_topics() {
        let ns = Namespace::default();
        let id = device("Kitchen Stove");
        assert_eq!(ns.event_topic(&id), "zigbee2mqtt/Kitchen Stove");
        assert_eq!(ns.command_topic(&id), "zigbee2mqtt/Kitchen Stove/set");
    }

    #[test]
    fn should_reject_invalid_namespaces() {
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("a/b").is_err());
        assert!(Namespace::new("#").is_err());
        assert!(Namespace::new("z2m").is_ok());
    }
}
