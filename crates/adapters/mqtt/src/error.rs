//! MQTT adapter error types.

use tinyhub_domain::error::TinyHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// There is nothing to subscribe to.
    #[error("no topics to subscribe to")]
    NoSubscriptions,

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for TinyHubError {
    fn from(err: MqttError) -> Self {
        Self::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_no_subscriptions_error() {
        let err = MqttError::NoSubscriptions;
        assert_eq!(err.to_string(), "no topics to subscribe to");
    }

    #[test]
    fn should_convert_to_transport_error() {
        let err: TinyHubError = MqttError::NoSubscriptions.into();
        assert!(matches!(err, TinyHubError::Transport(_)));
    }
}
