//! Inbound side of the device bus.
//!
//! Transport adapters push every received message into an
//! `mpsc::Sender<InboundMessage>`; the controller drains the matching
//! receiver in arrival order.

/// One notification received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Full topic, including the namespace prefix.
    pub topic: String,
    /// Raw notification body.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
