//! Command publisher port — outbound side of the device bus.

use std::future::Future;

use tinyhub_domain::command::Command;
use tinyhub_domain::error::TinyHubError;

/// Publishes device commands on the bus.
///
/// Delivery is fire-and-forget from the controller's point of view: a
/// failed publish is logged by the caller and never retried.
pub trait CommandPublisher {
    /// Publish one command.
    fn publish(&self, command: Command) -> impl Future<Output = Result<(), TinyHubError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for std::sync::Arc<T> {
    fn publish(&self, command: Command) -> impl Future<Output = Result<(), TinyHubError>> + Send {
        (**self).publish(command)
    }
}
