//! Controller loop — the single owner of all mutable household state.
//!
//! Inbound bus messages and timer expiries arrive on two channels and are
//! processed one at a time by [`Controller::run`], so the router never needs
//! a lock.

use std::future::Future;

use tokio::sync::mpsc;

use tinyhub_domain::rule::RuleTable;

use crate::ports::{CommandPublisher, InboundMessage};
use crate::router::EventRouter;
use crate::state::StateAggregator;
use crate::timer::ExpiryReceiver;

/// Why [`Controller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future resolved.
    Shutdown,
    /// The transport closed its inbound channel.
    InboundClosed,
}

/// Event router plus the expiry channel of its timers.
pub struct Controller<P> {
    router: EventRouter<P>,
    expiries: ExpiryReceiver,
}

impl<P: CommandPublisher> Controller<P> {
    /// Create a controller over `rules`, starting from the restored `state`.
    pub fn new(rules: RuleTable, state: StateAggregator, publisher: P) -> Self {
        let (router, expiries) = EventRouter::new(rules, state, publisher);
        Self { router, expiries }
    }

    #[must_use]
    pub fn router(&self) -> &EventRouter<P> {
        &self.router
    }

    /// Process messages and expiries until `shutdown` resolves or the inbound
    /// channel closes.
    pub async fn run(
        &mut self,
        mut inbound: mpsc::Receiver<InboundMessage>,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        tracing::info!("controller started");
        tokio::pin!(shutdown);
        let reason = loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break StopReason::Shutdown,
                Some(token) = self.expiries.recv() => {
                    self.router.handle_expiry(token).await;
                }
                message = inbound.recv() => {
                    let Some(message) = message else {
                        break StopReason::InboundClosed;
                    };
                    let outcome = self.router.route(&message.topic, &message.payload).await;
                    tracing::trace!(topic = %message.topic, ?outcome, "message routed");
                }
            }
        };
        tracing::info!(?reason, "controller stopped");
        reason
    }
}
