//! Timer manager — one-shot, re-armable countdowns bound to devices.
//!
//! Each countdown runs as a tokio task that sleeps until its deadline and
//! then sends its [`TimerToken`] over the expiry channel. The controller
//! hands every received token back to [`TimerManager::expire`], which
//! resolves it against the manager's own table. Tokens that are unknown or
//! belong to a countdown that was re-armed or disarmed in the meantime are
//! rejected, so a late notification can never fire the wrong action.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use tinyhub_domain::error::NotFoundError;
use tinyhub_domain::id::{DeviceIdentity, TimerToken};
use tinyhub_domain::mask::Bit;

/// Receiving end of the expiry notifications.
pub type ExpiryReceiver = mpsc::UnboundedReceiver<TimerToken>;

/// Reference to a timer created by a [`TimerManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(usize);

/// Fixed action bound to a timer at creation: switch `target` off and, for
/// occupancy-controlled lights, forget that it is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryAction {
    pub target: DeviceIdentity,
    pub light_bit: Option<Bit>,
}

/// A countdown that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    pub identity: DeviceIdentity,
    pub action: ExpiryAction,
}

#[derive(Debug)]
struct Countdown {
    token: TimerToken,
    deadline: Instant,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct TimerSlot {
    identity: DeviceIdentity,
    action: ExpiryAction,
    countdown: Option<Countdown>,
}

/// Owner of every timer's armed state and deadline.
#[derive(Debug)]
pub struct TimerManager {
    slots: Vec<TimerSlot>,
    by_identity: HashMap<DeviceIdentity, TimerHandle>,
    live_tokens: HashMap<TimerToken, TimerHandle>,
    expiry_tx: mpsc::UnboundedSender<TimerToken>,
}

impl TimerManager {
    /// Create an empty manager and the channel its countdowns report to.
    #[must_use]
    pub fn new() -> (Self, ExpiryReceiver) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let manager = Self {
            slots: Vec::new(),
            by_identity: HashMap::new(),
            live_tokens: HashMap::new(),
            expiry_tx,
        };
        (manager, expiry_rx)
    }

    /// Allocate a disarmed timer for `identity`.
    ///
    /// Creating a second timer for the same identity returns the existing
    /// handle; the first action stays bound.
    pub fn create(&mut self, identity: DeviceIdentity, action: ExpiryAction) -> TimerHandle {
        if let Some(handle) = self.by_identity.get(&identity) {
            tracing::warn!(device = %identity, "timer already exists, keeping the first one");
            return *handle;
        }
        let handle = TimerHandle(self.slots.len());
        tracing::debug!(device = %identity, target = %action.target, "timer created");
        self.by_identity.insert(identity.clone(), handle);
        self.slots.push(TimerSlot {
            identity,
            action,
            countdown: None,
        });
        handle
    }

    /// Look up the timer bound to `identity`.
    #[must_use]
    pub fn handle(&self, identity: &str) -> Option<TimerHandle> {
        self.by_identity.get(identity).copied()
    }

    /// Like [`handle`](Self::handle), reporting a missing timer as an error.
    ///
    /// # Errors
    ///
    /// Returns a [`NotFoundError`] when no timer is bound to `identity`.
    pub fn find(&self, identity: &str) -> Result<TimerHandle, NotFoundError> {
        self.handle(identity).ok_or_else(|| NotFoundError {
            kind: "Timer",
            id: identity.to_string(),
        })
    }

    /// Fixed action bound to the timer at creation.
    #[must_use]
    pub fn action(&self, handle: TimerHandle) -> Option<&ExpiryAction> {
        self.slots.get(handle.0).map(|slot| &slot.action)
    }

    /// Start a countdown of `duration`, replacing any running one.
    ///
    /// A zero duration disarms the timer.
    pub fn arm(&mut self, handle: TimerHandle, duration: Duration) {
        if duration.is_zero() {
            self.disarm(handle);
            return;
        }
        let Some(slot) = self.slots.get_mut(handle.0) else {
            tracing::warn!(?handle, "arm called with an unknown timer handle");
            return;
        };
        if let Some(previous) = slot.countdown.take() {
            previous.task.abort();
            self.live_tokens.remove(&previous.token);
        }

        let token = TimerToken::new();
        let deadline = Instant::now() + duration;
        let tx = self.expiry_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // The receiver is gone only when the controller shut down.
            let _ = tx.send(token);
        });

        tracing::debug!(
            device = %slot.identity,
            %token,
            duration_secs = duration.as_secs(),
            "timer armed"
        );
        slot.countdown = Some(Countdown {
            token,
            deadline,
            task,
        });
        self.live_tokens.insert(token, handle);
    }

    /// Cancel any pending expiry.
    pub fn disarm(&mut self, handle: TimerHandle) {
        let Some(slot) = self.slots.get_mut(handle.0) else {
            return;
        };
        if let Some(countdown) = slot.countdown.take() {
            countdown.task.abort();
            self.live_tokens.remove(&countdown.token);
            tracing::debug!(device = %slot.identity, "timer disarmed");
        }
    }

    /// Time left before expiry; zero when disarmed or already due.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Duration {
        self.slots
            .get(handle.0)
            .and_then(|slot| slot.countdown.as_ref())
            .map_or(Duration::ZERO, |countdown| {
                countdown.deadline.saturating_duration_since(Instant::now())
            })
    }

    #[must_use]
    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.slots
            .get(handle.0)
            .is_some_and(|slot| slot.countdown.is_some())
    }

    /// Resolve an expiry notification.
    ///
    /// Returns the action to run when `token` belongs to a live countdown;
    /// that timer is disarmed as part of the call, so it fires once.
    pub fn expire(&mut self, token: TimerToken) -> Option<Expired> {
        let Some(handle) = self.live_tokens.remove(&token) else {
            tracing::debug!(%token, "ignoring expiry of an unknown or stale timer");
            return None;
        };
        let slot = self.slots.get_mut(handle.0)?;
        slot.countdown = None;
        tracing::debug!(device = %slot.identity, %token, "timer expired");
        Some(Expired {
            identity: slot.identity.clone(),
            action: slot.action.clone(),
        })
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(countdown) = slot.countdown.take() {
                countdown.task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> DeviceIdentity {
        DeviceIdentity::new(name).unwrap()
    }

    fn manager_with_light() -> (TimerManager, ExpiryReceiver, TimerHandle) {
        let (mut timers, rx) = TimerManager::new();
        let handle = timers.create(
            id("Hall light"),
            ExpiryAction {
                target: id("Hall light"),
                light_bit: Some(Bit::new(0).unwrap()),
            },
        );
        (timers, rx, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn should_start_disarmed() {
        let (timers, _rx, handle) = manager_with_light();
        assert!(!timers.is_armed(handle));
        assert_eq!(timers.remaining(handle), Duration::ZERO);
        assert_eq!(timers.handle("Hall light"), Some(handle));
        assert_eq!(timers.handle("Porch light"), None);
    }

    #[tokio::test]
    async fn should_report_missing_timer_as_not_found() {
        let (timers, _rx, handle) = manager_with_light();
        assert_eq!(timers.find("Hall light").unwrap(), handle);
        let err = timers.find("Porch light").unwrap_err();
        assert_eq!(err.to_string(), "Timer Porch light not found");
    }

    #[tokio::test]
    async fn should_expose_bound_action() {
        let (timers, _rx, handle) = manager_with_light();
        let action = timers.action(handle).unwrap();
        assert_eq!(action.target, id("Hall light"));
        assert_eq!(action.light_bit, Some(Bit::new(0).unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_remaining_time_while_armed() {
        let (mut timers, _rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(300));
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(timers.is_armed(handle));
        assert_eq!(timers.remaining(handle), Duration::from_secs(200));
    }

    #[tokio::test(start_paused = true)]
    async fn should_replace_remaining_time_when_rearmed() {
        let (mut timers, _rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(3600));
        tokio::time::advance(Duration::from_secs(10)).await;
        timers.arm(handle, Duration::from_secs(60));
        assert_eq!(timers.remaining(handle), Duration::from_secs(60));

        timers.arm(handle, Duration::from_secs(600));
        assert_eq!(timers.remaining(handle), Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn should_disarm_when_armed_with_zero() {
        let (mut timers, _rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(60));
        timers.arm(handle, Duration::ZERO);
        assert!(!timers.is_armed(handle));
        assert_eq!(timers.remaining(handle), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fire_bound_action_once_on_expiry() {
        let (mut timers, mut rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(5));

        let token = rx.recv().await.unwrap();
        let expired = timers.expire(token).unwrap();
        assert_eq!(expired.identity, id("Hall light"));
        assert_eq!(expired.action.light_bit, Some(Bit::new(0).unwrap()));
        assert!(!timers.is_armed(handle));
        assert_eq!(timers.remaining(handle), Duration::ZERO);

        assert_eq!(timers.expire(token), None);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_notify_after_disarm() {
        let (mut timers, mut rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(5));
        timers.disarm(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_stale_token_after_rearm() {
        let (mut timers, _rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(5));
        let stale = *timers.live_tokens.keys().next().unwrap();
        timers.arm(handle, Duration::from_secs(60));

        assert_eq!(timers.expire(stale), None);
        assert!(timers.is_armed(handle));
        assert_eq!(timers.remaining(handle), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reject_unknown_token() {
        let (mut timers, _rx, handle) = manager_with_light();
        timers.arm(handle, Duration::from_secs(5));
        assert_eq!(timers.expire(TimerToken::new()), None);
        assert!(timers.is_armed(handle));
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_first_timer_for_duplicate_identity() {
        let (mut timers, _rx, handle) = manager_with_light();
        let again = timers.create(
            id("Hall light"),
            ExpiryAction {
                target: id("Other"),
                light_bit: None,
            },
        );
        assert_eq!(again, handle);
    }
}
