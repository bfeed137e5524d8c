//! Event router — turns inbound device notifications into state changes and
//! outbound commands.
//!
//! For each `(topic, body)` pair the router strips the namespace, looks the
//! device up in the [`RuleTable`], decodes the body for the rule's event
//! family and runs the matching handler. Every miss along the way is logged
//! and dropped; nothing here returns an error to the caller.

use tinyhub_domain::command::{Command, Intent, RampDirection};
use tinyhub_domain::event::{ContactState, EventKind, OccupancyState, SwitchAction};
use tinyhub_domain::id::{DeviceIdentity, TimerToken};
use tinyhub_domain::mask::Bit;
use tinyhub_domain::rule::{Rule, RuleTable};

use crate::ports::CommandPublisher;
use crate::state::StateAggregator;
use crate::timer::{ExpiryAction, ExpiryReceiver, TimerHandle, TimerManager};

/// What happened to one inbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The topic does not start with the bus namespace.
    ForeignNamespace,
    /// No rule exists for the source device.
    UnknownDevice,
    /// The body carries none of the markers the rule expects.
    Unparsed,
    /// The event was handled and `commands` commands were published.
    Handled { commands: usize },
}

/// Entry point of the controller. Owns the rule table, the aggregate state
/// and the timers; the only path through which they change.
pub struct EventRouter<P> {
    rules: RuleTable,
    state: StateAggregator,
    timers: TimerManager,
    publisher: P,
}

impl<P: CommandPublisher> EventRouter<P> {
    /// Build a router and create one disarmed timer per timer-controlled
    /// light declared in `rules`.
    ///
    /// The returned receiver delivers expiry tokens; feed them back through
    /// [`handle_expiry`](Self::handle_expiry).
    pub fn new(rules: RuleTable, state: StateAggregator, publisher: P) -> (Self, ExpiryReceiver) {
        let (mut timers, expiries) = TimerManager::new();
        for binding in rules.timers() {
            timers.create(
                binding.target.clone(),
                ExpiryAction {
                    target: binding.target.clone(),
                    light_bit: binding.light_bit,
                },
            );
        }
        let router = Self {
            rules,
            state,
            timers,
            publisher,
        };
        (router, expiries)
    }

    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    #[must_use]
    pub fn state(&self) -> &StateAggregator {
        &self.state
    }

    #[must_use]
    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    /// Route one notification.
    pub async fn route(&mut self, topic: &str, body: &[u8]) -> RouteOutcome {
        let Some(device) = self.rules.namespace().strip(topic) else {
            tracing::debug!(%topic, "ignoring message from foreign namespace");
            return RouteOutcome::ForeignNamespace;
        };
        let Some(rule) = self.rules.lookup(device).cloned() else {
            tracing::warn!(%device, "unrecognized device");
            return RouteOutcome::UnknownDevice;
        };
        let Some(event) = EventKind::decode(rule.family(), body) else {
            tracing::warn!(
                %device,
                body = %String::from_utf8_lossy(body),
                "unhandled message"
            );
            return RouteOutcome::Unparsed;
        };
        tracing::debug!(%device, %event, "event received");

        let commands = match (rule, event) {
            (Rule::Switch { targets }, EventKind::Switch(action)) => {
                let intent = self.switch_intent(action);
                self.emit_all(&targets, &intent).await
            }
            (Rule::SwitchWithTimer { target }, EventKind::Switch(action)) => {
                self.on_timer_switch(&target, action).await
            }
            (Rule::Contact { bit }, EventKind::Contact(state)) => {
                self.on_contact(bit, state).await
            }
            (Rule::Occupancy { target, light_bit }, EventKind::Occupancy(state)) => {
                self.on_occupancy(&target, light_bit, state).await
            }
            // `decode` only yields events of the rule's own family.
            _ => 0,
        };
        RouteOutcome::Handled { commands }
    }

    /// Run the fixed action of a timer whose countdown completed.
    ///
    /// Returns `false` for tokens the timer manager does not recognise.
    pub async fn handle_expiry(&mut self, token: TimerToken) -> bool {
        let Some(expired) = self.timers.expire(token) else {
            return false;
        };
        tracing::info!(device = %expired.identity, "auto-off timer expired");
        self.emit(&expired.action.target, &Intent::off()).await;
        self.forget_light(&expired.action);
        true
    }

    /// The light driven by `action` is going off: occupancy must switch it
    /// on again on the next motion.
    fn forget_light(&mut self, action: &ExpiryAction) {
        if let Some(bit) = action.light_bit {
            self.state.set_light(bit, false);
        }
    }

    fn switch_intent(&self, action: SwitchAction) -> Intent {
        match action {
            SwitchAction::Single => Intent::Toggle,
            SwitchAction::Double => Intent::TurnOn {
                brightness: Some(self.rules.presets().double_press_brightness),
                color: None,
            },
            SwitchAction::Hold => Intent::DimRampStart(RampDirection::Up),
            SwitchAction::Release => Intent::DimRampStop,
        }
    }

    /// Double press toggles the timer rather than the light: power state of
    /// these lights is not tracked locally.
    async fn on_timer_switch(&mut self, target: &DeviceIdentity, action: SwitchAction) -> usize {
        if action != SwitchAction::Double {
            let intent = self.switch_intent(action);
            return self.emit_all(std::slice::from_ref(target), &intent).await;
        }
        let Some(handle) = self.timer_for(target) else {
            return 0;
        };
        let presets = self.rules.presets().clone();
        let intent = if self.timers.remaining(handle).is_zero() {
            self.timers.arm(handle, presets.long_timer());
            tracing::info!(device = %target, secs = presets.long_timer_secs, "long timer armed");
            Intent::FlashAcknowledge
        } else {
            self.timers.disarm(handle);
            if let Some(action) = self.timers.action(handle).cloned() {
                self.forget_light(&action);
            }
            tracing::info!(device = %target, "long timer cancelled");
            Intent::TurnOff {
                transition: Some(presets.off_transition_secs),
            }
        };
        self.emit_all(std::slice::from_ref(target), &intent).await
    }

    /// Filters run only while every window is closed: "on" fires on the
    /// edge into all-closed, "off" on any window opening.
    async fn on_contact(&mut self, bit: Bit, state: ContactState) -> usize {
        let closed = state == ContactState::Closed;
        let (previous, current) = self.state.set_window(bit, closed);
        tracing::info!(windows = %current, "window state");
        if current == previous {
            return 0;
        }
        if !closed {
            tracing::info!("window opened, turning filters off");
            return self.emit_all(self.rules.filters(), &Intent::off()).await;
        }
        if current == self.rules.all_closed() {
            tracing::info!("all windows are closed, turning filters on");
            return self.emit_all(self.rules.filters(), &Intent::on()).await;
        }
        0
    }

    async fn on_occupancy(
        &mut self,
        target: &DeviceIdentity,
        light_bit: Bit,
        state: OccupancyState,
    ) -> usize {
        if state == OccupancyState::Clear {
            return 0;
        }
        let presets = self.rules.presets().clone();
        let mut commands = 0;
        if !self.state.is_light_on(light_bit) {
            let intent = Intent::TurnOn {
                brightness: Some(presets.occupancy_brightness),
                color: presets.occupancy_color.clone(),
            };
            commands = self.emit_all(std::slice::from_ref(target), &intent).await;
            self.state.set_light(light_bit, true);
        }
        if let Some(handle) = self.timer_for(target) {
            self.timers.arm(handle, presets.occupancy_timer());
        }
        commands
    }

    fn timer_for(&self, target: &DeviceIdentity) -> Option<TimerHandle> {
        match self.timers.find(target.as_str()) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(error = %err, "no timer bound to device");
                None
            }
        }
    }

    async fn emit_all(&self, targets: &[DeviceIdentity], intent: &Intent) -> usize {
        for target in targets {
            self.emit(target, intent).await;
        }
        targets.len()
    }

    /// Publish one command. Failures are logged and dropped.
    async fn emit(&self, target: &DeviceIdentity, intent: &Intent) {
        let command = Command::build(self.rules.namespace(), target, intent);
        tracing::info!(topic = %command.topic, payload = %command.payload, %intent, "sending command");
        if let Err(err) = self.publisher.publish(command).await {
            tracing::error!(device = %target, error = %err, "failed to publish command");
        }
    }
}
