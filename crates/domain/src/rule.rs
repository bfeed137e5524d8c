//! Rule table — the static mapping from source devices to handlers.
//!
//! The table is built once at startup from a [`RulesConfig`] and is
//! immutable afterwards. It is the single source of truth for routing and
//! for the set of timers the controller creates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::Color;
use crate::error::ValidationError;
use crate::event::EventFamily;
use crate::id::DeviceIdentity;
use crate::mask::{Bit, WindowMask};
use crate::topic::Namespace;

/// One entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleDefinition {
    /// Wireless button driving one or more lights.
    Switch {
        source: DeviceIdentity,
        targets: Vec<DeviceIdentity>,
    },
    /// Wireless button driving a light with an auto-off timer.
    SwitchWithTimer {
        source: DeviceIdentity,
        target: DeviceIdentity,
    },
    /// Window contact sensor owning one window bit.
    Contact { source: DeviceIdentity, bit: Bit },
    /// Motion sensor switching a light on and arming its auto-off timer.
    Occupancy {
        source: DeviceIdentity,
        target: DeviceIdentity,
        light_bit: Bit,
    },
}

impl RuleDefinition {
    fn source(&self) -> &DeviceIdentity {
        match self {
            Self::Switch { source, .. }
            | Self::SwitchWithTimer { source, .. }
            | Self::Contact { source, .. }
            | Self::Occupancy { source, .. } => source,
        }
    }
}

/// Tunable values used by the handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Presets {
    /// Brightness applied on a double press.
    pub double_press_brightness: u8,
    /// Brightness applied when motion switches a light on.
    pub occupancy_brightness: u8,
    /// Color applied when motion switches a light on.
    pub occupancy_color: Option<Color>,
    /// Fade-out used when a double press cancels a timer.
    pub off_transition_secs: u16,
    /// Timer armed by a double press on a timer-bound switch.
    pub long_timer_secs: u64,
    /// Auto-off delay restarted on every occupancy ping.
    pub occupancy_timer_secs: u64,
}

impl Presets {
    /// Duration armed by a double press on a timer-bound switch.
    #[must_use]
    pub fn long_timer(&self) -> Duration {
        Duration::from_secs(self.long_timer_secs)
    }

    /// Duration armed by each occupancy ping.
    #[must_use]
    pub fn occupancy_timer(&self) -> Duration {
        Duration::from_secs(self.occupancy_timer_secs)
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            double_press_brightness: 25,
            occupancy_brightness: 150,
            occupancy_color: Some(Color::ColorTemp(370)),
            off_transition_secs: 2,
            long_timer_secs: 60 * 60,
            occupancy_timer_secs: 5 * 60,
        }
    }
}

/// Routing configuration as read from the `[rules]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Topic prefix of the device bus.
    pub namespace: Namespace,
    pub presets: Presets,
    /// Devices switched on when every window is closed, off otherwise.
    pub filters: Vec<DeviceIdentity>,
    pub devices: Vec<RuleDefinition>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let id = |name: &str| DeviceIdentity(name.to_string());
        let bit = |index: u8| Bit(index);
        let switch = |source: &str, target: &str| RuleDefinition::Switch {
            source: id(source),
            targets: vec![id(target)],
        };
        let window = |source: &str, index: u8| RuleDefinition::Contact {
            source: id(source),
            bit: bit(index),
        };

        Self {
            namespace: Namespace::default(),
            presets: Presets::default(),
            filters: vec![id("Bedroom air filter"), id("Living room air filter")],
            devices: vec![
                switch("Living room switch - door side", "Living room lights"),
                switch("Living room switch - bedroom side", "Living room lights"),
                switch("Bedroom switch", "Bedroom lights"),
                switch("Kitchen Hall switch", "Kitchen Hall"),
                switch("Kitchen Stove switch", "Kitchen Stove"),
                RuleDefinition::SwitchWithTimer {
                    source: id("Hall switch"),
                    target: id("Hall light"),
                },
                RuleDefinition::Occupancy {
                    source: id("Hall motion sensor"),
                    target: id("Hall light"),
                    light_bit: bit(0),
                },
                window("Bedroom window left", 0),
                window("Bedroom window right", 1),
                window("Kitchen window right", 2),
                window("Living room window left", 3),
                window("Living room window right", 4),
            ],
        }
    }
}

/// Validated handler bound to one source device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Switch { targets: Vec<DeviceIdentity> },
    SwitchWithTimer { target: DeviceIdentity },
    Contact { bit: Bit },
    Occupancy { target: DeviceIdentity, light_bit: Bit },
}

impl Rule {
    /// Event family expected from the rule's source device.
    #[must_use]
    pub fn family(&self) -> EventFamily {
        match self {
            Self::Switch { .. } | Self::SwitchWithTimer { .. } => EventFamily::Switch,
            Self::Contact { .. } => EventFamily::Contact,
            Self::Occupancy { .. } => EventFamily::Occupancy,
        }
    }
}

/// A timer the controller must create at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerBinding {
    /// Light switched off when the timer expires.
    pub target: DeviceIdentity,
    /// Light bit cleared on expiry, for occupancy-controlled lights.
    pub light_bit: Option<Bit>,
}

/// Immutable routing table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    namespace: Namespace,
    presets: Presets,
    filters: Vec<DeviceIdentity>,
    rules: HashMap<DeviceIdentity, Rule>,
    all_closed: WindowMask,
    timers: Vec<TimerBinding>,
}

impl RuleTable {
    /// Validate `config` and freeze it into a table.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] on duplicate sources, window bits or
    /// light bits, on a light driven through more than one light bit, on
    /// switches without targets, and when contact rules
    /// exist without any filter device.
    pub fn build(config: RulesConfig) -> Result<Self, ValidationError> {
        let mut rules = HashMap::with_capacity(config.devices.len());
        let mut window_bits = BTreeSet::new();
        let mut light_bits = BTreeSet::new();
        let mut timers: BTreeMap<DeviceIdentity, Option<Bit>> = BTreeMap::new();

        for definition in config.devices {
            let source = definition.source().clone();
            if rules.contains_key(&source) {
                return Err(ValidationError::DuplicateSource(source));
            }
            let rule = match definition {
                RuleDefinition::Switch { targets, .. } => {
                    if targets.is_empty() {
                        return Err(ValidationError::NoTargets(source));
                    }
                    Rule::Switch { targets }
                }
                RuleDefinition::SwitchWithTimer { target, .. } => {
                    timers.entry(target.clone()).or_insert(None);
                    Rule::SwitchWithTimer { target }
                }
                RuleDefinition::Contact { bit, .. } => {
                    if !window_bits.insert(bit) {
                        return Err(ValidationError::DuplicateBit(bit.index()));
                    }
                    Rule::Contact { bit }
                }
                RuleDefinition::Occupancy {
                    target, light_bit, ..
                } => {
                    if !light_bits.insert(light_bit) {
                        return Err(ValidationError::DuplicateBit(light_bit.index()));
                    }
                    if let Some(Some(_)) = timers.insert(target.clone(), Some(light_bit)) {
                        return Err(ValidationError::ConflictingLightBit(target));
                    }
                    Rule::Occupancy { target, light_bit }
                }
            };
            rules.insert(source, rule);
        }

        if !window_bits.is_empty() && config.filters.is_empty() {
            return Err(ValidationError::NoFilters);
        }

        Ok(Self {
            namespace: config.namespace,
            presets: config.presets,
            filters: config.filters,
            rules,
            all_closed: WindowMask::from_bits(window_bits),
            timers: timers
                .into_iter()
                .map(|(target, light_bit)| TimerBinding { target, light_bit })
                .collect(),
        })
    }

    /// Exact, case-sensitive lookup of the rule for `source`.
    #[must_use]
    pub fn lookup(&self, source: &str) -> Option<&Rule> {
        self.rules.get(source)
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    /// Devices driven by window edges.
    #[must_use]
    pub fn filters(&self) -> &[DeviceIdentity] {
        &self.filters
    }

    /// Window mask value meaning "every tracked window is closed".
    #[must_use]
    pub fn all_closed(&self) -> WindowMask {
        self.all_closed
    }

    /// Timers to create at startup, one per timer-controlled light.
    #[must_use]
    pub fn timers(&self) -> &[TimerBinding] {
        &self.timers
    }

    /// Event topics of every source device, sorted.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .rules
            .keys()
            .map(|source| self.namespace.event_topic(source))
            .collect();
        topics.sort();
        topics
    }
}
