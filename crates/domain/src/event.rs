//! Device events — typed decoding of zigbee2mqtt notification bodies.
//!
//! Bodies are small JSON objects whose key order and optional fields vary
//! between producers, so decoding is a marker test ("does the body contain
//! `"contact":true`?") rather than a structural parse. Markers are tried in
//! declaration order; the first hit wins.

use std::fmt;

/// Button press reported by a wireless switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAction {
    Single,
    Double,
    Hold,
    Release,
}

/// Reading of a window or door contact sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Open,
    Closed,
}

/// Reading of a motion sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyState {
    Occupied,
    Clear,
}

const SWITCH_MARKERS: &[(&str, SwitchAction)] = &[
    (r#""action":"single""#, SwitchAction::Single),
    (r#""action":"double""#, SwitchAction::Double),
    (r#""action":"hold""#, SwitchAction::Hold),
    (r#""action":"release""#, SwitchAction::Release),
];

const CONTACT_MARKERS: &[(&str, ContactState)] = &[
    (r#""contact":false"#, ContactState::Open),
    (r#""contact":true"#, ContactState::Closed),
];

const OCCUPANCY_MARKERS: &[(&str, OccupancyState)] = &[
    (r#""occupancy":true"#, OccupancyState::Occupied),
    (r#""occupancy":false"#, OccupancyState::Clear),
];

/// Which sensor class a rule expects from its source device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Switch,
    Contact,
    Occupancy,
}

/// A successfully decoded device event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Switch(SwitchAction),
    Contact(ContactState),
    Occupancy(OccupancyState),
}

impl EventKind {
    /// Decode `body` as an event of `family`.
    ///
    /// Returns `None` when none of the family's markers occur in the body;
    /// that is an expected outcome, not an error.
    #[must_use]
    pub fn decode(family: EventFamily, body: &[u8]) -> Option<Self> {
        match family {
            EventFamily::Switch => find_marker(body, SWITCH_MARKERS).map(Self::Switch),
            EventFamily::Contact => find_marker(body, CONTACT_MARKERS).map(Self::Contact),
            EventFamily::Occupancy => find_marker(body, OCCUPANCY_MARKERS).map(Self::Occupancy),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(action) => write!(f, "switch({action:?})"),
            Self::Contact(state) => write!(f, "contact({state:?})"),
            Self::Occupancy(state) => write!(f, "occupancy({state:?})"),
        }
    }
}

fn find_marker<T: Copy>(body: &[u8], markers: &[(&str, T)]) -> Option<T> {
    markers
        .iter()
        .find(|(marker, _)| contains(body, marker.as_bytes()))
        .map(|(_, value)| *value)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
