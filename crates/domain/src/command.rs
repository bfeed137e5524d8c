//! Command formatting — semantic intents to `(topic, payload)` pairs.
//!
//! Pure functions only; publishing is the transport adapter's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::DeviceIdentity;
use crate::topic::Namespace;

/// Step rate used for dim ramps (`brightness_move_onoff`).
pub const DIM_RAMP_RATE: i16 = 100;

/// Light color requested alongside a turn-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Color temperature in mireds.
    ColorTemp(u16),
    /// RGB color as `#rrggbb`.
    Hex(String),
}

/// Direction of a continuous dim ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampDirection {
    Up,
    Down,
}

/// What we want a target device to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    TurnOn {
        brightness: Option<u8>,
        color: Option<Color>,
    },
    TurnOff {
        /// Fade-out duration in seconds.
        transition: Option<u16>,
    },
    Toggle,
    DimRampStart(RampDirection),
    DimRampStop,
    /// Short visual blink confirming that a request was accepted.
    FlashAcknowledge,
}

impl Intent {
    /// Plain `{"state":"ON"}`.
    #[must_use]
    pub fn on() -> Self {
        Self::TurnOn {
            brightness: None,
            color: None,
        }
    }

    /// Plain `{"state":"OFF"}`.
    #[must_use]
    pub fn off() -> Self {
        Self::TurnOff { transition: None }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn { .. } => f.write_str("turn_on"),
            Self::TurnOff { .. } => f.write_str("turn_off"),
            Self::Toggle => f.write_str("toggle"),
            Self::DimRampStart(RampDirection::Up) => f.write_str("dim_up"),
            Self::DimRampStart(RampDirection::Down) => f.write_str("dim_down"),
            Self::DimRampStop => f.write_str("dim_stop"),
            Self::FlashAcknowledge => f.write_str("flash"),
        }
    }
}

/// An outbound message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub topic: String,
    pub payload: String,
}

impl Command {
    /// Build the command addressing `target` inside `namespace`.
    #[must_use]
    pub fn build(namespace: &Namespace, target: &DeviceIdentity, intent: &Intent) -> Self {
        Self {
            topic: namespace.command_topic(target),
            payload: payload(intent),
        }
    }
}

#[derive(Default, Serialize)]
struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_temp: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<HexColor<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brightness_move_onoff: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effect: Option<&'static str>,
}

#[derive(Serialize)]
struct HexColor<'a> {
    hex: &'a str,
}

fn payload(intent: &Intent) -> String {
    let body = match intent {
        Intent::TurnOn { brightness, color } => {
            let mut body = Payload {
                state: Some("ON"),
                brightness: *brightness,
                ..Payload::default()
            };
            match color {
                Some(Color::ColorTemp(mireds)) => body.color_temp = Some(*mireds),
                Some(Color::Hex(hex)) => body.color = Some(HexColor { hex }),
                None => {}
            }
            body
        }
        Intent::TurnOff { transition } => Payload {
            state: Some("OFF"),
            transition: *transition,
            ..Payload::default()
        },
        Intent::Toggle => Payload {
            state: Some("TOGGLE"),
            ..Payload::default()
        },
        Intent::DimRampStart(direction) => Payload {
            brightness_move_onoff: Some(match direction {
                RampDirection::Up => DIM_RAMP_RATE,
                RampDirection::Down => -DIM_RAMP_RATE,
            }),
            ..Payload::default()
        },
        Intent::DimRampStop => Payload {
            brightness_move_onoff: Some(0),
            ..Payload::default()
        },
        Intent::FlashAcknowledge => Payload {
            effect: Some("blink"),
            ..Payload::default()
        },
    };
    // Serializing a struct of plain fields into a String cannot fail.
    serde_json::to_string(&body).unwrap_or_default()
}
