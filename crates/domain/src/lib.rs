//! # tinyhub-domain
//!
//! Pure domain model for the tinyhub home automation controller.
//!
//! ## Responsibilities
//! - Foundational types: device identities, timer tokens, error conventions
//! - Define **Events** (switch presses, window contacts, motion) and their
//!   marker-based decoding from notification bodies
//! - Define **Masks** (window-closed and light-on bitmasks)
//! - Define **Commands** (intents such as `turn_off` or `toggle` and their
//!   topic/payload formatting)
//! - Define the **Rule table** mapping source devices to handlers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod topic;

pub mod command;
pub mod event;
pub mod mask;
pub mod rule;
