//! # tinyhub-app
//!
//! Application layer — the stateful event-to-action controller and its
//! **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `CommandPublisher` — publish device commands on the bus
//!   - `WindowStateStore` — load & save the window mask
//! - Own derived household state (`StateAggregator`) and auto-off timers
//!   (`TimerManager`)
//! - Route inbound device events to handlers (`EventRouter`)
//! - Serialize inbound messages and timer expiries through one loop
//!   (`Controller`)
//!
//! ## Dependency rule
//! Depends on `tinyhub-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod ports;
pub mod router;
pub mod state;
pub mod timer;
