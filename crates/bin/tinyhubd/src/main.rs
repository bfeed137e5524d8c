//! # tinyhubd — tinyhub daemon
//!
//! Composition root that wires the adapters to the controller and runs it.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and build the rule table
//! - Restore the window bitmask saved by the previous run
//! - Connect to the MQTT broker and subscribe to every rule source
//! - Run the controller until SIGINT/SIGTERM
//! - Persist the window bitmask and disconnect
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use anyhow::Context;
use tinyhub_adapter_mqtt::{MqttBus, MqttConnection};
use tinyhub_adapter_storage_file::FileWindowStore;
use tinyhub_app::controller::{Controller, StopReason};
use tinyhub_app::state::StateAggregator;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_target(true)
        .init();

    let rules = config.rule_table().context("failed to build rule table")?;
    tracing::info!(
        namespace = %rules.namespace(),
        sources = rules.subscriptions().len(),
        filters = rules.filters().len(),
        "rule table loaded"
    );

    // State
    let store = FileWindowStore::new(&config.state.path);
    let mut state = StateAggregator::new();
    state.restore(&store).await;

    // Transport
    let MqttConnection {
        bus,
        publisher,
        inbound,
    } = MqttBus::start(&config.mqtt, rules.subscriptions())
        .context("failed to start MQTT bus")?;

    // Controller
    let mut controller = Controller::new(rules, state, publisher);
    let reason = controller.run(inbound, shutdown_signal()).await;
    if reason == StopReason::InboundClosed {
        tracing::warn!("MQTT bus closed unexpectedly");
    }

    let persisted = controller.router().state().persist(&store).await;
    bus.shutdown().await;
    persisted.context("failed to persist window state")?;

    tracing::info!("tinyhubd stopped");
    Ok(())
}

/// Resolve on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
