//! # tinyhub-adapter-mqtt
//!
//! MQTT adapter: bridges the zigbee2mqtt device bus into the controller.
//!
//! ## Responsibilities
//! - Connect to the MQTT broker and keep the connection alive
//! - Subscribe to every rule source topic, again after each reconnect
//! - Forward received notifications as [`InboundMessage`]s
//! - Publish device commands ([`MqttPublisher`])
//!
//! ## Dependency rule
//! Depends on `tinyhub-app` and `tinyhub-domain`.

pub mod config;
pub mod error;

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeFilter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tinyhub_app::ports::{CommandPublisher, InboundMessage};
use tinyhub_domain::command::Command;
use tinyhub_domain::error::TinyHubError;

pub use config::MqttConfig;
pub use error::MqttError;

const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Running connection to the broker.
///
/// Owns the background task that drives the rumqttc event loop.
pub struct MqttBus {
    client: AsyncClient,
    pump: JoinHandle<()>,
}

/// Everything [`MqttBus::start`] hands back to the composition root.
pub struct MqttConnection {
    pub bus: MqttBus,
    pub publisher: MqttPublisher,
    pub inbound: mpsc::Receiver<InboundMessage>,
}

impl MqttBus {
    /// Connect to the broker described by `config` and subscribe to `topics`.
    ///
    /// The connection itself is established lazily by the background task;
    /// broker outages are retried every `reconnect_delay_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::NoSubscriptions`] when `topics` is empty.
    pub fn start(config: &MqttConfig, topics: Vec<String>) -> Result<MqttConnection, MqttError> {
        if topics.is_empty() {
            return Err(MqttError::NoSubscriptions);
        }

        let capacity = config.channel_capacity.max(1);
        let (client, event_loop) = AsyncClient::new(mqtt_options(config), capacity);
        let (inbound_tx, inbound) = mpsc::channel(capacity);

        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            topics = topics.len(),
            "starting MQTT bus"
        );

        let pump = tokio::spawn(pump_events(
            event_loop,
            client.clone(),
            topics,
            inbound_tx,
            config.reconnect_delay(),
        ));

        Ok(MqttConnection {
            bus: Self {
                client: client.clone(),
                pump,
            },
            publisher: MqttPublisher { client },
            inbound,
        })
    }

    /// Disconnect from the broker and stop the background task.
    pub async fn shutdown(self) {
        let Self { client, mut pump } = self;
        if let Err(err) = client.disconnect().await {
            tracing::warn!(error = %err, "failed to request MQTT disconnect");
        }
        if tokio::time::timeout(DISCONNECT_GRACE, &mut pump).await.is_err() {
            tracing::debug!("MQTT event loop did not stop in time, aborting");
            pump.abort();
        }
        tracing::info!("MQTT bus stopped");
    }
}

/// [`CommandPublisher`] publishing on the broker at QoS 1, not retained.
///
/// Commands are queued with `try_publish`: the event loop that drains the
/// queue may itself be waiting on the controller, so a full queue drops
/// the command instead of waiting.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl CommandPublisher for MqttPublisher {
    fn publish(&self, command: Command) -> impl Future<Output = Result<(), TinyHubError>> + Send {
        let result = self
            .client
            .try_publish(command.topic, QoS::AtLeastOnce, false, command.payload)
            .map_err(|err| TinyHubError::from(MqttError::Client(err)));
        std::future::ready(result)
    }
}

fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(config.keep_alive());
    options.set_clean_session(true);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    options
}

fn subscribe_filters(topics: &[String]) -> Vec<SubscribeFilter> {
    topics
        .iter()
        .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtLeastOnce))
        .collect()
}

/// Drive the event loop until disconnected or the inbound receiver is dropped.
async fn pump_events(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topics: Vec<String>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::info!(code = ?connack.code, "MQTT connected");
                // Clean sessions drop subscriptions on every reconnect.
                if let Err(err) = client.try_subscribe_many(subscribe_filters(&topics)) {
                    tracing::error!(error = %err, "failed to queue MQTT subscriptions");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(pkid = suback.pkid, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(topic = %publish.topic, bytes = publish.payload.len(), "MQTT message received");
                let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                if inbound_tx.send(message).await.is_err() {
                    tracing::debug!("inbound receiver dropped, stopping MQTT event loop");
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error, retrying");
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}
