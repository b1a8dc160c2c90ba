use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, QoS};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use time::macros::format_description;
use tracing::debug;
use uuid::Uuid;

use crate::core::event_log::EventRecord;
use crate::error::NotifyError;
use crate::models::PlateText;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// What a sink did with a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Sent { topic: String, bytes: usize },
    /// Notification is disabled
    Skipped,
}

/// Side channel for decisions. Failures are reported, never propagated into
/// the decision itself.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, record: &EventRecord) -> impl Future<Output = Result<Published, NotifyError>> + Send;
}

/// Wire payload, serialized as compact JSON
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub timestamp: String,
    pub plate: PlateText,
    pub authorized: bool,
    pub status: &'static str,
}

impl NotificationPayload {
    /// Carries the record's own timestamp, so the published event and the log
    /// entry agree
    pub fn from_record(record: &EventRecord) -> Self {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        Self {
            timestamp: record.timestamp.format(format).unwrap_or_default(),
            plate: record.plate.clone(),
            authorized: record.decision.is_authorized(),
            status: record.decision.description(),
        }
    }
}

/// Used when no notification destination is configured
#[derive(Debug, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    async fn notify(&self, _record: &EventRecord) -> Result<Published, NotifyError> {
        Ok(Published::Skipped)
    }
}

/// Broker address and topic for [`MqttSink`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_timeout_secs", rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "plategate".to_string()
}

fn default_timeout_secs() -> Duration {
    DEFAULT_NOTIFY_TIMEOUT
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Publishes each decision at-most-once (QoS 0) to an MQTT topic.
///
/// Every notification opens its own short-lived connection; the whole attempt
/// (connect, publish, disconnect) is bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct MqttSink {
    config: MqttConfig,
}

impl MqttSink {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), NotifyError> {
        let transport = |e: &dyn std::fmt::Display| NotifyError::Transport(e.to_string());

        let client_id = format!("{}-{}", self.config.client_id, Uuid::new_v4().simple());
        let options = MqttOptions::new(client_id, self.config.host.as_str(), self.config.port);
        let (client, mut eventloop) = AsyncClient::new(options, 10);

        client
            .publish(self.config.topic.as_str(), QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| transport(&e))?;

        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Publish(_))) => break,
                Ok(event) => debug!(?event, "mqtt event"),
                Err(e) => return Err(transport(&e)),
            }
        }

        // Best effort: the publish is already on the wire
        if client.disconnect().await.is_ok() {
            let _ = eventloop.poll().await;
        }
        Ok(())
    }
}

impl NotificationSink for MqttSink {
    async fn notify(&self, record: &EventRecord) -> Result<Published, NotifyError> {
        let payload = serde_json::to_vec(&NotificationPayload::from_record(record))?;
        let bytes = payload.len();

        match tokio::time::timeout(self.config.timeout, self.publish(payload)).await {
            Ok(Ok(())) => Ok(Published::Sent {
                topic: self.config.topic.clone(),
                bytes,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NotifyError::Timeout(self.config.timeout)),
        }
    }
}

/// Sink chosen from configuration at startup
#[derive(Debug, Clone)]
pub enum Notifier {
    Disabled,
    Mqtt(MqttSink),
}

impl Notifier {
    pub fn from_config(config: Option<MqttConfig>) -> Self {
        match config {
            Some(config) => Notifier::Mqtt(MqttSink::new(config)),
            None => Notifier::Disabled,
        }
    }
}

impl NotificationSink for Notifier {
    async fn notify(&self, record: &EventRecord) -> Result<Published, NotifyError> {
        match self {
            Notifier::Disabled => NoopSink.notify(record).await,
            Notifier::Mqtt(sink) => sink.notify(record).await,
        }
    }
}
