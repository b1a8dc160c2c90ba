mod authorization;
mod event_log;
mod gate;
mod notify;

pub use authorization::{AuthorizationSet, Decision, decide};
pub use event_log::{EventLog, EventRecord, EventSummary};
pub use gate::{Evaluation, Gate, GateOutcome};
pub use notify::{
    DEFAULT_NOTIFY_TIMEOUT, MqttConfig, MqttSink, NoopSink, NotificationPayload, NotificationSink, Notifier,
    Published,
};
