mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from plategate for tests
pub use plategate::core::{
    AuthorizationSet, Decision, EventLog, EventRecord, EventSummary, Gate, GateOutcome, NoopSink,
    NotificationSink, Published,
};
pub use plategate::{BoundingBox, NotifyError, PlateError, PlateLocalizer, TextRecognizer};
