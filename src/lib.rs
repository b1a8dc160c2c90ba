pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use crate::core::{AuthorizationSet, Decision, EventLog, EventRecord, EventSummary, Gate, GateOutcome};
pub use crate::detection::PlateLocalizer;
pub use crate::detection::ocr::{OcrsRecognizer, TextExtractor, TextRecognizer};
pub use crate::error::{NotifyError, PlateError};
pub use crate::models::{Contour, PlateCandidate, PlateText};
pub use crate::pipeline::{BoundingBox, DebugConfig, MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep};
