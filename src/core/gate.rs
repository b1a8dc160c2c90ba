use image::DynamicImage;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::authorization::{AuthorizationSet, Decision, decide};
use crate::core::event_log::{EventLog, EventRecord};
use crate::core::notify::{NotificationSink, Published};
use crate::detection::PlateLocalizer;
use crate::detection::ocr::{TextExtractor, TextRecognizer};
use crate::error::{NotifyError, PlateError};
use crate::models::PlateText;
use crate::pipeline::{BoundingBox, DebugConfig};

/// Everything known about one processed image
#[derive(Debug)]
pub struct GateOutcome {
    /// The record appended to the event log
    pub record: EventRecord,
    /// Where the plate was found, if anywhere
    pub region: Option<BoundingBox>,
    /// Reported separately; a failure here does not affect `record`
    pub notification: Result<Published, NotifyError>,
}

impl GateOutcome {
    pub fn decision(&self) -> Decision {
        self.record.decision
    }
}

/// Result of localization, recognition and decision, before any side effect
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub plate: PlateText,
    pub region: Option<BoundingBox>,
    pub decision: Decision,
}

/// Image in, one event record out.
///
/// The event log is owned by the caller and shared through an `Arc`, so it
/// outlives any single gate and can be read by reporting code at any time.
pub struct Gate<R, N> {
    localizer: PlateLocalizer,
    extractor: TextExtractor<R>,
    authorized: AuthorizationSet,
    log: Arc<EventLog>,
    sink: N,
}

impl<R: TextRecognizer, N: NotificationSink> Gate<R, N> {
    pub fn new(recognizer: R, authorized: AuthorizationSet, log: Arc<EventLog>, sink: N) -> Self {
        Self {
            localizer: PlateLocalizer::new(),
            extractor: TextExtractor::new(recognizer),
            authorized,
            log,
            sink,
        }
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Localize, recognize and decide. No side effects.
    /// OCR is only consulted when a plate region was found.
    pub fn evaluate(&self, img: &DynamicImage, debug: Option<DebugConfig>) -> Result<Evaluation, PlateError> {
        let (plate, region) = match self.localizer.localize_with_debug(img, debug)? {
            Some(candidate) => (self.extractor.extract(&candidate)?, Some(candidate.region)),
            None => (PlateText::empty(), None),
        };
        let decision = decide(&plate, &self.authorized);
        Ok(Evaluation { plate, region, decision })
    }

    /// Evaluate and append exactly one record. On error nothing is appended.
    pub fn process(&self, img: &DynamicImage, debug: Option<DebugConfig>) -> Result<(EventRecord, Option<BoundingBox>), PlateError> {
        let evaluation = self.evaluate(img, debug)?;
        let record = EventRecord::now(evaluation.plate, evaluation.decision);
        self.log.record(record.clone());
        info!(plate = %record.plate, decision = %record.decision, "access decision");
        Ok((record, evaluation.region))
    }

    /// Process, then publish the decision. The record is in the log before the
    /// sink is called.
    pub async fn handle(&self, img: &DynamicImage, debug: Option<DebugConfig>) -> Result<GateOutcome, PlateError> {
        let (record, region) = self.process(img, debug)?;

        let notification = self.sink.notify(&record).await;
        if let Err(e) = &notification {
            warn!(error = %e, decision = %record.decision, "failed to publish decision");
        }

        Ok(GateOutcome {
            record,
            region,
            notification,
        })
    }
}
