//! Integration tests for the full access flow: localize, recognize, decide,
//! record, notify.
//!
//! Tests cover:
//! - Authorized, denied and not-found outcomes
//! - Recognition failures leaving the log untouched
//! - Notification failures not affecting the recorded decision

mod common;

use common::*;
use std::sync::Arc;

fn gate<R: TextRecognizer, N: NotificationSink>(recognizer: R, sink: N) -> (Gate<R, N>, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let gate = Gate::new(recognizer, authorized_plates(), log.clone(), sink);
    (gate, log)
}

#[tokio::test]
async fn test_authorized_plate() -> anyhow::Result<()> {
    let recognizer = Arc::new(FakeRecognizer::new(&["CKN", " 364"]));
    let (gate, log) = gate(recognizer.clone(), RecordingSink::default());

    let outcome = gate.handle(&plate_image(), None).await?;

    assert!(outcome.region.is_some());
    assert_eq!(outcome.record.plate.as_str(), "CKN364");
    assert_eq!(outcome.decision(), Decision::Authorized);
    assert_eq!(recognizer.calls(), 1);

    let records = log.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], outcome.record);

    // The sink sees the logged record itself, timestamp included
    let sent = gate.sink().sent.lock().unwrap();
    assert_eq!(sent.as_slice(), &[outcome.record.clone()]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_plate_is_denied() -> anyhow::Result<()> {
    let (gate, log) = gate(FakeRecognizer::new(&["ABC123"]), RecordingSink::default());

    let outcome = gate.handle(&plate_image(), None).await?;

    assert_eq!(outcome.decision(), Decision::Denied);
    assert_eq!(log.snapshot()[0].plate.as_str(), "ABC123");
    Ok(())
}

#[tokio::test]
async fn test_blank_image_is_not_found_without_ocr() -> anyhow::Result<()> {
    let recognizer = Arc::new(FakeRecognizer::new(&["CKN364"]));
    let (gate, log) = gate(recognizer.clone(), RecordingSink::default());

    let outcome = gate.handle(&blank_image(), None).await?;

    assert_eq!(outcome.decision(), Decision::NotFound);
    assert!(outcome.region.is_none());
    assert!(outcome.record.plate.is_empty());
    assert_eq!(recognizer.calls(), 0);
    assert_eq!(log.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_whitespace_only_text_is_not_found() -> anyhow::Result<()> {
    let (gate, _log) = gate(FakeRecognizer::new(&["  ", "\n"]), NoopSink);

    let outcome = gate.handle(&plate_image(), None).await?;

    assert!(outcome.region.is_some());
    assert_eq!(outcome.decision(), Decision::NotFound);
    assert_eq!(outcome.notification?, Published::Skipped);
    Ok(())
}

#[tokio::test]
async fn test_recognition_unavailable_appends_nothing() -> anyhow::Result<()> {
    let sink = RecordingSink::default();
    let (gate, log) = gate(UnavailableRecognizer, sink);

    let result = gate.handle(&plate_image(), None).await;

    assert!(matches!(result, Err(PlateError::RecognitionUnavailable(_))));
    assert!(log.snapshot().is_empty());
    assert!(gate.sink().sent.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_image_appends_nothing() -> anyhow::Result<()> {
    let (gate, log) = gate(FakeRecognizer::new(&["CKN364"]), NoopSink);

    let result = gate.handle(&image::DynamicImage::new_rgb8(0, 0), None).await;

    assert!(matches!(result, Err(PlateError::InvalidImage(_))));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_notify_failure_keeps_authorized_record() -> anyhow::Result<()> {
    let (gate, log) = gate(FakeRecognizer::new(&["CKN364"]), FailingSink);

    let outcome = gate.handle(&plate_image(), None).await?;

    assert_eq!(outcome.decision(), Decision::Authorized);
    assert!(matches!(outcome.notification, Err(NotifyError::Transport(_))));

    let records = log.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision, Decision::Authorized);
    Ok(())
}

#[tokio::test]
async fn test_one_record_per_processed_image() -> anyhow::Result<()> {
    let (gate, log) = gate(FakeRecognizer::new(&["MXL931"]), NoopSink);

    let images = [plate_image(), blank_image(), plate_image(), plate_image()];
    for img in &images {
        gate.handle(img, None).await?;
    }

    let records = log.snapshot();
    assert_eq!(records.len(), images.len());
    let decisions: Vec<Decision> = records.iter().map(|r| r.decision).collect();
    assert_eq!(
        decisions,
        vec![
            Decision::Authorized,
            Decision::NotFound,
            Decision::Authorized,
            Decision::Authorized
        ]
    );
    assert_eq!(
        EventSummary::from_records(&records),
        EventSummary { total: 4, authorized: 3, denied: 0, not_found: 1 }
    );
    Ok(())
}

#[test]
fn test_evaluate_has_no_side_effects() -> anyhow::Result<()> {
    let (gate, log) = gate(FakeRecognizer::new(&["ABC123"]), NoopSink);

    let evaluation = gate.evaluate(&plate_image(), None)?;

    assert_eq!(evaluation.decision, Decision::Denied);
    assert!(log.is_empty());
    Ok(())
}

#[test]
fn test_log_outlives_gate() -> anyhow::Result<()> {
    let log = Arc::new(EventLog::new());
    {
        let gate = Gate::new(FakeRecognizer::new(&["CKN364"]), authorized_plates(), log.clone(), NoopSink);
        gate.process(&blank_image(), None)?;
    }
    assert_eq!(log.len(), 1);
    Ok(())
}
