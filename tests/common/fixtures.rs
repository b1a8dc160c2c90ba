use image::{DynamicImage, ImageBuffer, Rgb};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use plategate::core::{AuthorizationSet, EventRecord, NotificationSink, Published};
use plategate::{NotifyError, PlateError, TextRecognizer};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Where [`plate_image`] draws the plate
pub const PLATE_X: u32 = 100;
pub const PLATE_Y: u32 = 110;
pub const PLATE_WIDTH: u32 = 200;
pub const PLATE_HEIGHT: u32 = 80;

/// A 400x300 dark scene with a bright, high-contrast plate and a few dark
/// glyph-like bars on it
pub fn plate_image() -> DynamicImage {
    let mut img = ImageBuffer::from_pixel(400, 300, Rgb([40u8, 40, 40]));
    draw_filled_rect_mut(
        &mut img,
        Rect::at(PLATE_X as i32, PLATE_Y as i32).of_size(PLATE_WIDTH, PLATE_HEIGHT),
        Rgb([245u8, 245, 245]),
    );
    for i in 0..6 {
        draw_filled_rect_mut(
            &mut img,
            Rect::at(PLATE_X as i32 + 20 + i * 28, PLATE_Y as i32 + 20).of_size(10, 40),
            Rgb([20u8, 20, 20]),
        );
    }
    DynamicImage::ImageRgb8(img)
}

/// Uniform image with no edges at all
pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(320, 240, Rgb([128u8, 128, 128])))
}

pub fn authorized_plates() -> AuthorizationSet {
    AuthorizationSet::new(["CKN364", "MXL931"])
}

/// Recognizer returning fixed fragments and counting how often it is asked
pub struct FakeRecognizer {
    fragments: Vec<String>,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for FakeRecognizer {
    fn read_text(&self, _image: &DynamicImage) -> Result<Vec<String>, PlateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fragments.clone())
    }
}

/// Recognizer whose engine can never be reached
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn read_text(&self, _image: &DynamicImage) -> Result<Vec<String>, PlateError> {
        Err(PlateError::RecognitionUnavailable("engine offline".to_string()))
    }
}

/// Sink that remembers every notification it receives
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<EventRecord>>,
}

impl NotificationSink for RecordingSink {
    async fn notify(&self, record: &EventRecord) -> Result<Published, NotifyError> {
        self.sent.lock().unwrap().push(record.clone());
        Ok(Published::Sent {
            topic: "test/topic".to_string(),
            bytes: 0,
        })
    }
}

/// Sink whose transport always fails
pub struct FailingSink;

impl NotificationSink for FailingSink {
    async fn notify(&self, _record: &EventRecord) -> Result<Published, NotifyError> {
        Err(NotifyError::Transport("broker unreachable".to_string()))
    }
}
