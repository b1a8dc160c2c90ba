use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::PlateError;
use crate::models::{PlateCandidate, PlateText};

/// Pixel-to-text capability.
///
/// Returns recognized fragments in reading order. An empty list is a valid
/// answer; `RecognitionUnavailable` is reserved for an engine that cannot run.
pub trait TextRecognizer: Send + Sync {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<String>, PlateError>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Arc<T> {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<String>, PlateError> {
        (**self).read_text(image)
    }
}

/// Locations of the two `ocrs` models
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModelPaths {
    pub detection_model: PathBuf,
    pub recognition_model: PathBuf,
}

impl OcrModelPaths {
    /// Standard `ocrs` cache location (`~/.cache/ocrs`)
    pub fn from_cache_dir() -> Result<Self, PlateError> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| PlateError::RecognitionUnavailable("cannot determine home directory".into()))?;
        Ok(Self::in_dir(Path::new(&home_dir).join(".cache/ocrs")))
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model: dir.join("text-detection.rten"),
            recognition_model: dir.join("text-recognition.rten"),
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> PlateError {
    PlateError::RecognitionUnavailable(e.to_string())
}

/// Initialize OCR engine from model files
pub fn init_ocr_engine(paths: &OcrModelPaths) -> Result<OcrEngine, PlateError> {
    if !paths.detection_model.exists() || !paths.recognition_model.exists() {
        return Err(PlateError::RecognitionUnavailable(format!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            paths.detection_model.display(),
            paths.recognition_model.display()
        )));
    }

    let detection_model = Model::load_file(&paths.detection_model).map_err(unavailable)?;
    let recognition_model = Model::load_file(&paths.recognition_model).map_err(unavailable)?;

    OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })
    .map_err(unavailable)
}

/// `ocrs`-backed recognizer. The engine is loaded on first use and reused.
pub struct OcrsRecognizer {
    paths: OcrModelPaths,
    // Arc so the lock can be released before running recognition
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    pub fn new(paths: OcrModelPaths) -> Self {
        Self {
            paths,
            engine: Mutex::new(None),
        }
    }

    fn engine(&self) -> Result<Arc<OcrEngine>, PlateError> {
        let mut guard = self
            .engine
            .lock()
            .map_err(|_| PlateError::RecognitionUnavailable("OCR engine lock poisoned".into()))?;
        if let Some(engine) = guard.as_ref() {
            return Ok(engine.clone());
        }
        info!(model = %self.paths.recognition_model.display(), "initializing OCR engine");
        let engine = Arc::new(init_ocr_engine(&self.paths)?);
        *guard = Some(engine.clone());
        Ok(engine)
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<String>, PlateError> {
        let engine = self.engine()?;

        let img = image.to_rgb8();
        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| PlateError::InvalidImage(e.to_string()))?;
        let ocr_input = engine.prepare_input(img_source).map_err(unavailable)?;
        let text = engine.get_text(&ocr_input).map_err(unavailable)?;

        Ok(text.lines().map(str::to_string).collect())
    }
}

/// Runs OCR on a localized plate and normalizes the result
pub struct TextExtractor<R> {
    recognizer: R,
}

impl<R: TextRecognizer> TextExtractor<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    pub fn extract(&self, candidate: &PlateCandidate) -> Result<PlateText, PlateError> {
        let fragments = self.recognizer.read_text(&candidate.image)?;
        debug!(?fragments, "OCR fragments");
        Ok(PlateText::from_fragments(&fragments))
    }
}
