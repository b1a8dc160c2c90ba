use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Bounding box in the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Clip a signed rectangle to an image of `img_width` x `img_height`.
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clipped(x: i32, y: i32, width: i32, height: i32, img_width: u32, img_height: u32) -> Option<Self> {
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + width as i64).min(img_width as i64);
        let y1 = (y as i64 + height as i64).min(img_height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Data that flows through the pipeline.
/// Each PipelineData is one derived image with the metadata stages attached to it.
#[derive(Clone)]
pub struct PipelineData {
    /// The derived image (grayscale, edge map, or a crop)
    pub image: DynamicImage,

    /// The untouched input, shared between stages
    pub original: Arc<DynamicImage>,

    /// Bounding box in the original image (None means full image)
    pub bbox: Option<BoundingBox>,

    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f32),
    Int(i32),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            bbox: None,
            metadata: HashMap::new(),
        }
    }

    /// Create PipelineData for a region of the original image
    pub fn from_region(image: DynamicImage, original: Arc<DynamicImage>, bbox: BoundingBox) -> Self {
        Self {
            image,
            original,
            bbox: Some(bbox),
            metadata: HashMap::new(),
        }
    }

    /// Same origin and metadata, new derived image
    pub fn derive(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            bbox: self.bbox,
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// A sub-directory for one input, so repeated runs don't overwrite each other
    pub fn for_input(&self, name: &str) -> Self {
        Self {
            output_dir: self.output_dir.join(name),
        }
    }

    fn save_stage(&self, stage_idx: usize, stage_name: &str, data: &[PipelineData]) -> Result<()> {
        let stage_dir_name = format!("{:02}_{}", stage_idx, stage_name.to_lowercase().replace(' ', "_"));
        let stage_dir = self.output_dir.join(&stage_dir_name);
        std::fs::create_dir_all(&stage_dir)?;

        for (idx, item) in data.iter().enumerate() {
            let output_path = stage_dir.join(format!("{:02}.png", idx + 1));
            item.image
                .save(&output_path)
                .with_context(|| format!("Failed to save debug image {}", output_path.display()))?;
        }

        debug!(stage = stage_name, images = data.len(), dir = %stage_dir.display(), "saved debug images");
        Ok(())
    }
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data.
    /// Steps can transform (1 → 1), select (many → fewer), or reject everything (→ 0).
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    pub fn with_debug(mut self, debug: Option<DebugConfig>) -> Self {
        self.context.debug = debug;
        self
    }

    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order on a single input image.
    /// Stops early once a step leaves nothing to process.
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        let mut data = vec![PipelineData::from_image(input)];

        if let Some(debug_config) = &self.context.debug {
            debug_config.save_stage(0, "input", &data)?;
        }

        for (step_idx, step) in self.steps.iter().enumerate() {
            debug!(step = step.name(), items = data.len(), "running pipeline step");
            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                debug_config.save_stage(step_idx + 1, step.name(), &data)?;
            }

            if data.is_empty() {
                debug!(step = step.name(), "pipeline produced no items, stopping");
                break;
            }
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
