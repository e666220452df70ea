use crate::classifier::ModelKind;
use crate::compare::{Normalization, compare_with};
use crate::config::AppConfig;
use crate::error::Result;
use crate::inference::{self, ScoreVector};
use crate::preprocess::{self, ResizeFilter};
use crate::registry::ModelRegistry;
use crate::report::{self, DEFAULT_TITLE, Report};
use crate::sample::ImageSample;
use std::time::{Duration, Instant};

/// Runs one uploaded photo through both classifiers and builds the report.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: ModelRegistry,
    normalization: Normalization,
    resize_filter: ResizeFilter,
    timeout: Option<Duration>,
    title: String,
}

impl Pipeline {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            normalization: Normalization::default(),
            resize_filter: ResizeFilter::default(),
            timeout: None,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn from_config(registry: ModelRegistry, cfg: &AppConfig) -> Self {
        Self {
            registry,
            normalization: cfg.normalization,
            resize_filter: cfg.resize_filter,
            timeout: cfg.inference_timeout(),
            title: cfg.report_title.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn set_normalization(&mut self, normalization: Normalization) {
        self.normalization = normalization;
    }

    /// Decode an upload and classify it.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Report> {
        let image = ImageSample::decode(bytes)?;
        self.classify(&image)
    }

    pub fn classify(&self, image: &ImageSample) -> Result<Report> {
        let start = Instant::now();
        let (cnn, mobilenet) = rayon::join(
            || self.score(ModelKind::Cnn, image),
            || self.score(ModelKind::MobileNetV2, image),
        );
        let result = compare_with(&cnn?, &mobilenet?, self.registry.labels(), self.normalization)?;
        let report = report::assemble_titled(result, image, &self.title);
        tracing::info!(
            best = %report.best_model,
            cnn = %report.cnn.predicted_label,
            mobilenet = %report.mobilenet.predicted_label,
            elapsed = ?start.elapsed(),
            "classified image"
        );
        Ok(report)
    }

    /// Preprocess for and run a single model.
    pub fn score(&self, kind: ModelKind, image: &ImageSample) -> Result<ScoreVector> {
        let handle = self.registry.handle(kind);
        let tensor = preprocess::prepare_with(image, handle.input_shape(), self.resize_filter)?;
        match self.timeout {
            Some(timeout) => inference::run_with_timeout(tensor, handle, timeout),
            None => inference::run(&tensor, handle),
        }
    }
}
