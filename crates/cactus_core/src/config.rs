//! Application configuration, read from TOML.

use crate::classifier::{self, ModelKind};
use crate::compare::Normalization;
use crate::error::{Error, Result};
use crate::preprocess::ResizeFilter;
use crate::report::DEFAULT_TITLE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a model artifact lives and how to fill in dynamic dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Square input size used only when the artifact leaves H/W dynamic.
    #[serde(default)]
    pub input_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    #[serde(default = "default_cnn")]
    pub cnn: ModelConfig,
    #[serde(default = "default_mobilenet")]
    pub mobilenet: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            cnn: default_cnn(),
            mobilenet: default_mobilenet(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub labels: Vec<String>,
    /// Side file with one label per line; overrides `labels`.
    pub labels_path: Option<PathBuf>,
    pub normalization: Normalization,
    pub resize_filter: ResizeFilter,
    /// Per-invocation deadline in milliseconds; 0 disables it.
    pub inference_timeout_ms: u64,
    pub report_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            labels: classifier::default_labels(),
            labels_path: None,
            normalization: Normalization::L1,
            resize_filter: ResizeFilter::Triangle,
            inference_timeout_ms: 10_000,
            report_title: DEFAULT_TITLE.to_string(),
        }
    }
}

fn default_cnn() -> ModelConfig {
    ModelConfig {
        path: PathBuf::from("models/cnn_kaktus.onnx"),
        input_size: None,
    }
}

fn default_mobilenet() -> ModelConfig {
    ModelConfig {
        path: PathBuf::from("models/mobilenet_kaktus.onnx"),
        input_size: None,
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_toml_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        cfg.resolve_relative_to(path.parent().unwrap_or(Path::new(".")));
        Ok(cfg)
    }

    /// Like [`AppConfig::load_from_path`], but a missing file yields defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    pub fn model(&self, kind: ModelKind) -> &ModelConfig {
        match kind {
            ModelKind::Cnn => &self.models.cnn,
            ModelKind::MobileNetV2 => &self.models.mobilenet,
        }
    }

    /// Labels from `labels_path` if set, otherwise the inline list.
    pub fn resolve_labels(&self) -> Result<Vec<String>> {
        match &self.labels_path {
            Some(path) => classifier::load_labels(path),
            None => classifier::validate_labels(self.labels.clone()),
        }
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        (self.inference_timeout_ms > 0).then(|| Duration::from_millis(self.inference_timeout_ms))
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for model in [&mut self.models.cnn, &mut self.models.mobilenet] {
            if model.path.is_relative() {
                model.path = base.join(&model.path);
            }
        }
        if let Some(labels) = self.labels_path.as_mut()
            && labels.is_relative()
        {
            *labels = base.join(&*labels);
        }
    }
}
