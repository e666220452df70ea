use crate::error::{Error, Result};
use ndarray::ArrayView4;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Number of species every classifier distinguishes.
pub const CLASS_COUNT: usize = 3;

/// Labels in the output order of the bundled cactus models.
pub const DEFAULT_LABELS: [&str; CLASS_COUNT] = ["Astrophytum asteria", "Ferocactus", "Gymnocalycium"];

/// Which of the two bundled classifiers a handle wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "CNN")]
    Cnn,
    #[serde(rename = "MobileNetV2")]
    MobileNetV2,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Cnn, ModelKind::MobileNetV2];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Cnn => "CNN",
            ModelKind::MobileNetV2 => "MobileNetV2",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatial input size declared by an artifact (NHWC, batch of one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Full tensor dimensions including the batch axis.
    pub fn tensor_dims(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }
}

/// Execution engine behind a classifier handle.
///
/// Implementations only need to be `Send`; the handle serializes calls.
pub trait InferenceBackend: Send {
    /// Input shape the artifact was exported with.
    fn input_shape(&self) -> InputShape;

    /// Run one forward pass and return the flattened first output.
    fn forward(&mut self, input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String>;
}

/// Loaded, ready-to-run classifier.
pub struct ClassifierHandle {
    kind: ModelKind,
    input_shape: InputShape,
    labels: Vec<String>,
    backend: Mutex<Box<dyn InferenceBackend>>,
}

impl ClassifierHandle {
    pub fn new(kind: ModelKind, labels: Vec<String>, backend: Box<dyn InferenceBackend>) -> Result<Self> {
        let labels = validate_labels(labels)?;
        let input_shape = backend.input_shape();
        if input_shape.channels != 3 || input_shape.height == 0 || input_shape.width == 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![1, input_shape.height, input_shape.width, 3],
                actual: input_shape.tensor_dims().to_vec(),
            });
        }
        tracing::debug!(model = %kind, ?input_shape, "classifier handle ready");
        Ok(Self {
            kind,
            input_shape,
            labels,
            backend: Mutex::new(backend),
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Exclusive access to the engine. A lock poisoned by a panicking
    /// forward pass is recovered so one failed request does not take the
    /// model down for the rest of the session.
    pub(crate) fn lock_backend(&self) -> MutexGuard<'_, Box<dyn InferenceBackend>> {
        self.backend.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(model = %self.kind, "recovering classifier after a panicked inference");
            self.backend.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("kind", &self.kind)
            .field("input_shape", &self.input_shape)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

/// Read a label side file: one label per line, blank lines ignored.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let labels: Vec<String> = raw
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect();
    validate_labels(labels).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub(crate) fn validate_labels(labels: Vec<String>) -> Result<Vec<String>> {
    if labels.len() != CLASS_COUNT {
        return Err(Error::Config(format!(
            "expected {CLASS_COUNT} class labels, found {}",
            labels.len()
        )));
    }
    for (i, label) in labels.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(Error::Config(format!("label {i} is empty")));
        }
        if labels[..i].contains(label) {
            return Err(Error::Config(format!("duplicate label {label:?}")));
        }
    }
    Ok(labels)
}

pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Fixed(InputShape);

    impl InferenceBackend for Fixed {
        fn input_shape(&self) -> InputShape {
            self.0
        }

        fn forward(&mut self, _input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    #[test]
    fn handle_takes_shape_from_backend() {
        let handle = ClassifierHandle::new(
            ModelKind::MobileNetV2,
            default_labels(),
            Box::new(Fixed(InputShape::new(224, 224, 3))),
        )
        .unwrap();
        assert_eq!(handle.input_shape().tensor_dims(), [1, 224, 224, 3]);
        assert_eq!(handle.labels()[2], "Gymnocalycium");
    }

    #[test]
    fn handle_rejects_non_rgb_artifacts() {
        let err = ClassifierHandle::new(
            ModelKind::Cnn,
            default_labels(),
            Box::new(Fixed(InputShape::new(150, 150, 1))),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn labels_file_skips_blank_lines() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Astrophytum asteria\n\n  Ferocactus  \nGymnocalycium\n")?;
        let labels = load_labels(file.path())?;
        assert_eq!(labels, default_labels());
        Ok(())
    }

    #[test]
    fn labels_must_be_three_distinct_names() {
        let two = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(validate_labels(two), Err(Error::Config(_))));
        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!(matches!(validate_labels(dup), Err(Error::Config(_))));
    }

    #[test]
    fn model_kind_display_names() {
        assert_eq!(ModelKind::Cnn.to_string(), "CNN");
        assert_eq!(ModelKind::MobileNetV2.to_string(), "MobileNetV2");
    }
}
