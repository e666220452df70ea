use std::path::PathBuf;

/// Errors produced by the classification pipeline.
///
/// The first six variants are request-scoped: they fail a single
/// classification and leave the loaded models usable. The rest only occur
/// at startup or while exporting a report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("cannot convert image to RGB: {0}")]
    ChannelConversionError(String),

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("inference failed for {model}: {reason}")]
    InferenceExecutionError { model: String, reason: String },

    #[error("score vector cannot be normalized: {0}")]
    DegenerateScoreVector(String),

    #[error("inference for {model} did not finish within {timeout_ms} ms")]
    InferenceTimeout { model: String, timeout_ms: u128 },

    #[error("failed to load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("report export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that only affect the current request.
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedImageFormat(_)
                | Error::ChannelConversionError(_)
                | Error::ShapeMismatch { .. }
                | Error::InferenceExecutionError { .. }
                | Error::DegenerateScoreVector(_)
                | Error::InferenceTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
