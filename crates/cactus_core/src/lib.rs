//! Dual-model cactus classification: preprocessing, inference on two
//! classifiers, comparison of their confidences and report rendering.

pub mod classifier;
pub mod compare;
pub mod config;
pub mod error;
pub mod inference;
#[cfg(feature = "ort")]
pub mod ort_backend;
pub mod pdf;
pub mod pipeline;
pub mod preprocess;
pub mod registry;
pub mod report;
pub mod sample;

pub use classifier::{
    CLASS_COUNT, ClassifierHandle, DEFAULT_LABELS, InferenceBackend, InputShape, ModelKind,
    default_labels, load_labels,
};
pub use compare::{ComparisonResult, Normalization, Prediction, compare, compare_with};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use inference::{ScoreVector, run, run_with_timeout};
pub use pdf::{render_pdf, save_pdf};
pub use pipeline::Pipeline;
pub use preprocess::{InputTensor, ResizeFilter, prepare, prepare_with};
pub use registry::ModelRegistry;
pub use report::{Report, assemble, export_csv, format_confidence};
pub use sample::ImageSample;

/// Array types used by [`InferenceBackend`] implementations.
pub use ndarray;
