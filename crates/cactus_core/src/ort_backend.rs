//! ONNX Runtime engine for exported classifier artifacts.

use crate::classifier::{InferenceBackend, InputShape};
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use ndarray::{ArrayView4, CowArray};
use once_cell::sync::Lazy;
use ort::{
    GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
    tensor::OrtOwnedTensor, value::Value,
};
use std::path::Path;
use std::sync::Arc;

static ORT_ENV: Lazy<std::result::Result<Arc<Environment>, String>> = Lazy::new(|| {
    Environment::builder()
        .with_name("cactus-compare")
        .build()
        .map(|env| env.into_arc())
        .map_err(|e| e.to_string())
});

pub struct OrtBackend {
    session: Session,
    input_shape: InputShape,
}

impl OrtBackend {
    pub fn load(cfg: &ModelConfig) -> Result<Self> {
        let path = cfg.path.as_path();
        if !path.exists() {
            return Err(load_error(path, "model file is missing"));
        }
        let env = ORT_ENV.as_ref().map_err(|e| load_error(path, e))?.clone();
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|b| b.with_model_from_file(path))
            .map_err(|e| load_error(path, e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| load_error(path, "model declares no inputs"))?;
        let input_shape = declared_shape(&input.dimensions, cfg.input_size)
            .map_err(|reason| load_error(path, reason))?;

        tracing::info!(
            path = %path.display(),
            input = %input.name,
            ?input_shape,
            "loaded ONNX classifier"
        );
        Ok(Self {
            session,
            input_shape,
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    fn forward(&mut self, input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String> {
        let cow = CowArray::from(input.into_dyn());
        let value = Value::from_array(self.session.allocator(), &cow)
            .map_err(|e| format!("cannot build input tensor: {e}"))?;
        let outputs: Vec<Value> = self.session.run(vec![value]).map_err(|e| e.to_string())?;
        let first = outputs.first().ok_or("model returned no outputs")?;
        let scores: OrtOwnedTensor<f32, _> = first.try_extract().map_err(|e| e.to_string())?;
        let view = scores.view();
        Ok(view.iter().cloned().collect())
    }
}

/// Resolve `(1, H, W, 3)` from the artifact, filling dynamic H/W with
/// `fallback`.
fn declared_shape(dims: &[Option<u32>], fallback: Option<u32>) -> std::result::Result<InputShape, String> {
    if dims.len() != 4 {
        return Err(format!("expected a rank-4 NHWC input, found rank {}", dims.len()));
    }
    let fill = |dim: Option<u32>, axis: &str| {
        dim.or(fallback)
            .map(|d| d as usize)
            .ok_or_else(|| format!("input {axis} is dynamic; set input_size in the config"))
    };
    let height = fill(dims[1], "height")?;
    let width = fill(dims[2], "width")?;
    let channels = dims[3].map(|c| c as usize).unwrap_or(3);
    Ok(InputShape::new(height, width, channels))
}

fn load_error(path: &Path, reason: impl ToString) -> Error {
    Error::ModelLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
