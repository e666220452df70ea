use crate::classifier::ClassifierHandle;
use crate::error::{Error, Result};
use crate::preprocess::InputTensor;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Raw per-class output of one forward pass, in label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector(pub Vec<f32>);

impl ScoreVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for ScoreVector {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores)
    }
}

/// Run `handle` on `tensor`, blocking until the engine returns.
pub fn run(tensor: &InputTensor, handle: &ClassifierHandle) -> Result<ScoreVector> {
    let expected = handle.input_shape().tensor_dims();
    if tensor.shape() != expected.as_slice() {
        return Err(Error::ShapeMismatch {
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }

    let start = Instant::now();
    let outcome = {
        let mut backend = handle.lock_backend();
        panic::catch_unwind(AssertUnwindSafe(|| backend.forward(tensor.view())))
    };
    let scores = match outcome {
        Ok(Ok(scores)) => scores,
        Ok(Err(reason)) => {
            return Err(Error::InferenceExecutionError {
                model: handle.kind().to_string(),
                reason,
            });
        }
        Err(_) => {
            tracing::error!(model = %handle.kind(), "inference engine panicked");
            return Err(Error::InferenceExecutionError {
                model: handle.kind().to_string(),
                reason: "engine panicked".into(),
            });
        }
    };

    if scores.len() != handle.labels().len() {
        return Err(Error::InferenceExecutionError {
            model: handle.kind().to_string(),
            reason: format!(
                "model produced {} scores for {} labels",
                scores.len(),
                handle.labels().len()
            ),
        });
    }
    tracing::debug!(model = %handle.kind(), ?scores, elapsed = ?start.elapsed(), "inference done");
    Ok(ScoreVector(scores))
}

/// Like [`run`], but gives up after `timeout`.
///
/// The forward pass runs on a worker thread. On timeout the worker is left
/// to finish in the background and its result is dropped; it keeps the
/// handle locked until then.
pub fn run_with_timeout(
    tensor: InputTensor,
    handle: &Arc<ClassifierHandle>,
    timeout: Duration,
) -> Result<ScoreVector> {
    let (tx, rx) = mpsc::channel();
    let worker_handle = Arc::clone(handle);
    thread::Builder::new()
        .name(format!("infer-{}", handle.kind()))
        .spawn(move || {
            let _ = tx.send(run(&tensor, &worker_handle));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(model = %handle.kind(), ?timeout, "inference timed out");
            Err(Error::InferenceTimeout {
                model: handle.kind().to_string(),
                timeout_ms: timeout.as_millis(),
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::InferenceExecutionError {
            model: handle.kind().to_string(),
            reason: "inference worker panicked".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InferenceBackend, InputShape, ModelKind, default_labels};
    use ndarray::{Array4, ArrayView4};

    struct Scripted {
        shape: InputShape,
        output: std::result::Result<Vec<f32>, String>,
        delay: Duration,
    }

    impl InferenceBackend for Scripted {
        fn input_shape(&self) -> InputShape {
            self.shape
        }

        fn forward(&mut self, _input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String> {
            thread::sleep(self.delay);
            self.output.clone()
        }
    }

    fn handle(output: std::result::Result<Vec<f32>, String>, delay: Duration) -> Arc<ClassifierHandle> {
        let backend = Scripted {
            shape: InputShape::new(224, 224, 3),
            output,
            delay,
        };
        Arc::new(ClassifierHandle::new(ModelKind::MobileNetV2, default_labels(), Box::new(backend)).unwrap())
    }

    fn tensor(side: usize) -> InputTensor {
        InputTensor::from_array(Array4::zeros((1, side, side, 3))).unwrap()
    }

    #[test]
    fn returns_raw_scores() {
        let h = handle(Ok(vec![0.2, 0.3, 0.5]), Duration::ZERO);
        let scores = run(&tensor(224), &h).unwrap();
        assert_eq!(scores.as_slice(), &[0.2, 0.3, 0.5]);
    }

    #[test]
    fn wrong_spatial_size_is_shape_mismatch() {
        let h = handle(Ok(vec![0.2, 0.3, 0.5]), Duration::ZERO);
        match run(&tensor(150), &h) {
            Err(Error::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![1, 224, 224, 3]);
                assert_eq!(actual, vec![1, 150, 150, 3]);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn engine_fault_is_execution_error() {
        let h = handle(Err("kernel exploded".into()), Duration::ZERO);
        let err = run(&tensor(224), &h).unwrap_err();
        assert!(matches!(err, Error::InferenceExecutionError { .. }));
    }

    struct PanicsOnce {
        panicked: bool,
    }

    impl InferenceBackend for PanicsOnce {
        fn input_shape(&self) -> InputShape {
            InputShape::new(8, 8, 3)
        }

        fn forward(&mut self, _input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String> {
            if !self.panicked {
                self.panicked = true;
                panic!("engine crashed");
            }
            Ok(vec![0.1, 0.1, 0.8])
        }
    }

    #[test]
    fn engine_panic_fails_only_its_own_request() {
        let h = Arc::new(
            ClassifierHandle::new(
                ModelKind::Cnn,
                default_labels(),
                Box::new(PanicsOnce { panicked: false }),
            )
            .unwrap(),
        );
        match run(&tensor(8), &h) {
            Err(Error::InferenceExecutionError { model, reason }) => {
                assert_eq!(model, "CNN");
                assert_eq!(reason, "engine panicked");
            }
            other => panic!("expected InferenceExecutionError, got {other:?}"),
        }

        let scores = run(&tensor(8), &h).unwrap();
        assert_eq!(scores.as_slice(), &[0.1, 0.1, 0.8]);
    }

    #[test]
    fn wrong_output_length_is_execution_error() {
        let h = handle(Ok(vec![1.0, 0.0]), Duration::ZERO);
        let err = run(&tensor(224), &h).unwrap_err();
        assert!(matches!(err, Error::InferenceExecutionError { .. }));
    }

    #[test]
    fn slow_engine_times_out() {
        let h = handle(Ok(vec![0.2, 0.3, 0.5]), Duration::from_millis(500));
        let err = run_with_timeout(tensor(224), &h, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, Error::InferenceTimeout { .. }));
    }

    #[test]
    fn fast_engine_beats_timeout() {
        let h = handle(Ok(vec![0.2, 0.3, 0.5]), Duration::ZERO);
        let scores = run_with_timeout(tensor(224), &h, Duration::from_secs(5)).unwrap();
        assert_eq!(scores.len(), 3);
    }
}
