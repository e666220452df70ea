use crate::classifier::{ClassifierHandle, InferenceBackend, ModelKind};
use crate::error::{Error, Result};
use std::sync::Arc;

/// The two classifiers, loaded once and shared by every request.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    cnn: Arc<ClassifierHandle>,
    mobilenet: Arc<ClassifierHandle>,
}

impl ModelRegistry {
    /// Pair two handles. Both must be of the expected kind and agree on
    /// the label order.
    pub fn new(cnn: ClassifierHandle, mobilenet: ClassifierHandle) -> Result<Self> {
        for (handle, kind) in [(&cnn, ModelKind::Cnn), (&mobilenet, ModelKind::MobileNetV2)] {
            if handle.kind() != kind {
                return Err(Error::Config(format!(
                    "expected a {kind} handle, got {}",
                    handle.kind()
                )));
            }
        }
        if cnn.labels() != mobilenet.labels() {
            return Err(Error::Config(
                "CNN and MobileNetV2 were given different label sets".into(),
            ));
        }
        Ok(Self {
            cnn: Arc::new(cnn),
            mobilenet: Arc::new(mobilenet),
        })
    }

    /// Build both handles from caller-supplied engines.
    pub fn from_backends(
        labels: Vec<String>,
        cnn: Box<dyn InferenceBackend>,
        mobilenet: Box<dyn InferenceBackend>,
    ) -> Result<Self> {
        Self::new(
            ClassifierHandle::new(ModelKind::Cnn, labels.clone(), cnn)?,
            ClassifierHandle::new(ModelKind::MobileNetV2, labels, mobilenet)?,
        )
    }

    /// Load both ONNX artifacts named in `cfg`.
    #[cfg(feature = "ort")]
    pub fn load(cfg: &crate::config::AppConfig) -> Result<Self> {
        use crate::ort_backend::OrtBackend;

        let labels = cfg.resolve_labels()?;
        let cnn = OrtBackend::load(cfg.model(ModelKind::Cnn))?;
        let mobilenet = OrtBackend::load(cfg.model(ModelKind::MobileNetV2))?;
        let registry = Self::from_backends(labels, Box::new(cnn), Box::new(mobilenet))?;
        tracing::info!(
            cnn = ?registry.cnn.input_shape(),
            mobilenet = ?registry.mobilenet.input_shape(),
            "model registry ready"
        );
        Ok(registry)
    }

    pub fn handle(&self, kind: ModelKind) -> &Arc<ClassifierHandle> {
        match kind {
            ModelKind::Cnn => &self.cnn,
            ModelKind::MobileNetV2 => &self.mobilenet,
        }
    }

    pub fn labels(&self) -> &[String] {
        self.cnn.labels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InputShape, default_labels};
    use ndarray::ArrayView4;

    struct Stub;

    impl InferenceBackend for Stub {
        fn input_shape(&self) -> InputShape {
            InputShape::new(32, 32, 3)
        }

        fn forward(&mut self, _input: ArrayView4<'_, f32>) -> std::result::Result<Vec<f32>, String> {
            Ok(vec![0.3, 0.3, 0.4])
        }
    }

    #[test]
    fn from_backends_pairs_both_kinds() {
        let registry = ModelRegistry::from_backends(default_labels(), Box::new(Stub), Box::new(Stub)).unwrap();
        assert_eq!(registry.handle(ModelKind::Cnn).kind(), ModelKind::Cnn);
        assert_eq!(registry.handle(ModelKind::MobileNetV2).kind(), ModelKind::MobileNetV2);
        assert_eq!(registry.labels(), default_labels().as_slice());
    }

    #[test]
    fn swapped_handles_are_rejected() {
        let a = ClassifierHandle::new(ModelKind::MobileNetV2, default_labels(), Box::new(Stub)).unwrap();
        let b = ClassifierHandle::new(ModelKind::Cnn, default_labels(), Box::new(Stub)).unwrap();
        assert!(matches!(ModelRegistry::new(a, b), Err(Error::Config(_))));
    }

    #[test]
    fn label_sets_must_match() {
        let mut other = default_labels();
        other.swap(0, 1);
        let cnn = ClassifierHandle::new(ModelKind::Cnn, default_labels(), Box::new(Stub)).unwrap();
        let mn = ClassifierHandle::new(ModelKind::MobileNetV2, other, Box::new(Stub)).unwrap();
        assert!(matches!(ModelRegistry::new(cnn, mn), Err(Error::Config(_))));
    }
}
