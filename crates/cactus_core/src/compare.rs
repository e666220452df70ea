use crate::classifier::ModelKind;
use crate::error::{Error, Result};
use crate::inference::ScoreVector;
use serde::{Deserialize, Serialize};

/// How raw scores become a probability distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// `p[i] = v[i] / sum(v)`; requires non-negative scores.
    #[default]
    L1,
    /// For artifacts that emit logits.
    Softmax,
}

/// One model's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_label: String,
    pub class_index: usize,
    /// Maximum of `probability_distribution`, in `[0, 1]`.
    pub confidence: f32,
    pub probability_distribution: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Class names both distributions are indexed by.
    pub labels: Vec<String>,
    pub prediction_cnn: Prediction,
    pub prediction_mobilenet: Prediction,
    pub best_model: ModelKind,
}

impl ComparisonResult {
    pub fn prediction(&self, kind: ModelKind) -> &Prediction {
        match kind {
            ModelKind::Cnn => &self.prediction_cnn,
            ModelKind::MobileNetV2 => &self.prediction_mobilenet,
        }
    }

    pub fn best_prediction(&self) -> &Prediction {
        self.prediction(self.best_model)
    }

    /// Whether both models chose the same class.
    pub fn models_agree(&self) -> bool {
        self.prediction_cnn.class_index == self.prediction_mobilenet.class_index
    }
}

/// Compare both models' raw outputs using L1 normalization.
pub fn compare(
    raw_cnn: &ScoreVector,
    raw_mobilenet: &ScoreVector,
    labels: &[String],
) -> Result<ComparisonResult> {
    compare_with(raw_cnn, raw_mobilenet, labels, Normalization::L1)
}

pub fn compare_with(
    raw_cnn: &ScoreVector,
    raw_mobilenet: &ScoreVector,
    labels: &[String],
    mode: Normalization,
) -> Result<ComparisonResult> {
    let prediction_cnn = predict(raw_cnn, labels, mode)?;
    let prediction_mobilenet = predict(raw_mobilenet, labels, mode)?;
    // strict: an exact tie keeps CNN
    let best_model = if prediction_mobilenet.confidence > prediction_cnn.confidence {
        ModelKind::MobileNetV2
    } else {
        ModelKind::Cnn
    };
    Ok(ComparisonResult {
        labels: labels.to_vec(),
        prediction_cnn,
        prediction_mobilenet,
        best_model,
    })
}

/// Normalize `raw` and pick the most probable label.
pub fn predict(raw: &ScoreVector, labels: &[String], mode: Normalization) -> Result<Prediction> {
    if raw.len() != labels.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![labels.len()],
            actual: vec![raw.len()],
        });
    }
    let probability_distribution = normalize(raw, mode)?;
    let (class_index, confidence) = argmax(&probability_distribution)
        .ok_or_else(|| Error::DegenerateScoreVector("empty score vector".into()))?;
    Ok(Prediction {
        predicted_label: labels[class_index].clone(),
        class_index,
        confidence,
        probability_distribution,
    })
}

pub fn normalize(raw: &ScoreVector, mode: Normalization) -> Result<Vec<f32>> {
    let scores = raw.as_slice();
    if scores.is_empty() {
        return Err(Error::DegenerateScoreVector("empty score vector".into()));
    }
    if let Some(bad) = scores.iter().find(|v| !v.is_finite()) {
        return Err(Error::DegenerateScoreVector(format!("non-finite score {bad}")));
    }
    match mode {
        Normalization::L1 => {
            if let Some(neg) = scores.iter().find(|v| **v < 0.0) {
                return Err(Error::DegenerateScoreVector(format!(
                    "negative score {neg} cannot be L1-normalized; configure softmax for logit outputs"
                )));
            }
            let sum: f32 = scores.iter().sum();
            if sum == 0.0 {
                return Err(Error::DegenerateScoreVector("scores sum to zero".into()));
            }
            if !sum.is_finite() {
                return Err(Error::DegenerateScoreVector(format!(
                    "score sum overflows f32: {sum}"
                )));
            }
            Ok(scores.iter().map(|v| v / sum).collect())
        }
        Normalization::Softmax => Ok(softmax(scores)),
    }
}

/// Index and value of the largest element; the first one wins ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|x| x / sum).collect()
}
