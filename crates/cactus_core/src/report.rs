use crate::classifier::ModelKind;
use crate::compare::{ComparisonResult, Prediction};
use crate::error::{Error, Result};
use crate::sample::ImageSample;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_TITLE: &str = "Cactus Classification Report";

/// Everything a renderer needs to present one classification.
///
/// Screen, PDF, CSV and JSON output all read from this; none of them
/// recompute predictions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    #[serde(skip)]
    pub source: ImageSample,
    pub image_width: u32,
    pub image_height: u32,
    pub labels: Vec<String>,
    pub cnn: Prediction,
    pub mobilenet: Prediction,
    pub best_model: ModelKind,
}

impl Report {
    pub fn prediction(&self, kind: ModelKind) -> &Prediction {
        match kind {
            ModelKind::Cnn => &self.cnn,
            ModelKind::MobileNetV2 => &self.mobilenet,
        }
    }

    /// Both predictions in display order.
    pub fn rows(&self) -> [(ModelKind, &Prediction); 2] {
        [(ModelKind::Cnn, &self.cnn), (ModelKind::MobileNetV2, &self.mobilenet)]
    }

    pub fn best_prediction(&self) -> &Prediction {
        self.prediction(self.best_model)
    }

    pub fn models_agree(&self) -> bool {
        self.cnn.class_index == self.mobilenet.class_index
    }

    /// One-line verdict shown under the comparison.
    pub fn conclusion(&self) -> String {
        let best = self.best_prediction();
        format!(
            "Best model: {} ({} at {})",
            self.best_model,
            best.predicted_label,
            format_confidence(best.confidence)
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Export(e.to_string()))
    }
}

pub fn assemble(result: ComparisonResult, source_image: &ImageSample) -> Report {
    assemble_titled(result, source_image, DEFAULT_TITLE)
}

pub fn assemble_titled(
    result: ComparisonResult,
    source_image: &ImageSample,
    title: &str,
) -> Report {
    Report {
        title: title.to_string(),
        source: source_image.clone(),
        image_width: source_image.width(),
        image_height: source_image.height(),
        labels: result.labels,
        cnn: result.prediction_cnn,
        mobilenet: result.prediction_mobilenet,
        best_model: result.best_model,
    }
}

/// Confidence as a percentage with two decimals.
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Export the per-class distribution of both models to CSV with headers:
/// model,label,probability,predicted,best
pub fn export_csv(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
    wtr.write_record(["model", "label", "probability", "predicted", "best"])
        .map_err(csv_error)?;

    for (kind, prediction) in report.rows() {
        let best = kind == report.best_model;
        for (idx, (label, prob)) in report
            .labels
            .iter()
            .zip(&prediction.probability_distribution)
            .enumerate()
        {
            let predicted = idx == prediction.class_index;
            wtr.write_record([
                kind.as_str(),
                label.as_str(),
                format!("{prob}").as_str(),
                if predicted { "true" } else { "false" },
                if best { "true" } else { "false" },
            ])
            .map_err(csv_error)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

fn csv_error(err: csv::Error) -> Error {
    Error::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::default_labels;
    use crate::compare::compare;
    use crate::inference::ScoreVector;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn report() -> Report {
        let labels = default_labels();
        let result = compare(
            &ScoreVector(vec![0.1, 0.7, 0.2]),
            &ScoreVector(vec![0.2, 0.3, 0.5]),
            &labels,
        )
        .unwrap();
        let img = ImageSample::from_rgb(RgbImage::from_pixel(6, 4, Rgb([0, 128, 0])));
        assemble(result, &img)
    }

    #[test]
    fn assemble_keeps_both_predictions() {
        let r = report();
        assert_eq!(r.title, DEFAULT_TITLE);
        assert_eq!((r.image_width, r.image_height), (6, 4));
        assert_eq!(r.cnn.predicted_label, "Ferocactus");
        assert_eq!(r.mobilenet.predicted_label, "Gymnocalycium");
        assert_eq!(r.best_model, ModelKind::Cnn);
        assert!(!r.models_agree());
        assert_eq!(r.conclusion(), "Best model: CNN (Ferocactus at 70.00%)");
    }

    #[test]
    fn json_omits_pixels() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["best_model"], "CNN");
        assert_eq!(value["mobilenet"]["predicted_label"], "Gymnocalycium");
        assert!(value.get("source").is_none());
    }

    #[test]
    fn export_csv_writes_one_row_per_model_and_class() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.csv");
        export_csv(&report(), &path)?;

        let mut rdr = csv::Reader::from_path(&path).map_err(csv_error)?;
        let headers = rdr.headers().map_err(csv_error)?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["model", "label", "probability", "predicted", "best"]
        );

        let recs: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>().map_err(csv_error)?;
        assert_eq!(recs.len(), 6);
        assert_eq!(&recs[1][0], "CNN");
        assert_eq!(&recs[1][1], "Ferocactus");
        assert_eq!(&recs[1][3], "true");
        assert_eq!(&recs[1][4], "true");
        assert_eq!(&recs[5][0], "MobileNetV2");
        assert_eq!(&recs[5][1], "Gymnocalycium");
        assert_eq!(&recs[5][3], "true");
        assert_eq!(&recs[5][4], "false");
        Ok(())
    }
}
