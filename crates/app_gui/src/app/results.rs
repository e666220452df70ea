//! Classification results and model information panels.

use super::UiApp;
use cactus_core::{ModelKind, Prediction, Report, format_confidence};
use eframe::egui;

const PREVIEW_MAX: f32 = 320.0;
const BEST_COLOR: egui::Color32 = egui::Color32::from_rgb(46, 139, 87);

impl UiApp {
    /// Photo preview, per-model distributions and the verdict.
    pub(super) fn render_classify_panel(&mut self, ui: &mut egui::Ui) {
        let Some(report) = &self.report else {
            ui.heading("Cactus Classifier");
            ui.label("Choose a photo of a cactus to compare the CNN and MobileNetV2 predictions.");
            return;
        };

        ui.heading(&report.title);
        ui.add_space(6.0);
        if let Some(tex) = &self.preview {
            ui.add(egui::Image::new(tex).max_size(egui::vec2(PREVIEW_MAX, PREVIEW_MAX)));
        }
        if let Some(path) = &self.selected {
            ui.small(path.display().to_string());
        }

        ui.add_space(10.0);
        egui::Grid::new("comparison")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                ui.strong("Model");
                ui.strong("Species");
                ui.strong("Confidence");
                ui.end_row();
                for (kind, prediction) in report.rows() {
                    let name = egui::RichText::new(kind.as_str());
                    if kind == report.best_model {
                        ui.label(name.strong().color(BEST_COLOR));
                    } else {
                        ui.label(name);
                    }
                    ui.label(&prediction.predicted_label);
                    ui.label(format_confidence(prediction.confidence));
                    ui.end_row();
                }
            });

        ui.add_space(10.0);
        for (kind, prediction) in report.rows() {
            render_distribution(ui, kind, prediction, &report.labels);
            ui.add_space(6.0);
        }

        ui.separator();
        ui.label(
            egui::RichText::new(report.conclusion())
                .strong()
                .color(BEST_COLOR),
        );
        ui.label(agreement_text(report));
    }

    pub(super) fn render_about_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("About");
        ui.label(format!("Cactus Compare {}", env!("CACTUS_VERSION")));
        ui.add_space(8.0);
        match &self.pipeline {
            Ok(pipeline) => {
                let registry = pipeline.registry();
                for kind in ModelKind::ALL {
                    let shape = registry.handle(kind).input_shape();
                    ui.label(format!(
                        "{kind}: input {} x {} x {}",
                        shape.height, shape.width, shape.channels
                    ));
                }
                ui.add_space(6.0);
                ui.label("Classes:");
                for (i, label) in registry.labels().iter().enumerate() {
                    ui.label(format!("  {}. {label}", i + 1));
                }
            }
            Err(e) => {
                ui.colored_label(egui::Color32::RED, format!("Models not loaded: {e}"));
            }
        }
    }
}

/// Horizontal bar per class; the predicted class is highlighted.
fn render_distribution(ui: &mut egui::Ui, kind: ModelKind, prediction: &Prediction, labels: &[String]) {
    ui.strong(format!("{kind} probability distribution"));
    for (idx, (label, prob)) in labels.iter().zip(&prediction.probability_distribution).enumerate() {
        ui.horizontal(|ui| {
            ui.add_sized([160.0, 18.0], egui::Label::new(label.as_str()));
            let mut bar = egui::ProgressBar::new(*prob)
                .desired_width(260.0)
                .text(format_confidence(*prob));
            if idx == prediction.class_index {
                bar = bar.fill(BEST_COLOR);
            }
            ui.add(bar);
        });
    }
}

fn agreement_text(report: &Report) -> &'static str {
    if report.models_agree() {
        "Both models predict the same species."
    } else {
        "The models disagree on the species."
    }
}

/// Plain-text summary for the clipboard.
pub(super) fn summary_text(report: &Report) -> String {
    let mut out = format!("{}\n", report.title);
    for (kind, prediction) in report.rows() {
        out.push_str(&format!(
            "{kind}: {} ({})\n",
            prediction.predicted_label,
            format_confidence(prediction.confidence)
        ));
    }
    out.push_str(&report.conclusion());
    out.push('\n');
    out.push_str(agreement_text(report));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cactus_core::{ImageSample, ScoreVector, assemble, compare, default_labels};

    #[test]
    fn summary_lists_both_models_and_verdict() {
        let result = compare(
            &ScoreVector(vec![0.1, 0.7, 0.2]),
            &ScoreVector(vec![0.2, 0.3, 0.5]),
            &default_labels(),
        )
        .unwrap();
        let img = ImageSample::from_rgb(image::RgbImage::new(4, 4));
        let text = summary_text(&assemble(result, &img));
        assert!(text.contains("CNN: Ferocactus (70.00%)"));
        assert!(text.contains("MobileNetV2: Gymnocalycium (50.00%)"));
        assert!(text.contains("Best model: CNN"));
        assert!(text.ends_with("The models disagree on the species."));
    }
}
