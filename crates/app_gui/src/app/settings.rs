//! Settings panel: configuration overview and score normalization.

use super::{Panel, UiApp};
use cactus_core::{ModelKind, Normalization};
use eframe::egui;

impl UiApp {
    /// Renders the settings screen including the normalization switch.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);
        ui.label(format!("Configuration file: {}", self.config_path.display()));

        ui.add_space(12.0);
        egui::Grid::new("model-paths").num_columns(2).show(ui, |ui| {
            for kind in ModelKind::ALL {
                let model = self.config.model(kind);
                ui.label(kind.as_str());
                let size = model
                    .input_size
                    .map(|s| format!(" (dynamic size fallback {s})"))
                    .unwrap_or_default();
                ui.label(format!("{}{size}", model.path.display()));
                ui.end_row();
            }
            ui.label("Labels");
            match &self.config.labels_path {
                Some(path) => ui.label(path.display().to_string()),
                None => ui.label(self.config.labels.join(", ")),
            };
            ui.end_row();
            ui.label("Resize filter");
            ui.label(format!("{:?}", self.config.resize_filter));
            ui.end_row();
            ui.label("Inference timeout");
            match self.config.inference_timeout() {
                Some(t) => ui.label(format!("{} ms", t.as_millis())),
                None => ui.label("disabled"),
            };
            ui.end_row();
        });

        ui.add_space(12.0);
        ui.separator();
        ui.add_space(6.0);

        let Ok(pipeline) = &mut self.pipeline else {
            ui.colored_label(
                egui::Color32::RED,
                "Models are not loaded; fix the configuration and restart.",
            );
            return;
        };

        let mut selected = pipeline.normalization();
        let option_label = |n: Normalization| match n {
            Normalization::L1 => "Sum to one (L1)",
            Normalization::Softmax => "Softmax (logit outputs)",
        };
        let mut apply = false;
        ui.horizontal(|ui| {
            ui.label("Score normalization");
            egui::ComboBox::from_id_salt("normalization-select")
                .selected_text(option_label(selected))
                .show_ui(ui, |ui| {
                    ui.selectable_value(
                        &mut selected,
                        Normalization::L1,
                        option_label(Normalization::L1),
                    );
                    ui.selectable_value(
                        &mut selected,
                        Normalization::Softmax,
                        option_label(Normalization::Softmax),
                    );
                });
            apply = ui
                .add_enabled(self.selected.is_some(), egui::Button::new("Recompute"))
                .clicked();
        });
        ui.label(
            "L1 expects non-negative, probability-like outputs. \
             Use softmax when a model emits raw logits.",
        );

        let ctx = ui.ctx().clone();
        if selected != pipeline.normalization() {
            self.change_normalization(&ctx, selected);
        } else if apply && let Some(path) = self.selected.clone() {
            self.classify_file(&ctx, &path);
            self.panel = Panel::Classify;
        }
    }

    /// Switch the normalization and redo the shown photo so the displayed
    /// distribution always matches the active mode.
    fn change_normalization(&mut self, ctx: &egui::Context, mode: Normalization) {
        let Ok(pipeline) = &mut self.pipeline else { return };
        pipeline.set_normalization(mode);
        self.config.normalization = mode;
        tracing::info!(?mode, "score normalization changed");
        self.report = None;
        self.preview = None;
        if let Some(path) = self.selected.clone() {
            self.classify_file(ctx, &path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cactus_core::ndarray::ArrayView4;
    use cactus_core::{AppConfig, InferenceBackend, InputShape, ModelRegistry, Pipeline, default_labels};
    use std::path::PathBuf;

    struct Fixed(Vec<f32>);

    impl InferenceBackend for Fixed {
        fn input_shape(&self) -> InputShape {
            InputShape::new(16, 16, 3)
        }

        fn forward(&mut self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
            Ok(self.0.clone())
        }
    }

    fn app() -> UiApp {
        let registry = ModelRegistry::from_backends(
            default_labels(),
            Box::new(Fixed(vec![2.0, 1.0, 1.0])),
            Box::new(Fixed(vec![1.0, 1.0, 2.0])),
        )
        .unwrap();
        UiApp::new(AppConfig::default(), PathBuf::from("cactus.toml"), Ok(Pipeline::new(registry)), None)
    }

    #[test]
    fn switching_normalization_recomputes_shown_report() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("kaktus.png");
        image::RgbImage::new(20, 10).save(&photo).unwrap();

        let ctx = egui::Context::default();
        let mut app = app();
        app.classify_file(&ctx, &photo);
        let l1 = app.report.as_ref().unwrap().cnn.confidence;
        assert!((l1 - 0.5).abs() < 1e-6);

        app.change_normalization(&ctx, Normalization::Softmax);
        let report = app.report.as_ref().unwrap();
        let e = std::f32::consts::E;
        let expected = e * e / (e * e + 2.0 * e);
        assert!((report.cnn.confidence - expected).abs() < 1e-5);
        assert_eq!(app.config.normalization, Normalization::Softmax);
        assert!(app.preview.is_some());
    }

    #[test]
    fn switching_normalization_without_photo_shows_nothing() {
        let ctx = egui::Context::default();
        let mut app = app();
        app.change_normalization(&ctx, Normalization::Softmax);
        assert!(app.report.is_none());
        assert_eq!(app.config.normalization, Normalization::Softmax);
    }
}
