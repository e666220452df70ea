//! Main window: panel switcher, photo upload and report actions.

mod results;
mod settings;

use cactus_core::{AppConfig, ImageSample, Pipeline, Report, export_csv, save_pdf};
use eframe::{App, Frame, egui};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

/// Longest side of the preview texture in pixels.
const PREVIEW_SIDE: u32 = 640;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Classify,
    Settings,
    About,
}

pub(crate) struct UiApp {
    config: AppConfig,
    config_path: PathBuf,
    pipeline: Result<Pipeline, String>,
    panel: Panel,
    selected: Option<PathBuf>,
    report: Option<Report>,
    preview: Option<egui::TextureHandle>,
    status: String,
}

impl UiApp {
    pub(crate) fn new(
        config: AppConfig,
        config_path: PathBuf,
        pipeline: Result<Pipeline, String>,
        config_error: Option<String>,
    ) -> Self {
        let status = match (&pipeline, config_error) {
            (Err(e), _) => format!("Models not loaded: {e}"),
            (Ok(_), Some(e)) => e,
            (Ok(_), None) => String::new(),
        };
        Self {
            config,
            config_path,
            pipeline,
            panel: Panel::Classify,
            selected: None,
            report: None,
            preview: None,
            status,
        }
    }

    fn classify_file(&mut self, ctx: &egui::Context, path: &Path) {
        self.selected = Some(path.to_path_buf());
        // never leave a previous result on screen next to a new photo
        self.report = None;
        self.preview = None;

        let Ok(pipeline) = &self.pipeline else {
            self.status = "Models are not loaded; see Settings.".to_string();
            return;
        };
        let outcome = std::fs::read(path)
            .map_err(cactus_core::Error::from)
            .and_then(|bytes| pipeline.classify_bytes(&bytes));
        match outcome {
            Ok(report) => {
                self.preview = Some(load_preview(ctx, &report));
                self.status = report.conclusion();
                self.report = Some(report);
            }
            Err(e) => {
                tracing::warn!("classification failed for {}: {e}", path.display());
                self.status = format!("Classification failed: {e}");
            }
        }
    }

    fn save_pdf_dialog(&mut self) {
        let Some(report) = &self.report else { return };
        if let Some(path) = FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name(export_file_name(self.selected.as_deref(), "pdf"))
            .save_file()
        {
            self.status = match save_pdf(report, &path) {
                Ok(()) => format!("PDF saved: {}", path.display()),
                Err(e) => format!("Saving PDF failed: {e}"),
            };
        }
    }

    fn export_csv_dialog(&mut self) {
        let Some(report) = &self.report else { return };
        if let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name(export_file_name(self.selected.as_deref(), "csv"))
            .save_file()
        {
            self.status = match export_csv(report, &path) {
                Ok(()) => format!("CSV exported: {}", path.display()),
                Err(e) => format!("Exporting CSV failed: {e}"),
            };
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.panel, Panel::Classify, "Classify");
            ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
            ui.selectable_value(&mut self.panel, Panel::About, "About");
            ui.separator();

            let ready = self.pipeline.is_ok();
            if ui
                .add_enabled(ready, egui::Button::new("Choose photo..."))
                .clicked()
                && let Some(path) = FileDialog::new()
                    .add_filter("Images", &["jpg", "jpeg", "png"])
                    .set_directory(".")
                    .pick_file()
            {
                self.panel = Panel::Classify;
                self.classify_file(ctx, &path);
            }

            let has_report = self.report.is_some();
            if ui
                .add_enabled(has_report, egui::Button::new("Save PDF"))
                .clicked()
            {
                self.save_pdf_dialog();
            }
            if ui
                .add_enabled(has_report, egui::Button::new("Export CSV"))
                .clicked()
            {
                self.export_csv_dialog();
            }
            if ui
                .add_enabled(has_report, egui::Button::new("Copy summary"))
                .clicked()
                && let Some(report) = &self.report
            {
                ctx.copy_text(results::summary_text(report));
                self.status = "Summary copied.".to_string();
            }
        });
        if !self.status.is_empty() {
            ui.label(&self.status);
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.render_top_bar(ctx, ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| match self.panel {
                    Panel::Classify => self.render_classify_panel(ui),
                    Panel::Settings => self.render_settings_panel(ui),
                    Panel::About => self.render_about_panel(ui),
                });
        });
    }
}

fn load_preview(ctx: &egui::Context, report: &Report) -> egui::TextureHandle {
    let color = preview_image(&report.source);
    ctx.load_texture("upload-preview", color, egui::TextureOptions::LINEAR)
}

/// Downscaled copy of the upload, small enough for any GPU texture limit.
fn preview_image(source: &ImageSample) -> egui::ColorImage {
    let thumb = source.thumbnail(PREVIEW_SIDE);
    let size = [thumb.width() as usize, thumb.height() as usize];
    egui::ColorImage::from_rgb(size, thumb.as_raw())
}

/// `<photo stem>_report_<timestamp>.<ext>`
fn export_file_name(source: Option<&Path>, ext: &str) -> String {
    let stem = source
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cactus".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{stem}_report_{stamp}.{ext}")
}
