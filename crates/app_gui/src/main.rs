mod app;

use anyhow::{Context, Result};
use app::UiApp;
use cactus_core::{AppConfig, ModelRegistry, Pipeline};
use eframe::NativeOptions;
use std::path::PathBuf;

const CONFIG_FILE: &str = "cactus.toml";

fn main() {
    tracing_subscriber::fmt::init();

    let config_path = config_path();
    let (config, config_error) = match AppConfig::load_or_default(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            tracing::warn!("config {} unusable: {e}", config_path.display());
            (AppConfig::default(), Some(format!("Config error: {e}")))
        }
    };
    let pipeline = match load_pipeline(&config) {
        Ok(p) => Ok(p),
        Err(e) => {
            tracing::error!("models not loaded: {e:#}");
            Err(format!("{e:#}"))
        }
    };

    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "Cactus Compare",
        options,
        Box::new(move |_cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new(
                config,
                config_path,
                pipeline,
                config_error,
            )))
        }),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}

/// `CACTUS_CONFIG`, then `./cactus.toml`, then the per-user config dir.
fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("CACTUS_CONFIG") {
        return PathBuf::from(path);
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    directories_next::ProjectDirs::from("id", "cactus", "CactusCompare")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .unwrap_or(local)
}

fn load_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let registry = ModelRegistry::load(config).context("loading classifier models")?;
    Ok(Pipeline::from_config(registry, config))
}
