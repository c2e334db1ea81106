//! Frequency Meter - Main Entry Point
//!
//! Reads frequency measurements from a serial-connected counter and shows
//! them with unit autoranging, optional filtering and a live graph.

use anyhow::{bail, Context};
use freqmeter_rs::{config::AppConfig, frontend::FreqMeterApp};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parse `--config <path>` from the command line
fn config_path_arg() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config requires a path")?;
                path = Some(PathBuf::from(value));
            }
            other => {
                if let Some(value) = other.strip_prefix("--config=") {
                    path = Some(PathBuf::from(value));
                } else {
                    bail!("unknown argument: {other}");
                }
            }
        }
    }
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,freqmeter_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Frequency Meter");

    let config_path = config_path_arg()?;
    if let Some(ref path) = config_path {
        if !path.exists() {
            tracing::warn!("Config file {:?} not found, using defaults", path);
        }
    }
    let config = AppConfig::load_or_default(config_path.as_deref());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([560.0, 360.0])
            .with_title("Frequency Meter"),
        ..Default::default()
    };

    eframe::run_native(
        "Frequency Meter",
        native_options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();
            style.visuals.window_shadow.offset = [0, 0];
            cc.egui_ctx.set_style(style);

            Ok(Box::new(FreqMeterApp::new(cc, config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {e}"))?;

    tracing::info!("Shutting down...");
    Ok(())
}
