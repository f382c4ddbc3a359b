mod app;
mod color;
mod config;
mod coordinator;
mod data;
mod error;
mod state;
mod ui;

use std::path::PathBuf;

use app::RustyDashApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let mut config = DashboardConfig::discover();
    // A path on the command line wins over the configured dataset.
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        config.dataset = Some(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Dash – Vehicle Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyDashApp::new(config)))),
    )
}
