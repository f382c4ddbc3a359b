use std::time::Duration;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::DashboardConfig;
use crate::coordinator::{ViewCoordinator, ViewData, ViewOutput};
use crate::state::{AppState, Event, LoadPhase};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyDashApp {
    pub state: AppState,
}

impl RustyDashApp {
    pub fn new(config: DashboardConfig) -> Self {
        let dataset = config.dataset.clone();
        let mut state = AppState::new(config);
        if let Some(path) = dataset {
            state.start_load(path);
        }
        Self { state }
    }
}

impl eframe::App for RustyDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.poll_load() {
            ctx.request_repaint();
        }
        if matches!(self.state.phase, LoadPhase::Loading { .. }) {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        // Gestures are collected while drawing and applied afterwards.
        let mut events: Vec<Event> = Vec::new();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters and view controls ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.state, &mut events);
            });

        // ---- Central panel: linked views ----
        egui::CentralPanel::default().show(ctx, |ui| match &self.state.phase {
            LoadPhase::Uninitialized => {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Open a file to explore vehicles  (File → Open…)");
                });
            }
            LoadPhase::Loading { path, .. } => {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.label(format!("Loading {}…", path.display()));
                });
            }
            LoadPhase::LoadFailed { title, message } => {
                ui.vertical_centered(|ui: &mut Ui| {
                    ui.add_space(40.0);
                    ui.heading(RichText::new(title).color(Color32::RED));
                    ui.label(message);
                    ui.add_space(8.0);
                    ui.weak("Use File → Open… to try another file.");
                });
            }
            LoadPhase::Ready(coordinator) => {
                dashboard(ui, coordinator, &mut self.state.brush_origins, &mut events);
            }
        });

        if !events.is_empty() {
            for event in events {
                self.state.dispatch(event);
            }
            ctx.request_repaint();
        }
    }
}

/// Charts two per row, tables full width underneath.
fn dashboard(
    ui: &mut Ui,
    coordinator: &ViewCoordinator,
    brushes: &mut [Option<[f64; 2]>],
    events: &mut Vec<Event>,
) {
    let snapshot = coordinator.snapshot();
    let dataset = coordinator.dataset();
    let (tables, charts): (Vec<&ViewOutput>, Vec<&ViewOutput>) = snapshot
        .views
        .iter()
        .partition(|v| matches!(v.data, ViewData::Table(_)));

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for pair in charts.chunks(2) {
                ui.columns(2, |columns| {
                    for (column, output) in columns.iter_mut().zip(pair) {
                        let mut spare = None;
                        let brush = brushes.get_mut(output.index).unwrap_or(&mut spare);
                        events.extend(plot::show_view(column, dataset, snapshot, output, brush));
                    }
                });
                ui.add_space(8.0);
            }

            for output in tables {
                ui.separator();
                let mut brush = None;
                events.extend(plot::show_view(ui, dataset, snapshot, output, &mut brush));
            }
        });
}
