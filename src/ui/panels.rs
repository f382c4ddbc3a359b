use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::coordinator::{ViewBinding, ViewCoordinator, ViewKind};
use crate::data::filter::FilterPredicate;
use crate::data::model::Value;
use crate::state::{AppState, Axis, Event, LoadPhase};

// ---------------------------------------------------------------------------
// Left side panel – filters and view controls
// ---------------------------------------------------------------------------

/// Render the left control panel. Controls are disabled until a dataset is ready.
pub fn side_panel(ui: &mut Ui, state: &AppState, events: &mut Vec<Event>) {
    ui.heading("Filters");
    ui.separator();

    let Some(coordinator) = state.coordinator() else {
        ui.label("No dataset loaded.");
        return;
    };

    let filter_columns = state.filter_columns();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Equality filters ----
            for col in &filter_columns {
                equality_filter(ui, coordinator, col, events);
            }

            // ---- Numeric range filters (collapsible) ----
            let numeric: Vec<&str> = coordinator.dataset().schema.numeric_columns().collect();
            if !numeric.is_empty() {
                ui.add_space(6.0);
                ui.strong("Ranges");
                for col in numeric {
                    range_filter(ui, coordinator, col, events);
                }
            }

            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                if ui
                    .add_enabled(
                        coordinator.state().filters.is_active(),
                        egui::Button::new("Reset filters"),
                    )
                    .clicked()
                {
                    events.push(Event::ResetFilters);
                }
                if ui
                    .add_enabled(
                        !coordinator.state().selection.is_empty(),
                        egui::Button::new("Clear selection"),
                    )
                    .clicked()
                {
                    events.push(Event::ClearSelection);
                }
            });

            ui.add_space(8.0);
            ui.heading("Views");
            ui.separator();
            for (index, binding) in coordinator.state().views.iter().enumerate() {
                view_controls(ui, coordinator, index, binding, events);
            }
        });
}

fn equality_filter(ui: &mut Ui, coordinator: &ViewCoordinator, col: &str, events: &mut Vec<Event>) {
    let Some(values) = coordinator.dataset().unique_values.get(col) else {
        return;
    };
    let current = coordinator.state().filters.predicate(col);
    let current_text = match current {
        FilterPredicate::Equals(v) => v.to_string(),
        _ => "All".to_string(),
    };

    ui.label(RichText::new(col).strong());
    egui::ComboBox::from_id_salt(("filter", col))
        .selected_text(current_text)
        .width(ui.available_width() - 8.0)
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(*current == FilterPredicate::All, "All")
                .clicked()
            {
                events.push(Event::SetPredicate {
                    column: col.to_string(),
                    predicate: FilterPredicate::All,
                });
            }
            for val in values.iter().filter(|v| !v.is_missing()) {
                let is_current = matches!(current, FilterPredicate::Equals(v) if v == val);
                if ui.selectable_label(is_current, val.to_string()).clicked() {
                    events.push(Event::SetPredicate {
                        column: col.to_string(),
                        predicate: FilterPredicate::Equals(val.clone()),
                    });
                }
            }
        });
}

fn range_filter(ui: &mut Ui, coordinator: &ViewCoordinator, col: &str, events: &mut Vec<Event>) {
    let Some((min, max)) = column_bounds(coordinator, col) else {
        return;
    };
    let current = coordinator.state().filters.predicate(col);
    let (mut lo, mut hi, mut enabled) = match current {
        FilterPredicate::Range { lo, hi } => (*lo, *hi, true),
        _ => (min, max, false),
    };

    egui::CollapsingHeader::new(col)
        .id_salt(("range", col))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let toggled = ui.checkbox(&mut enabled, "Limit range").changed();
            let speed = ((max - min) / 200.0).max(0.01);
            let edited = ui
                .add_enabled_ui(enabled, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        let a = ui.add(egui::DragValue::new(&mut lo).speed(speed).prefix("min "));
                        let b = ui.add(egui::DragValue::new(&mut hi).speed(speed).prefix("max "));
                        a.changed() || b.changed()
                    })
                    .inner
                })
                .inner;

            if toggled || (enabled && edited) {
                let predicate = if enabled {
                    FilterPredicate::range(lo, hi)
                } else {
                    FilterPredicate::All
                };
                events.push(Event::SetPredicate {
                    column: col.to_string(),
                    predicate,
                });
            }
        });
}

/// Smallest and largest numeric value in a column.
fn column_bounds(coordinator: &ViewCoordinator, col: &str) -> Option<(f64, f64)> {
    let values = coordinator.dataset().unique_values.get(col)?;
    let mut numbers = values.iter().filter_map(Value::as_f64);
    let first = numbers.next()?;
    let last = numbers.last().unwrap_or(first);
    Some((first, last))
}

fn view_controls(
    ui: &mut Ui,
    coordinator: &ViewCoordinator,
    index: usize,
    binding: &ViewBinding,
    events: &mut Vec<Event>,
) {
    let schema = &coordinator.dataset().schema;
    match &binding.kind {
        ViewKind::Scatter { x, y, color_by } => {
            egui::CollapsingHeader::new(&binding.title)
                .id_salt(("view", index))
                .show(ui, |ui: &mut Ui| {
                    axis_combo(ui, schema.numeric_columns(), index, Axis::X, x, events);
                    axis_combo(ui, schema.numeric_columns(), index, Axis::Y, y, events);

                    let current = color_by.clone().unwrap_or_else(|| "None".to_string());
                    egui::ComboBox::from_id_salt(("color_by", index))
                        .selected_text(format!("Color: {current}"))
                        .show_ui(ui, |ui: &mut Ui| {
                            if ui.selectable_label(color_by.is_none(), "None").clicked() {
                                events.push(Event::SetColorBy {
                                    view: index,
                                    column: None,
                                });
                            }
                            for col in schema.categorical_columns() {
                                if ui
                                    .selectable_label(color_by.as_deref() == Some(col), col)
                                    .clicked()
                                {
                                    events.push(Event::SetColorBy {
                                        view: index,
                                        column: Some(col.to_string()),
                                    });
                                }
                            }
                        });
                });
        }
        ViewKind::Line { x, y } => {
            egui::CollapsingHeader::new(&binding.title)
                .id_salt(("view", index))
                .show(ui, |ui: &mut Ui| {
                    axis_combo(ui, schema.numeric_columns(), index, Axis::X, x, events);
                    axis_combo(ui, schema.numeric_columns(), index, Axis::Y, y, events);
                });
        }
        _ => {}
    }
}

fn axis_combo<'a>(
    ui: &mut Ui,
    columns: impl Iterator<Item = &'a str>,
    view: usize,
    axis: Axis,
    current: &str,
    events: &mut Vec<Event>,
) {
    let label = match axis {
        Axis::X => "X",
        Axis::Y => "Y",
    };
    egui::ComboBox::from_id_salt(("axis", view, label))
        .selected_text(format!("{label}: {current}"))
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                if ui.selectable_label(col == current, col).clicked() && col != current {
                    events.push(Event::SetAxis {
                        view,
                        axis,
                        column: col.to_string(),
                    });
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            let idle = !matches!(state.phase, LoadPhase::Loading { .. });
            if ui.add_enabled(idle, egui::Button::new("Open…")).clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.is_ready(), egui::Button::new("Save layout…"))
                .clicked()
            {
                save_layout_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        match &state.phase {
            LoadPhase::Uninitialized => {
                ui.label("No dataset");
            }
            LoadPhase::Loading { path, .. } => {
                ui.spinner();
                ui.label(format!("Loading {}…", path.display()));
            }
            LoadPhase::Ready(coordinator) => {
                let snapshot = coordinator.snapshot();
                ui.label(format!(
                    "{} rows loaded, {} visible, {} selected",
                    coordinator.dataset().len(),
                    snapshot.working_set.len(),
                    snapshot.selection.len()
                ));
                let filters: Vec<String> = coordinator
                    .state()
                    .filters
                    .active()
                    .map(|(column, predicate)| describe_filter(column, predicate))
                    .collect();
                if !filters.is_empty() {
                    ui.separator();
                    ui.label(format!("Filters: {}", filters.join(", ")));
                }
                if let Some(warning) = snapshot.warning {
                    ui.separator();
                    ui.label(RichText::new(warning.to_string()).color(Color32::YELLOW));
                }
            }
            LoadPhase::LoadFailed { title, .. } => {
                ui.label(RichText::new(format!("Error: {title}")).color(Color32::RED));
            }
        }
    });
}

fn describe_filter(column: &str, predicate: &FilterPredicate) -> String {
    match predicate {
        FilterPredicate::All => format!("{column}: all"),
        FilterPredicate::Equals(value) => format!("{column} = {value}"),
        FilterPredicate::Range { lo, hi } => format!("{column} in [{lo}, {hi}]"),
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open vehicle data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.start_load(path);
    }
}

pub fn save_layout_dialog(state: &AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save dashboard layout")
        .add_filter("JSON", &["json"])
        .set_file_name(DEFAULT_CONFIG_FILE)
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.save_layout(&path) {
            log::error!("Could not save layout to {}: {e}", path.display());
        }
    }
}
