use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, Pos2, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotUi, Points, Polygon};

use crate::color::{dimmed, ColorMap, BASE_COLOR, HIGHLIGHT_COLOR};
use crate::coordinator::{
    GroupMark, Mark, Measure, Snapshot, ViewData, ViewKind, ViewOutput, ViewStatus,
};
use crate::data::model::{Dataset, RowId};
use crate::data::selection::Region;
use crate::state::Event;
use crate::ui::table;

const PLOT_HEIGHT: f32 = 260.0;

/// Screen distance within which a click picks a point.
const PICK_RADIUS: f32 = 8.0;

const BAR_WIDTH: f64 = 0.7;

// ---------------------------------------------------------------------------
// One dashboard view
// ---------------------------------------------------------------------------

/// Render one view and return the event its gestures produced, if any.
pub fn show_view(
    ui: &mut Ui,
    dataset: &Dataset,
    snapshot: &Snapshot,
    output: &ViewOutput,
    brush: &mut Option<[f64; 2]>,
) -> Option<Event> {
    ui.strong(&output.binding.title);

    if output.status == ViewStatus::NoData {
        ui.allocate_ui(egui::vec2(ui.available_width(), PLOT_HEIGHT), |ui: &mut Ui| {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.weak("No data");
            });
        });
        return None;
    }

    match &output.data {
        ViewData::Scatter(marks) => scatter_plot(ui, dataset, snapshot, output, marks, brush),
        ViewData::Line(marks) => line_plot(ui, snapshot, output, marks),
        ViewData::Bars(groups) => bar_plot(ui, snapshot, output, groups),
        ViewData::Boxes(groups) => box_plot(ui, snapshot, output, groups),
        ViewData::Table(rows) => table::data_table(ui, dataset, output.index, rows),
    }
}

// ---------------------------------------------------------------------------
// Scatter: brush to select a region, click to pick a row
// ---------------------------------------------------------------------------

fn scatter_plot(
    ui: &mut Ui,
    dataset: &Dataset,
    snapshot: &Snapshot,
    output: &ViewOutput,
    marks: &[Mark],
    brush: &mut Option<[f64; 2]>,
) -> Option<Event> {
    let ViewKind::Scatter { x, y, color_by } = &output.binding.kind else {
        return None;
    };

    let color_map = color_by
        .as_deref()
        .and_then(|col| dataset.unique_values.get(col))
        .map(ColorMap::new);

    // One series per colour so the legend reads as the colour key.
    let mut series: Vec<(String, Color32, Vec<[f64; 2]>)> = Vec::new();
    let mut selected = Vec::new();
    for mark in marks {
        let (name, color) = match (&color_map, &mark.color_key) {
            (Some(cm), Some(key)) => (key.to_string(), cm.color_for(key)),
            _ => (y.clone(), BASE_COLOR),
        };
        if mark.highlighted {
            selected.push([mark.x, mark.y]);
        }
        match series.iter_mut().find(|(n, _, _)| *n == name) {
            Some((_, _, points)) => points.push([mark.x, mark.y]),
            None => series.push((name, color, vec![[mark.x, mark.y]])),
        }
    }
    let dim = snapshot.has_selection();

    Plot::new(("view", output.index))
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x)
        .y_axis_label(y)
        .allow_drag(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            for (name, color, points) in series {
                let color = if dim { dimmed(color) } else { color };
                plot_ui.points(Points::new(points).name(name).color(color).radius(3.0));
            }
            if !selected.is_empty() {
                plot_ui.points(
                    Points::new(selected)
                        .name("Selected")
                        .color(HIGHLIGHT_COLOR)
                        .radius(4.5),
                );
            }

            let response = plot_ui.response().clone();
            if response.drag_started() {
                *brush = plot_ui
                    .ctx()
                    .input(|i| i.pointer.press_origin())
                    .map(|pos| to_array(plot_ui.plot_from_screen(pos)));
            }
            let pointer = plot_ui
                .ctx()
                .input(|i| i.pointer.latest_pos())
                .map(|pos| to_array(plot_ui.plot_from_screen(pos)));

            if let (Some(origin), Some(end)) = (*brush, pointer) {
                plot_ui.polygon(
                    Polygon::new(vec![
                        [origin[0], origin[1]],
                        [end[0], origin[1]],
                        [end[0], end[1]],
                        [origin[0], end[1]],
                    ])
                    .fill_color(HIGHLIGHT_COLOR.gamma_multiply(0.15))
                    .stroke(Stroke::new(1.0, HIGHLIGHT_COLOR)),
                );
            }

            if response.drag_stopped() {
                let origin = brush.take()?;
                let end = pointer?;
                return Some(Event::SelectRegion(Region::from_corners(x, y, origin, end)));
            }
            if response.clicked() {
                let pos = response.interact_pointer_pos()?;
                return Some(match nearest_mark(plot_ui, marks, pos) {
                    Some(row) => Event::SelectRow(row),
                    None => Event::ClearSelection,
                });
            }
            None
        })
        .inner
}

// ---------------------------------------------------------------------------
// Line: ordered by x, click to pick a row
// ---------------------------------------------------------------------------

fn line_plot(ui: &mut Ui, snapshot: &Snapshot, output: &ViewOutput, marks: &[Mark]) -> Option<Event> {
    let ViewKind::Line { x, y } = &output.binding.kind else {
        return None;
    };

    let points: Vec<[f64; 2]> = marks.iter().map(|m| [m.x, m.y]).collect();
    let selected: Vec<[f64; 2]> = marks
        .iter()
        .filter(|m| m.highlighted)
        .map(|m| [m.x, m.y])
        .collect();
    let color = if snapshot.has_selection() {
        dimmed(BASE_COLOR)
    } else {
        BASE_COLOR
    };

    Plot::new(("view", output.index))
        .height(PLOT_HEIGHT)
        .x_axis_label(x)
        .y_axis_label(y)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points.clone()).name(y).color(color).width(1.5));
            plot_ui.points(Points::new(points).color(color).radius(2.0));
            if !selected.is_empty() {
                plot_ui.points(Points::new(selected).color(HIGHLIGHT_COLOR).radius(4.0));
            }

            let response = plot_ui.response().clone();
            if response.clicked() {
                let pos = response.interact_pointer_pos()?;
                return Some(match nearest_mark(plot_ui, marks, pos) {
                    Some(row) => Event::SelectRow(row),
                    None => Event::ClearSelection,
                });
            }
            None
        })
        .inner
}

// ---------------------------------------------------------------------------
// Bars: one bar per group, click to select the group
// ---------------------------------------------------------------------------

fn bar_plot(
    ui: &mut Ui,
    snapshot: &Snapshot,
    output: &ViewOutput,
    groups: &[GroupMark],
) -> Option<Event> {
    let labels = group_labels(groups);
    let dim = snapshot.has_selection();

    let bars: Vec<Bar> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let fill = group_fill(group, dim);
            let bar = Bar::new(i as f64, group.value)
                .width(BAR_WIDTH)
                .name(&labels[i])
                .fill(fill);
            if group.highlighted > 0 {
                bar.stroke(Stroke::new(2.0, HIGHLIGHT_COLOR))
            } else {
                bar
            }
        })
        .collect();

    let y_label = match &output.binding.kind {
        ViewKind::Bar {
            measure: Measure::Mean(col),
            ..
        } => format!("mean {col}"),
        _ => "count".to_string(),
    };

    Plot::new(("view", output.index))
        .height(PLOT_HEIGHT)
        .y_axis_label(y_label)
        .x_axis_formatter(category_formatter(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&output.binding.title));
            group_click(plot_ui, output, groups, |group, p| {
                p.y >= 0.0_f64.min(group.value) && p.y <= 0.0_f64.max(group.value)
            })
        })
        .inner
}

// ---------------------------------------------------------------------------
// Box plot: quartile box, whiskers and outliers per group
// ---------------------------------------------------------------------------

fn box_plot(
    ui: &mut Ui,
    snapshot: &Snapshot,
    output: &ViewOutput,
    groups: &[GroupMark],
) -> Option<Event> {
    let y_label = match &output.binding.kind {
        ViewKind::BoxPlot { value, .. } => value.clone(),
        _ => String::new(),
    };
    let labels = group_labels(groups);
    let dim = snapshot.has_selection();

    Plot::new(("view", output.index))
        .height(PLOT_HEIGHT)
        .y_axis_label(y_label)
        .x_axis_formatter(category_formatter(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, group) in groups.iter().enumerate() {
                draw_box(plot_ui, i as f64, group, dim);
            }
            group_click(plot_ui, output, groups, |group, p| {
                group.record.spread.as_ref().is_some_and(|s| {
                    let lo = s.outliers.first().map_or(s.lower_whisker, |o| o.min(s.lower_whisker));
                    let hi = s.outliers.last().map_or(s.upper_whisker, |o| o.max(s.upper_whisker));
                    p.y >= lo && p.y <= hi
                })
            })
        })
        .inner
}

fn draw_box(plot_ui: &mut PlotUi, x: f64, group: &GroupMark, dim: bool) {
    let Some(stats) = &group.record.spread else {
        return;
    };
    let color = group_fill(group, dim);
    let outline = if group.highlighted > 0 {
        HIGHLIGHT_COLOR
    } else {
        color
    };
    let half = BAR_WIDTH / 2.0;

    plot_ui.polygon(
        Polygon::new(vec![
            [x - half, stats.q1],
            [x + half, stats.q1],
            [x + half, stats.q3],
            [x - half, stats.q3],
        ])
        .fill_color(color.linear_multiply(0.3))
        .stroke(Stroke::new(2.0, outline)),
    );
    plot_ui.line(
        Line::new(vec![[x - half, stats.median], [x + half, stats.median]])
            .color(outline)
            .width(3.0),
    );

    let cap = half * 0.5;
    for (from, to) in [(stats.q3, stats.upper_whisker), (stats.q1, stats.lower_whisker)] {
        plot_ui.line(Line::new(vec![[x, from], [x, to]]).color(color).width(1.5));
        plot_ui.line(
            Line::new(vec![[x - cap, to], [x + cap, to]])
                .color(color)
                .width(1.5),
        );
    }

    if !stats.outliers.is_empty() {
        let points: Vec<[f64; 2]> = stats.outliers.iter().map(|&v| [x, v]).collect();
        plot_ui.points(Points::new(points).color(color).radius(3.0));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_array(p: PlotPoint) -> [f64; 2] {
    [p.x, p.y]
}

fn group_labels(groups: &[GroupMark]) -> Vec<String> {
    groups.iter().map(|g| g.record.key.to_string()).collect()
}

fn group_fill(group: &GroupMark, dim: bool) -> Color32 {
    if group.highlighted > 0 && group.highlighted == group.record.count {
        HIGHLIGHT_COLOR
    } else if dim {
        dimmed(BASE_COLOR)
    } else {
        BASE_COLOR
    }
}

/// Label integer x positions with the group keys; hide everything else.
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let v = mark.value;
        if v < 0.0 || (v - v.round()).abs() > 1e-6 {
            return String::new();
        }
        labels.get(v.round() as usize).cloned().unwrap_or_default()
    }
}

/// Turn a click on group `i` (drawn at x = i) into a group selection.
fn group_click(
    plot_ui: &PlotUi,
    output: &ViewOutput,
    groups: &[GroupMark],
    hit: impl Fn(&GroupMark, PlotPoint) -> bool,
) -> Option<Event> {
    if !plot_ui.response().clicked() {
        return None;
    }
    let p = plot_ui.pointer_coordinate()?;
    let idx = p.x.round();
    let group = (idx >= 0.0 && (p.x - idx).abs() <= BAR_WIDTH / 2.0)
        .then(|| groups.get(idx as usize))
        .flatten()
        .filter(|g| hit(*g, p));

    Some(match group {
        Some(group) => Event::SelectGroup {
            view: output.index,
            key: group.record.key.clone(),
        },
        None => Event::ClearSelection,
    })
}

/// The row whose mark is closest to `pos` on screen, within [`PICK_RADIUS`].
fn nearest_mark(plot_ui: &PlotUi, marks: &[Mark], pos: Pos2) -> Option<RowId> {
    marks
        .iter()
        .map(|m| {
            let screen = plot_ui.screen_from_plot(PlotPoint::new(m.x, m.y));
            (m.row, screen.distance(pos))
        })
        .filter(|(_, d)| *d <= PICK_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(row, _)| row)
}
