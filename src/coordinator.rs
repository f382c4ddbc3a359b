//! View coordination: one dashboard state, many synchronized views.
//!
//! Every event goes through [`ViewCoordinator::dispatch`], which reduces the
//! [`DashboardState`], recomputes the working set and the per-view data from
//! scratch, and hands the resulting [`Snapshot`] to every subscriber. There
//! is no batching: one event, one full recompute.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::aggregate::{
    box_plot_stats, group_count, group_mean, sort_records, AggregateRecord, SortOrder,
};
use crate::data::model::{Dataset, Row, RowId, Schema, Value};
use crate::data::selection::SelectionState;
use crate::error::DashWarning;
use crate::state::{DashboardState, Event};

// ---------------------------------------------------------------------------
// View bindings (configuration)
// ---------------------------------------------------------------------------

/// What a bar chart plots per group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    Count,
    Mean(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewKind {
    Scatter {
        x: String,
        y: String,
        #[serde(default)]
        color_by: Option<String>,
    },
    Line {
        x: String,
        y: String,
    },
    Bar {
        group: String,
        #[serde(default)]
        measure: Measure,
        #[serde(default)]
        sort: SortOrder,
    },
    BoxPlot {
        group: String,
        value: String,
    },
    Table,
}

/// One chart on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewBinding {
    pub title: String,
    #[serde(flatten)]
    pub kind: ViewKind,
}

impl ViewBinding {
    pub fn new(title: &str, kind: ViewKind) -> Self {
        Self {
            title: title.to_string(),
            kind,
        }
    }

    /// Columns the view reads.
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            ViewKind::Scatter { x, y, color_by } => {
                let mut cols = vec![x.as_str(), y.as_str()];
                cols.extend(color_by.as_deref());
                cols
            }
            ViewKind::Line { x, y } => vec![x.as_str(), y.as_str()],
            ViewKind::Bar { group, measure, .. } => match measure {
                Measure::Count => vec![group.as_str()],
                Measure::Mean(value) => vec![group.as_str(), value.as_str()],
            },
            ViewKind::BoxPlot { group, value } => vec![group.as_str(), value.as_str()],
            ViewKind::Table => Vec::new(),
        }
    }

    /// Whether every column the view reads exists in `schema`.
    pub fn fits(&self, schema: &Schema) -> bool {
        self.columns().iter().all(|c| schema.index_of(c).is_some())
    }
}

// ---------------------------------------------------------------------------
// Per-view output
// ---------------------------------------------------------------------------

/// One plotted row.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub row: RowId,
    pub x: f64,
    pub y: f64,
    pub highlighted: bool,
    /// Value of the colour-by column, when the view has one.
    pub color_key: Option<Value>,
}

/// One bar or box.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMark {
    pub record: AggregateRecord,
    /// Height of the bar (count or mean); the median for boxes.
    pub value: f64,
    /// Members of the group that are currently selected.
    pub highlighted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub row: RowId,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewData {
    Scatter(Vec<Mark>),
    Line(Vec<Mark>),
    Bars(Vec<GroupMark>),
    Boxes(Vec<GroupMark>),
    Table(Vec<TableRow>),
}

impl ViewData {
    pub fn is_empty(&self) -> bool {
        match self {
            ViewData::Scatter(marks) | ViewData::Line(marks) => marks.is_empty(),
            ViewData::Bars(groups) | ViewData::Boxes(groups) => groups.is_empty(),
            ViewData::Table(rows) => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Ready,
    /// Nothing to draw; the view shows a "no data" placeholder.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutput {
    /// Position of the view in [`DashboardState::views`].
    pub index: usize,
    pub binding: ViewBinding,
    pub status: ViewStatus,
    pub data: ViewData,
}

/// Everything the views need after one recompute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Incremented on every recompute.
    pub revision: u64,
    pub working_set: Vec<RowId>,
    pub selection: BTreeSet<RowId>,
    pub views: Vec<ViewOutput>,
    pub warning: Option<DashWarning>,
}

impl Snapshot {
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }
}

/// Build the snapshot for `state`. Pure: same inputs, same snapshot.
pub fn build_snapshot(dataset: &Dataset, state: &DashboardState, revision: u64) -> Snapshot {
    let working = state.working_rows(dataset);
    let warning = working.is_empty().then_some(DashWarning::EmptyResult);

    let views = state
        .views
        .iter()
        .enumerate()
        .map(|(index, binding)| {
            let data = build_view(&dataset.schema, &working, &state.selection, binding);
            let status = if data.is_empty() {
                ViewStatus::NoData
            } else {
                ViewStatus::Ready
            };
            ViewOutput {
                index,
                binding: binding.clone(),
                status,
                data,
            }
        })
        .collect();

    Snapshot {
        revision,
        working_set: working.iter().map(|r| r.id).collect(),
        selection: state.selection.ids().clone(),
        views,
        warning,
    }
}

fn build_view(
    schema: &Schema,
    rows: &[&Row],
    selection: &SelectionState,
    binding: &ViewBinding,
) -> ViewData {
    match &binding.kind {
        ViewKind::Scatter { x, y, color_by } => {
            ViewData::Scatter(marks(schema, rows, selection, x, y, color_by.as_deref()))
        }
        ViewKind::Line { x, y } => {
            let mut line = marks(schema, rows, selection, x, y, None);
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            ViewData::Line(line)
        }
        ViewKind::Bar {
            group,
            measure,
            sort,
        } => {
            let mut records = match measure {
                Measure::Count => group_count(schema, rows, group),
                Measure::Mean(value) => group_mean(schema, rows, group, value)
                    .into_iter()
                    .filter(|r| r.mean.is_some())
                    .collect(),
            };
            sort_records(&mut records, *sort);
            ViewData::Bars(
                records
                    .into_iter()
                    .map(|record| group_mark(record, selection, |r| r.measure()))
                    .collect(),
            )
        }
        ViewKind::BoxPlot { group, value } => ViewData::Boxes(
            box_plot_stats(schema, rows, group, value)
                .into_iter()
                .map(|record| {
                    group_mark(record, selection, |r| {
                        r.spread.as_ref().map_or(0.0, |s| s.median)
                    })
                })
                .collect(),
        ),
        ViewKind::Table => ViewData::Table(
            rows.iter()
                .map(|row| TableRow {
                    row: row.id,
                    highlighted: selection.contains(row.id),
                })
                .collect(),
        ),
    }
}

fn marks(
    schema: &Schema,
    rows: &[&Row],
    selection: &SelectionState,
    x: &str,
    y: &str,
    color_by: Option<&str>,
) -> Vec<Mark> {
    let (Some(xi), Some(yi)) = (schema.index_of(x), schema.index_of(y)) else {
        return Vec::new();
    };
    let ci = color_by.and_then(|c| schema.index_of(c));
    rows.iter()
        .filter_map(|row| {
            let x = row.at(xi)?.as_f64()?;
            let y = row.at(yi)?.as_f64()?;
            Some(Mark {
                row: row.id,
                x,
                y,
                highlighted: selection.contains(row.id),
                color_key: ci.and_then(|idx| row.at(idx)).cloned(),
            })
        })
        .collect()
}

fn group_mark(
    record: AggregateRecord,
    selection: &SelectionState,
    value: impl Fn(&AggregateRecord) -> f64,
) -> GroupMark {
    let highlighted = record
        .members
        .iter()
        .filter(|id| selection.contains(**id))
        .count();
    GroupMark {
        value: value(&record),
        highlighted,
        record,
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Recomputation is synchronous, so outside `recompute` the coordinator is
/// always `Idle`. Listeners run while it is `Recomputing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Recomputing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&Snapshot)>;

/// Owns the dataset and the dashboard state; the single place state changes.
pub struct ViewCoordinator {
    dataset: Dataset,
    state: DashboardState,
    snapshot: Snapshot,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    phase: Phase,
}

impl ViewCoordinator {
    /// Bind `views` to `dataset`, dropping views that read unknown columns.
    pub fn new(dataset: Dataset, views: Vec<ViewBinding>) -> Self {
        let views: Vec<ViewBinding> = views
            .into_iter()
            .filter(|view| {
                let fits = view.fits(&dataset.schema);
                if !fits {
                    log::warn!(
                        "Dropping view '{}': columns {:?} not all in dataset",
                        view.title,
                        view.columns()
                    );
                }
                fits
            })
            .collect();

        let state = DashboardState::new(views);
        let snapshot = build_snapshot(&dataset, &state, 0);
        Self {
            dataset,
            state,
            snapshot,
            listeners: Vec::new(),
            next_subscription: 0,
            phase: Phase::Idle,
        }
    }

    /// Apply `event`, recompute every view and notify subscribers.
    pub fn dispatch(&mut self, event: Event) -> &Snapshot {
        log::debug!("dispatch {event:?}");
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(&self.dataset, event);
        self.recompute()
    }

    /// Rebuild the snapshot from the current state and notify subscribers.
    pub fn recompute(&mut self) -> &Snapshot {
        debug_assert_eq!(self.phase, Phase::Idle);
        self.phase = Phase::Recomputing;
        self.snapshot = build_snapshot(&self.dataset, &self.state, self.snapshot.revision + 1);

        let stale = self.state.selection.stale_ids(&self.snapshot.working_set);
        if !stale.is_empty() {
            log::trace!("{} selected rows are filtered out", stale.len());
        }

        for (_, listener) in &mut self.listeners {
            listener(&self.snapshot);
        }
        self.phase = Phase::Idle;
        &self.snapshot
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::default_views;
    use crate::data::filter::FilterPredicate;
    use crate::data::loader::read_csv;
    use crate::data::selection::Region;

    const CARS: &str = "\
Car,Manufacturer,MPG,Cylinders,Horsepower,Weight,ModelYear,Origin
chevelle,chevrolet,18,8,130,3504,70,USA
skylark,buick,15,8,165,3693,70,USA
pl510,datsun,27,4,88,2130,71,Japan
pinto,ford,25,4,,2046,71,USA
beetle,volkswagen,26,4,46,1835,70,Europe
torino,ford,17,8,140,3449,70,USA
corolla,toyota,31,4,65,1773,71,Japan
";

    fn coordinator() -> ViewCoordinator {
        let ds = read_csv(CARS.as_bytes(), Some("Car")).unwrap();
        ViewCoordinator::new(ds, default_views())
    }

    fn view<'a>(snapshot: &'a Snapshot, title: &str) -> &'a ViewOutput {
        snapshot
            .views
            .iter()
            .find(|v| v.binding.title == title)
            .unwrap()
    }

    #[test]
    fn test_initial_snapshot_covers_every_view() {
        let coord = coordinator();
        let snapshot = coord.snapshot();
        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.working_set.len(), 7);
        assert_eq!(snapshot.views.len(), 6);
        assert!(snapshot.views.iter().all(|v| v.status == ViewStatus::Ready));
        assert_eq!(snapshot.warning, None);
        assert_eq!(coord.phase, Phase::Idle);

        // The pinto has no horsepower and is left off the scatter.
        match &view(snapshot, "Horsepower vs MPG").data {
            ViewData::Scatter(marks) => assert_eq!(marks.len(), 6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_views_with_unknown_columns_are_dropped() {
        let ds = read_csv("Origin,MPG\nUSA,20\n".as_bytes(), None).unwrap();
        let coord = ViewCoordinator::new(ds, default_views());
        let titles: Vec<&str> = coord
            .state()
            .views
            .iter()
            .map(|v| v.title.as_str())
            .collect();
        assert_eq!(titles, vec!["MPG by origin", "Mean MPG by origin", "Data"]);
    }

    #[test]
    fn test_bar_views_aggregate_working_set() {
        let coord = coordinator();
        let snapshot = coord.snapshot();

        match &view(snapshot, "Cars per manufacturer").data {
            ViewData::Bars(bars) => {
                let keys: Vec<String> = bars.iter().map(|b| b.record.key.to_string()).collect();
                assert_eq!(
                    keys,
                    vec!["chevrolet", "buick", "datsun", "ford", "volkswagen", "toyota"]
                );
                assert_eq!(bars[3].value, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        match &view(snapshot, "Mean MPG by origin").data {
            ViewData::Bars(bars) => {
                let keys: Vec<String> = bars.iter().map(|b| b.record.key.to_string()).collect();
                assert_eq!(keys, vec!["Japan", "Europe", "USA"]);
                assert_eq!(bars[0].value, 29.0);
                assert_eq!(bars[2].value, 18.75);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_line_view_is_sorted_by_x() {
        let coord = coordinator();
        match &view(coord.snapshot(), "Weight by model year").data {
            ViewData::Line(marks) => {
                let xs: Vec<f64> = marks.iter().map(|m| m.x).collect();
                assert_eq!(xs, vec![70.0, 70.0, 70.0, 70.0, 71.0, 71.0, 71.0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_filter_result_marks_every_view() {
        let mut coord = coordinator();
        let snapshot = coord.dispatch(Event::SetPredicate {
            column: "Origin".into(),
            predicate: FilterPredicate::Equals(Value::from("Mars")),
        });
        assert!(snapshot.working_set.is_empty());
        assert_eq!(snapshot.warning, Some(DashWarning::EmptyResult));
        assert!(snapshot.views.iter().all(|v| v.status == ViewStatus::NoData));
    }

    #[test]
    fn test_filters_then_reset_restore_working_set() {
        let mut coord = coordinator();
        let original = coord.snapshot().working_set.clone();

        coord.dispatch(Event::SetPredicate {
            column: "Origin".into(),
            predicate: FilterPredicate::Equals(Value::from("USA")),
        });
        let narrowed = coord
            .dispatch(Event::SetPredicate {
                column: "Cylinders".into(),
                predicate: FilterPredicate::Equals(Value::Number(8.0)),
            })
            .working_set
            .clone();
        assert_eq!(narrowed, vec![RowId(0), RowId(1), RowId(5)]);

        let snapshot = coord.dispatch(Event::ResetFilters);
        assert_eq!(snapshot.working_set, original);
        assert_eq!(snapshot.revision, 3);
    }

    #[test]
    fn test_group_click_highlights_across_views() {
        let mut coord = coordinator();
        let bar_view = view(coord.snapshot(), "Mean MPG by origin").index;
        let snapshot = coord.dispatch(Event::SelectGroup {
            view: bar_view,
            key: Value::from("Japan"),
        });
        assert_eq!(snapshot.selection, BTreeSet::from([RowId(2), RowId(6)]));

        match &view(snapshot, "Data").data {
            ViewData::Table(rows) => {
                let lit: Vec<RowId> = rows.iter().filter(|r| r.highlighted).map(|r| r.row).collect();
                assert_eq!(lit, vec![RowId(2), RowId(6)]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &view(snapshot, "MPG by origin").data {
            ViewData::Boxes(boxes) => {
                let japan = boxes
                    .iter()
                    .find(|b| b.record.key == Value::from("Japan"))
                    .unwrap();
                assert_eq!(japan.highlighted, 2);
                assert!(boxes
                    .iter()
                    .filter(|b| b.record.key != Value::from("Japan"))
                    .all(|b| b.highlighted == 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_stale_selection_is_tolerated() {
        let mut coord = coordinator();
        coord.dispatch(Event::SelectRegion(Region::from_corners(
            "Horsepower",
            "MPG",
            [0.0, 0.0],
            [100.0, 50.0],
        )));
        assert_eq!(
            coord.snapshot().selection,
            BTreeSet::from([RowId(2), RowId(4), RowId(6)])
        );

        // Filter the brushed Europe row out; it stays selected but unmatched.
        let snapshot = coord.dispatch(Event::SetPredicate {
            column: "Origin".into(),
            predicate: FilterPredicate::Equals(Value::from("Japan")),
        });
        assert!(snapshot.selection.contains(&RowId(4)));
        match &view(snapshot, "Horsepower vs MPG").data {
            ViewData::Scatter(marks) => {
                assert_eq!(marks.len(), 2);
                assert!(marks.iter().all(|m| m.highlighted));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_subscribers_see_every_recompute() {
        let mut coord = coordinator();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = coord.subscribe(Box::new(move |snapshot: &Snapshot| {
            sink.borrow_mut().push(snapshot.revision);
        }));

        coord.dispatch(Event::SelectRow(RowId(0)));
        coord.dispatch(Event::ClearSelection);
        assert_eq!(*seen.borrow(), vec![1, 2]);

        assert!(coord.unsubscribe(id));
        assert!(!coord.unsubscribe(id));
        coord.dispatch(Event::ResetFilters);
        assert_eq!(seen.borrow().len(), 2);
    }
}
