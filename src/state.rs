use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};

use crate::config::DashboardConfig;
use crate::coordinator::{Snapshot, ViewBinding, ViewCoordinator, ViewKind};
use crate::data::aggregate::group_count;
use crate::data::filter::{FilterPredicate, FilterState};
use crate::data::loader::{self, LoadResult};
use crate::data::model::{Dataset, Row, RowId, Value};
use crate::data::selection::{Region, SelectionState};
use crate::error::{ConfigError, LoadError};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Everything the control surface and the charts can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetPredicate {
        column: String,
        predicate: FilterPredicate,
    },
    ResetFilters,
    SetSelection(BTreeSet<RowId>),
    /// Brush over a scatter view.
    SelectRegion(Region),
    /// Click on one bar or box of view `view`.
    SelectGroup { view: usize, key: Value },
    /// Click on a point or a table row. Clicking the sole selected row again clears it.
    SelectRow(RowId),
    ClearSelection,
    SetAxis {
        view: usize,
        axis: Axis,
        column: String,
    },
    SetColorBy {
        view: usize,
        column: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Dashboard state: filters, selection and view bindings
// ---------------------------------------------------------------------------

/// The whole interactive state of a loaded dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub filters: FilterState,
    pub selection: SelectionState,
    pub views: Vec<ViewBinding>,
}

impl DashboardState {
    pub fn new(views: Vec<ViewBinding>) -> Self {
        Self {
            views,
            ..Default::default()
        }
    }

    /// Apply one event and return the next state.
    ///
    /// Events that do not make sense for the current dataset or bindings
    /// (unknown view, non-numeric axis) leave the state unchanged.
    pub fn reduce(mut self, dataset: &Dataset, event: Event) -> Self {
        match event {
            Event::SetPredicate { column, predicate } => {
                self.filters.set_predicate(&column, predicate);
            }
            Event::ResetFilters => self.filters.reset(),
            Event::SetSelection(ids) => self.selection.set_selection(ids),
            Event::SelectRegion(region) => {
                let working = self.working_rows(dataset);
                self.selection.select_region(&dataset.schema, &working, &region);
            }
            Event::SelectGroup { view, key } => self.select_group(dataset, view, key),
            Event::SelectRow(id) => {
                if self.selection.len() == 1 && self.selection.contains(id) {
                    self.selection.clear();
                } else {
                    self.selection.set_selection(BTreeSet::from([id]));
                }
            }
            Event::ClearSelection => self.selection.clear(),
            Event::SetAxis { view, axis, column } => self.set_axis(dataset, view, axis, column),
            Event::SetColorBy { view, column } => {
                if column
                    .as_deref()
                    .is_some_and(|c| dataset.schema.index_of(c).is_none())
                {
                    log::warn!("Ignoring colour column {column:?}: not in dataset");
                } else if let Some(ViewKind::Scatter { color_by, .. }) =
                    self.views.get_mut(view).map(|b| &mut b.kind)
                {
                    *color_by = column;
                }
            }
        }
        self
    }

    /// Rows passing the current filters.
    pub fn working_rows<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Row> {
        self.filters.evaluate(&dataset.schema, dataset.rows())
    }

    fn select_group(&mut self, dataset: &Dataset, view: usize, key: Value) {
        let group = match self.views.get(view).map(|b| &b.kind) {
            Some(ViewKind::Bar { group, .. }) | Some(ViewKind::BoxPlot { group, .. }) => group,
            _ => {
                log::warn!("View {view} has no groups to select");
                return;
            }
        };
        let working = self.working_rows(dataset);
        let records = group_count(&dataset.schema, &working, group);
        match records.iter().find(|r| r.key == key) {
            Some(record) => self.selection.select_group(record),
            None => log::debug!("Group {key} is not in the working set"),
        }
    }

    fn set_axis(&mut self, dataset: &Dataset, view: usize, axis: Axis, column: String) {
        if !dataset.schema.is_numeric(&column) {
            log::warn!("Ignoring axis column '{column}': not numeric");
            return;
        }
        match self.views.get_mut(view).map(|b| &mut b.kind) {
            Some(ViewKind::Scatter { x, y, .. }) | Some(ViewKind::Line { x, y }) => match axis {
                Axis::X => *x = column,
                Axis::Y => *y = column,
            },
            _ => log::warn!("View {view} has no axes to set"),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state: the session lifecycle around the coordinator
// ---------------------------------------------------------------------------

/// Where the session is in its one-shot dataset load.
pub enum LoadPhase {
    /// Nothing requested yet; controls are inert.
    Uninitialized,
    /// A background load is running; controls are inert.
    Loading {
        path: PathBuf,
        rx: Receiver<LoadResult>,
    },
    Ready(Box<ViewCoordinator>),
    /// The load failed; the message is shown and controls stay disabled.
    LoadFailed { title: String, message: String },
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub phase: LoadPhase,
    pub config: DashboardConfig,

    /// Brush start point per view index, in data coordinates.
    pub brush_origins: Vec<Option<[f64; 2]>>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            phase: LoadPhase::Uninitialized,
            config,
            brush_origins: Vec::new(),
        }
    }

    /// Start loading `path` in the background.
    pub fn start_load(&mut self, path: PathBuf) {
        log::info!("Loading {}", path.display());
        let rx = loader::spawn_load(path.clone(), self.config.id_column.clone());
        self.phase = LoadPhase::Loading { path, rx };
    }

    /// Check on a running load. Returns `true` when the phase changed.
    pub fn poll_load(&mut self) -> bool {
        let outcome = match &self.phase {
            LoadPhase::Loading { rx, .. } => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => Err(LoadError::Disconnected),
            },
            _ => return false,
        };

        match outcome {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Dataset load failed: {e}");
                self.phase = LoadPhase::LoadFailed {
                    title: e.title().to_string(),
                    message: e.user_message(),
                };
            }
        }
        true
    }

    /// Ingest a newly loaded dataset and bring the dashboard up.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        log::info!(
            "Loaded {} rows with columns {:?}",
            dataset.len(),
            dataset.schema.names().collect::<Vec<_>>()
        );
        let mut coordinator = ViewCoordinator::new(dataset, self.config.views.clone());
        coordinator.subscribe(Box::new(|snapshot: &Snapshot| {
            log::debug!(
                "revision {}: {} rows visible, {} selected",
                snapshot.revision,
                snapshot.working_set.len(),
                snapshot.selection.len()
            );
        }));
        self.brush_origins = vec![None; coordinator.state().views.len()];
        self.phase = LoadPhase::Ready(Box::new(coordinator));
    }

    /// Forward an event to the coordinator. Inert unless a dataset is ready.
    pub fn dispatch(&mut self, event: Event) {
        match &mut self.phase {
            LoadPhase::Ready(coordinator) => {
                coordinator.dispatch(event);
            }
            _ => log::debug!("Ignoring {event:?}: no dataset loaded"),
        }
    }

    pub fn coordinator(&self) -> Option<&ViewCoordinator> {
        match &self.phase {
            LoadPhase::Ready(coordinator) => Some(coordinator),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, LoadPhase::Ready(_))
    }

    /// Write the config with the views as currently bound.
    pub fn save_layout(&self, path: &Path) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        if let Some(coordinator) = self.coordinator() {
            config.views = coordinator.state().views.clone();
        }
        config.save(path)?;
        log::info!("Saved layout to {}", path.display());
        Ok(())
    }

    /// Columns offered as equality filters for the loaded dataset.
    pub fn filter_columns(&self) -> Vec<String> {
        let Some(coordinator) = self.coordinator() else {
            return Vec::new();
        };
        let schema = &coordinator.dataset().schema;
        if self.config.filter_columns.is_empty() {
            schema.categorical_columns().map(str::to_string).collect()
        } else {
            self.config
                .filter_columns
                .iter()
                .filter(|c| schema.index_of(c).is_some())
                .cloned()
                .collect()
        }
    }
}
