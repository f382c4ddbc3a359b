use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coordinator::{Measure, ViewBinding, ViewKind};
use crate::data::aggregate::SortOrder;
use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RUSTY_DASH_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "rusty-dash.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Which dataset to open, which controls to offer and which views to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset opened at startup.
    pub dataset: Option<PathBuf>,
    /// Column holding a unique label per row.
    pub id_column: Option<String>,
    /// Columns offered as equality filters. Empty means every categorical column.
    pub filter_columns: Vec<String>,
    pub views: Vec<ViewBinding>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            id_column: None,
            filter_columns: vec![
                "Manufacturer".to_string(),
                "Origin".to_string(),
                "Cylinders".to_string(),
            ],
            views: default_views(),
        }
    }
}

/// The vehicle dashboard: fuel scatter, make counts, weight trend,
/// MPG spread and mean per origin, and the raw table.
pub fn default_views() -> Vec<ViewBinding> {
    vec![
        ViewBinding::new(
            "Horsepower vs MPG",
            ViewKind::Scatter {
                x: "Horsepower".to_string(),
                y: "MPG".to_string(),
                color_by: Some("Origin".to_string()),
            },
        ),
        ViewBinding::new(
            "Cars per manufacturer",
            ViewKind::Bar {
                group: "Manufacturer".to_string(),
                measure: Measure::Count,
                sort: SortOrder::FirstSeen,
            },
        ),
        ViewBinding::new(
            "Weight by model year",
            ViewKind::Line {
                x: "ModelYear".to_string(),
                y: "Weight".to_string(),
            },
        ),
        ViewBinding::new(
            "MPG by origin",
            ViewKind::BoxPlot {
                group: "Origin".to_string(),
                value: "MPG".to_string(),
            },
        ),
        ViewBinding::new(
            "Mean MPG by origin",
            ViewKind::Bar {
                group: "Origin".to_string(),
                measure: Measure::Mean("MPG".to_string()),
                sort: SortOrder::ValueDescending,
            },
        ),
        ViewBinding::new("Data", ViewKind::Table),
    ]
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the config from `RUSTY_DASH_CONFIG`, then `rusty-dash.json`,
    /// falling back to the built-in vehicle dashboard.
    pub fn discover() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let candidate = explicit.or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

        match candidate {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::error!("Ignoring config {}: {e}", path.display());
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}
