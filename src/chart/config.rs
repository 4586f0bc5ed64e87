use crate::error::ChartError;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};
use tracing::info;

/// Key in `year_ranges` for the summed series.
pub const ALL_DSOS: &str = "all_dsos";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AxesConfig {
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

/// Overrides for one graph.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RangeConfig {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub title: Option<String>,
    pub graph_id: Option<String>,
    pub color: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub year_ranges: BTreeMap<String, RangeConfig>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub axes: AxesConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("figures")
}

impl GraphConfig {
    /// `Ok(None)` when the file does not exist or is empty.
    pub fn load(path: &Path) -> Result<Option<Self>, ChartError> {
        if !path.exists() {
            info!(path = %path.display(), "graph config not found; skipping visualization");
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Option<Self>, ChartError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ChartError::Config(e.to_string()))?;
        match &value {
            serde_yaml::Value::Null => return Ok(None),
            serde_yaml::Value::Mapping(m) if m.is_empty() => return Ok(None),
            serde_yaml::Value::Mapping(_) => {}
            _ => {
                return Err(ChartError::Config(
                    "graph configuration must be a mapping at the top level".to_string(),
                ))
            }
        }
        serde_yaml::from_value(value)
            .map(Some)
            .map_err(|e| ChartError::Config(e.to_string()))
    }

    pub fn range(&self, key: &str) -> RangeConfig {
        self.year_ranges.get(key).cloned().unwrap_or_default()
    }

    pub fn x_label(&self, range: &RangeConfig) -> String {
        range
            .x_label
            .clone()
            .or_else(|| self.axes.x_label.clone())
            .unwrap_or_else(|| "Year".to_string())
    }

    pub fn y_label(&self, range: &RangeConfig) -> String {
        range
            .y_label
            .clone()
            .or_else(|| self.axes.y_label.clone())
            .unwrap_or_else(|| "Active gas connections".to_string())
    }
}
