use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "DASHBOARD_CONFIG";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Window and layout settings. Every field has a default, so a config file
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub window_title: String,
    pub window_size: [f32; 2],
    pub min_window_size: [f32; 2],
    /// Suggested file name in the CSV save dialog.
    pub export_file_name: String,
    pub chart_height: f32,
    pub table_row_height: f32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_title: "Enhanced Marketing Dashboard".to_string(),
            window_size: [1280.0, 900.0],
            min_window_size: [720.0, 480.0],
            export_file_name: "filtered_data.csv".to_string(),
            chart_height: 280.0,
            table_row_height: 20.0,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, overridden by the file in `$DASHBOARD_CONFIG` when set.
    /// A broken config file is logged and ignored.
    pub fn load() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::from_file(Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded config from {}", Path::new(&path).display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "window_title": "Sales", "chart_height": 300.0 }}"#).unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.window_title, "Sales");
        assert_eq!(config.chart_height, 300.0);
        assert_eq!(config.export_file_name, "filtered_data.csv");
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(DashboardConfig::from_file(file.path()).is_err());
    }
}
