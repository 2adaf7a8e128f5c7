use std::path::Path;
use std::sync::Arc;

use crate::color::CategoryColors;
use crate::config::DashboardConfig;
use crate::data::cache::DatasetCache;
use crate::data::error::SummaryComputationError;
use crate::data::filter::{FilteredView, apply_filter};
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Value};
use crate::data::stats::{Summary, compute_summary, group_and_sum, scatter_points};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Outcome of the last "Apply Filter" click, shown under the filter box.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStatus {
    Applied { matched: usize },
    Invalid(String),
}

/// The full UI state, independent of rendering.
///
/// Everything derived from the dataset (view, metrics, chart data) is
/// recomputed only when the user changes an input, not on every frame.
pub struct AppState {
    pub config: DashboardConfig,

    cache: DatasetCache,

    /// Rows passing the applied filter (None until a dataset is loaded).
    pub view: Option<FilteredView>,

    /// Selected grouping column.
    pub category_column: Option<String>,

    /// Selected aggregation column.
    pub numeric_column: Option<String>,

    /// Contents of the filter text box.
    pub filter_text: String,

    /// Expression currently in effect (empty = no filter).
    pub applied_filter: String,

    pub filter_status: Option<FilterStatus>,

    /// Metric cards: either the four statistics or the reason they are missing.
    pub summary: Option<Result<Summary, SummaryComputationError>>,

    /// Per-category sums for the bar and pie charts.
    pub groups: Vec<(Value, f64)>,

    /// One point per row for the scatter chart.
    pub scatter: Vec<(Value, f64)>,

    pub colors: CategoryColors,

    /// Reason the charts could not be computed, if any.
    pub chart_error: Option<String>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::default(),
            view: None,
            category_column: None,
            numeric_column: None,
            filter_text: String::new(),
            applied_filter: String::new(),
            filter_status: None,
            summary: None,
            groups: Vec::new(),
            scatter: Vec::new(),
            colors: CategoryColors::default(),
            chart_error: None,
            status_message: None,
        }
    }

    /// The dataset behind the current view.
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.view.as_ref().map(FilteredView::source)
    }

    /// Load (or fetch from the cache) the dataset at `path` and show it.
    pub fn open_path(&mut self, path: &Path) {
        if self.cache.source() == Some(path) && self.view.is_some() {
            log::debug!("{} already open", path.display());
            return;
        }
        match self.cache.get_or_load(path, load_file) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with columns {:?} from {}",
                    dataset.len(),
                    dataset.column_names().collect::<Vec<_>>(),
                    path.display()
                );
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("{e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset: reset filter and pick default columns.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.category_column = dataset.categorical_columns().into_iter().next();
        self.numeric_column = dataset.numeric_columns().into_iter().next();
        self.filter_text.clear();
        self.applied_filter.clear();
        self.filter_status = None;
        self.status_message = if dataset.is_empty() {
            log::warn!("Dataset has no rows");
            Some("The dataset has no rows.".to_string())
        } else {
            None
        };
        self.view = Some(FilteredView::all(dataset));
        self.recompute();
    }

    /// Apply the expression in the filter box.
    ///
    /// An invalid expression falls back to the unfiltered dataset and leaves
    /// an error message for the sidebar.
    pub fn apply_filter_text(&mut self) {
        let Some(dataset) = self.dataset().cloned() else {
            return;
        };
        let expression = self.filter_text.trim().to_string();
        match apply_filter(&dataset, &expression) {
            Ok(view) => {
                log::info!("Filter `{expression}` matched {} rows", view.len());
                self.filter_status = if expression.is_empty() {
                    None
                } else {
                    Some(FilterStatus::Applied {
                        matched: view.len(),
                    })
                };
                self.applied_filter = expression;
                self.view = Some(view);
            }
            Err(e) => {
                log::warn!("Invalid filter: {e}");
                self.filter_status = Some(FilterStatus::Invalid(format!("Invalid filter: {e}")));
                self.applied_filter.clear();
                self.view = Some(FilteredView::all(dataset));
            }
        }
        self.recompute();
    }

    /// Drop the filter and show every row again.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.apply_filter_text();
    }

    pub fn set_category_column(&mut self, column: String) {
        self.category_column = Some(column);
        self.recompute();
    }

    pub fn set_numeric_column(&mut self, column: String) {
        self.numeric_column = Some(column);
        self.recompute();
    }

    /// Recompute metrics and chart data from the current view and selections.
    pub fn recompute(&mut self) {
        self.summary = None;
        self.groups.clear();
        self.scatter.clear();
        self.chart_error = None;

        let Some(view) = &self.view else {
            return;
        };
        let Some(numeric) = self.numeric_column.as_deref() else {
            self.summary = Some(Err(SummaryComputationError::NoNumericColumn));
            return;
        };

        let summary = compute_summary(view, numeric);
        if let Err(e) = &summary {
            log::warn!("Error calculating insights: {e}");
        }
        self.summary = Some(summary);

        let Some(category) = self.category_column.as_deref() else {
            self.chart_error = Some("Select a category column to draw charts.".to_string());
            return;
        };

        let charts = group_and_sum(view, category, numeric)
            .and_then(|groups| Ok((groups, scatter_points(view, category, numeric)?)));
        match charts {
            Ok((groups, scatter)) => {
                self.colors = CategoryColors::new(groups.iter().map(|(k, _)| k));
                self.groups = groups;
                self.scatter = scatter;
            }
            Err(e) => {
                log::warn!("Error preparing charts: {e}");
                self.chart_error = Some(e.to_string());
            }
        }
        log::debug!(
            "Recomputed: {} rows, {} groups, {} scatter points",
            view.len(),
            self.groups.len(),
            self.scatter.len()
        );
    }

    /// Write the current view to `path` as CSV.
    pub fn export_to(&mut self, path: &Path) {
        let Some(view) = &self.view else {
            return;
        };
        match crate::data::export::export_csv(view, path) {
            Ok(rows) => {
                self.status_message = Some(format!("Exported {rows} rows to {}", path.display()));
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Rows in the current view, and in the whole dataset.
    pub fn row_counts(&self) -> Option<(usize, usize)> {
        self.view.as_ref().map(|v| (v.len(), v.dataset().len()))
    }
}
