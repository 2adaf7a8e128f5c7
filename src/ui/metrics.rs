use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::stats::format_metric;
use crate::state::AppState;

/// Four metric cards (total, average, max, min) for the numeric column.
pub fn key_insights(ui: &mut Ui, state: &AppState) {
    let numeric = state.numeric_column.as_deref().unwrap_or_default();
    match &state.summary {
        None => {}
        Some(Err(e)) => {
            ui.colored_label(Color32::RED, format!("Error calculating insights: {e}"));
        }
        Some(Ok(summary)) => {
            let cards = [
                (format!("Total {numeric}"), summary.sum),
                (format!("Average {numeric}"), summary.mean),
                (format!("Max {numeric}"), summary.max),
                (format!("Min {numeric}"), summary.min),
            ];
            ui.columns(cards.len(), |columns: &mut [Ui]| {
                for (ui, (label, value)) in columns.iter_mut().zip(cards) {
                    metric_card(ui, &label, value);
                }
            });
        }
    }
}

fn metric_card(ui: &mut Ui, label: &str, value: f64) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(label).weak());
        ui.label(RichText::new(format_metric(value)).size(24.0).strong());
    });
}
