use eframe::egui::{self, Align, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::Value;
use crate::state::AppState;

/// Render the rows of the current view. Only visible rows are laid out, so
/// large datasets stay responsive.
pub fn filtered_table(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else {
        return;
    };
    let dataset = view.dataset();
    let row_height = state.config.table_row_height;

    ui.label(format!("{} of {} rows", view.len(), dataset.len()));

    egui::ScrollArea::horizontal()
        .id_salt("table_hscroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(420.0)
                .cell_layout(Layout::left_to_right(Align::Center))
                .column(Column::auto().at_least(40.0))
                .columns(Column::auto().at_least(80.0).clip(true), dataset.columns.len())
                .header(row_height, |mut header| {
                    header.col(|ui: &mut Ui| {
                        ui.strong("#");
                    });
                    for col in &dataset.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(&col.name).on_hover_text(col.dtype.to_string());
                        });
                    }
                })
                .body(|body| {
                    body.rows(row_height, view.len(), |mut row| {
                        let n = row.index();
                        let Some(cells) = view.row(n) else {
                            return;
                        };
                        let source_index = view.indices()[n];
                        row.col(|ui: &mut Ui| {
                            ui.label(RichText::new(source_index.to_string()).weak());
                        });
                        for cell in cells {
                            row.col(|ui: &mut Ui| {
                                cell_label(ui, cell);
                            });
                        }
                    });
                });
        });
}

fn cell_label(ui: &mut Ui, value: &Value) {
    match value {
        Value::Null => {
            ui.label(RichText::new("—").weak());
        }
        Value::Integer(_) | Value::Float(_) => {
            ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                ui.monospace(value.to_string());
            });
        }
        other => {
            ui.label(other.to_string());
        }
    }
}
