use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, FilterStatus};

// ---------------------------------------------------------------------------
// Left side panel – column selectors and filter box
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match state.dataset() {
        Some(ds) => ds.clone(),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    let categories = dataset.categorical_columns();
    let numerics = dataset.numeric_columns();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column selectors ----
            ui.strong("Select a Category Column:");
            if let Some(col) = column_selector(
                ui,
                "category_column",
                state.category_column.as_deref(),
                &categories,
            ) {
                state.set_category_column(col);
            }
            ui.add_space(6.0);

            ui.strong("Select a Numerical Column:");
            if let Some(col) = column_selector(
                ui,
                "numeric_column",
                state.numeric_column.as_deref(),
                &numerics,
            ) {
                state.set_numeric_column(col);
            }
            ui.separator();

            // ---- Filter expression ----
            ui.strong("Apply Filter");
            ui.label(
                RichText::new("e.g. Sales > 5000 or Category == 'Electronics'")
                    .small()
                    .weak(),
            );
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.filter_text)
                    .hint_text("Sales > 5000")
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let mut apply = submitted;
            let mut clear = false;
            ui.horizontal(|ui: &mut Ui| {
                apply |= ui.button("Apply Filter").clicked();
                clear = ui
                    .add_enabled(!state.applied_filter.is_empty(), egui::Button::new("Clear"))
                    .clicked();
            });
            if clear {
                state.clear_filter();
            } else if apply {
                state.apply_filter_text();
            }

            match &state.filter_status {
                Some(FilterStatus::Applied { matched }) => {
                    ui.colored_label(
                        Color32::from_rgb(60, 170, 90),
                        format!("Filter applied successfully! ({matched} rows)"),
                    );
                }
                Some(FilterStatus::Invalid(msg)) => {
                    ui.colored_label(Color32::RED, msg);
                }
                None => {}
            }
            if !state.applied_filter.is_empty() {
                ui.label(
                    RichText::new(format!("Active: {}", state.applied_filter))
                        .monospace()
                        .small(),
                );
            }
            ui.separator();

            // ---- Column reference for writing expressions ----
            egui::CollapsingHeader::new(RichText::new("Columns").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    for col in &dataset.columns {
                        ui.horizontal(|ui: &mut Ui| {
                            ui.monospace(&col.name);
                            ui.label(RichText::new(col.dtype.to_string()).weak());
                        });
                    }
                });
        });
}

/// Combo box over `options`; returns the newly picked entry, if any.
fn column_selector(
    ui: &mut Ui,
    id: &str,
    current: Option<&str>,
    options: &[String],
) -> Option<String> {
    let mut picked = None;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.unwrap_or("(none)"))
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for opt in options {
                if ui
                    .selectable_label(current == Some(opt.as_str()), opt)
                    .clicked()
                {
                    picked = Some(opt.clone());
                }
            }
        });
    picked.filter(|p| current != Some(p.as_str()))
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.view.is_some(), egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some((visible, total)) = state.row_counts() {
            ui.label(format!("{total} rows loaded, {visible} visible"));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "parquet", "pq", "json", "csv"],
        )
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls", "ods"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Download Filtered Data as CSV")
        .set_file_name(state.config.export_file_name.clone())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_to(&path);
    }
}
