use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};
use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, Pos2, RichText, Sense, Shape, Stroke, Ui, vec2};
use egui_plot::{Bar, BarChart, GridMark, Legend, Plot, PlotPoints, Points};

use crate::data::model::Value;
use crate::data::stats::format_metric;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Visualizations (central panel)
// ---------------------------------------------------------------------------

/// Render the bar, pie and scatter charts for the current selection.
pub fn visualizations(ui: &mut Ui, state: &AppState) {
    if let Some(err) = &state.chart_error {
        ui.colored_label(Color32::RED, err);
        return;
    }
    let (Some(category), Some(numeric)) = (
        state.category_column.as_deref(),
        state.numeric_column.as_deref(),
    ) else {
        ui.label("Select a category and a numerical column to draw charts.");
        return;
    };
    if state.groups.is_empty() {
        ui.colored_label(
            Color32::from_rgb(230, 160, 0),
            "No data available for the selected filters.",
        );
        return;
    }

    let height = state.config.chart_height;

    ui.label(RichText::new(format!("Bar Chart: {numeric} by {category}")).strong());
    bar_chart(ui, state, category, numeric, height);
    ui.add_space(12.0);

    ui.label(
        RichText::new(format!("Pie Chart: {numeric} Distribution by {category}")).strong(),
    );
    pie_chart(ui, state, height);
    ui.add_space(12.0);

    ui.label(RichText::new(format!("Scatter Plot: {numeric} vs {category}")).strong());
    scatter_plot(ui, state, category, numeric, height);
}

/// X-axis labels for categorical charts: category `i` sits at `x = i`.
fn category_axis(
    labels: Vec<String>,
) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String + 'static {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let x = mark.value;
        if x < 0.0 || (x - x.round()).abs() > 1e-6 {
            return String::new();
        }
        labels.get(x.round() as usize).cloned().unwrap_or_default()
    }
}

fn labels(groups: &[(Value, f64)]) -> Vec<String> {
    groups.iter().map(|(k, _)| k.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Bar chart
// ---------------------------------------------------------------------------

fn bar_chart(ui: &mut Ui, state: &AppState, category: &str, numeric: &str, height: f32) {
    let bars: Vec<Bar> = state
        .groups
        .iter()
        .enumerate()
        .map(|(i, (k, v))| {
            Bar::new(i as f64, *v)
                .name(k.to_string())
                .fill(state.colors.color_for(k))
                .width(0.7)
        })
        .collect();

    Plot::new("bar_chart")
        .height(height)
        .x_axis_label(category)
        .y_axis_label(numeric)
        .x_axis_formatter(category_axis(labels(&state.groups)))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(numeric));
        });
}

// ---------------------------------------------------------------------------
// Pie chart (egui_plot has none, so it is painted directly)
// ---------------------------------------------------------------------------

fn pie_chart(ui: &mut Ui, state: &AppState, height: f32) {
    // negative sums have no meaningful slice
    let total: f64 = state.groups.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        ui.label("Nothing to show: all group totals are zero or negative.");
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        let (response, painter) = ui.allocate_painter(vec2(height, height), Sense::hover());
        let center = response.rect.center();
        let radius = response.rect.width().min(response.rect.height()) * 0.45;
        let separator = Stroke::new(1.0, ui.visuals().panel_fill);

        let hover_angle = response.hover_pos().and_then(|pos| {
            let d = pos - center;
            (d.length() <= radius).then(|| (d.y.atan2(d.x) + FRAC_PI_2).rem_euclid(TAU))
        });

        let mut start = 0.0f32;
        let mut hovered = None;
        for (k, v) in &state.groups {
            if *v <= 0.0 {
                continue;
            }
            let share = *v / total;
            let sweep = share as f32 * TAU;
            draw_slice(&painter, center, radius, start, sweep, state.colors.color_for(k));
            painter.line_segment([center, on_circle(center, radius, start)], separator);
            if hover_angle.is_some_and(|a| a >= start && a < start + sweep) {
                hovered = Some(format!("{k}: {} ({:.1}%)", format_metric(*v), share * 100.0));
            }
            start += sweep;
        }
        if let Some(text) = hovered {
            response.on_hover_text(text);
        }

        ui.vertical(|ui: &mut Ui| {
            for (k, v) in &state.groups {
                ui.horizontal(|ui: &mut Ui| {
                    let (swatch, painter) = ui.allocate_painter(vec2(12.0, 12.0), Sense::hover());
                    painter.rect_filled(swatch.rect, 2.0, state.colors.color_for(k));
                    let pct = v.max(0.0) / total * 100.0;
                    ui.label(format!("{k}: {} ({pct:.1}%)", format_metric(*v)));
                });
            }
        });
    });
}

/// Point on the circle at `angle`, measured clockwise from 12 o'clock.
fn on_circle(center: Pos2, radius: f32, angle: f32) -> Pos2 {
    let a = angle - FRAC_PI_2;
    center + radius * vec2(a.cos(), a.sin())
}

/// Paint a pie slice as a fan of convex pieces, each at most 45° wide.
fn draw_slice(
    painter: &egui::Painter,
    center: Pos2,
    radius: f32,
    start: f32,
    sweep: f32,
    color: Color32,
) {
    let pieces = ((sweep / FRAC_PI_4).ceil() as usize).max(1);
    let step = sweep / pieces as f32;
    const SEGMENTS: usize = 8;
    for p in 0..pieces {
        let a0 = start + step * p as f32;
        let mut points = Vec::with_capacity(SEGMENTS + 2);
        points.push(center);
        for i in 0..=SEGMENTS {
            points.push(on_circle(center, radius, a0 + step * i as f32 / SEGMENTS as f32));
        }
        painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
    }
}

// ---------------------------------------------------------------------------
// Scatter plot
// ---------------------------------------------------------------------------

fn scatter_plot(ui: &mut Ui, state: &AppState, category: &str, numeric: &str, height: f32) {
    let position: BTreeMap<&Value, usize> = state
        .groups
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (k, i))
        .collect();

    let mut series: BTreeMap<usize, Vec<[f64; 2]>> = BTreeMap::new();
    for (k, y) in &state.scatter {
        if let Some(&x) = position.get(k) {
            series.entry(x).or_default().push([x as f64, *y]);
        }
    }

    Plot::new("scatter_plot")
        .height(height)
        .legend(Legend::default())
        .x_axis_label(category)
        .y_axis_label(numeric)
        .x_axis_formatter(category_axis(labels(&state.groups)))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (x, pts) in series {
                let (k, _) = &state.groups[x];
                let points: PlotPoints = pts.into_iter().collect();
                plot_ui.points(
                    Points::new(points)
                        .name(k.to_string())
                        .color(state.colors.color_for(k))
                        .radius(4.0),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_axis_labels_integer_marks_only() {
        let fmt = category_axis(vec!["A".into(), "B".into()]);
        let mark = |value| GridMark {
            value,
            step_size: 1.0,
        };
        assert_eq!(fmt(mark(0.0), &(0.0..=1.0)), "A");
        assert_eq!(fmt(mark(1.0), &(0.0..=1.0)), "B");
        assert_eq!(fmt(mark(0.5), &(0.0..=1.0)), "");
        assert_eq!(fmt(mark(2.0), &(0.0..=1.0)), "");
        assert_eq!(fmt(mark(-1.0), &(0.0..=1.0)), "");
    }

    #[test]
    fn slice_points_start_at_twelve_o_clock() {
        let c = Pos2::new(10.0, 10.0);
        let top = on_circle(c, 5.0, 0.0);
        assert!((top.x - 10.0).abs() < 1e-4);
        assert!((top.y - 5.0).abs() < 1e-4);
        let right = on_circle(c, 5.0, FRAC_PI_2);
        assert!((right.x - 15.0).abs() < 1e-4);
    }
}
