//! Live frequency graph
//!
//! Renders the [`FrequencyGraph`] history with egui_plot. The x axis is the
//! sample index inside the rolling window; the y axis is Hz, or `log10(Hz)`
//! with tick labels converted back when the logarithmic axis is enabled.

use crate::graph::{FrequencyGraph, GRAPH_CAPACITY};
use egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

const LINE_COLOR: Color32 = Color32::from_rgb(80, 160, 255);

/// Format a y tick, undoing the log transform if needed
fn y_tick_label(value: f64, log_y: bool) -> String {
    let hz = if log_y { 10f64.powf(value) } else { value };
    if hz.abs() >= 1_000_000.0 {
        format!("{:.2} MHz", hz / 1_000_000.0)
    } else if hz.abs() >= 1_000.0 {
        format!("{:.2} kHz", hz / 1_000.0)
    } else {
        format!("{:.1} Hz", hz)
    }
}

/// Graph options toolbar
pub fn render_graph_options(ui: &mut Ui, graph: &mut FrequencyGraph) {
    ui.horizontal(|ui| {
        ui.checkbox(&mut graph.options.x_grid, "X grid");
        ui.checkbox(&mut graph.options.y_grid, "Y grid");
        ui.checkbox(&mut graph.options.log_y, "Log Y");
        ui.separator();
        if ui.button("Clear").clicked() {
            graph.clear();
        }
        if let Some((lo, hi)) = graph.buffer().min_max() {
            ui.separator();
            ui.label(format!(
                "min {}  max {}",
                y_tick_label(lo, false),
                y_tick_label(hi, false)
            ));
        }
    });
}

/// Render the graph filling the available space
pub fn render_graph(ui: &mut Ui, graph: &FrequencyGraph) {
    let log_y = graph.options.log_y;
    let points = graph.plot_points();

    let plot = Plot::new("frequency_graph")
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show_axes(true)
        .show_grid([graph.options.x_grid, graph.options.y_grid])
        .x_axis_label("Sample")
        .y_axis_label(if log_y { "Frequency (log)" } else { "Frequency" })
        .y_axis_formatter(move |mark, _range| y_tick_label(mark.value, log_y));

    plot.show(ui, |plot_ui| {
        if points.is_empty() {
            return;
        }
        let (y_min, y_max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[1]), hi.max(p[1]))
            });
        let margin = ((y_max - y_min) * 0.1).max(if log_y { 0.1 } else { 1.0 });
        plot_ui.set_plot_bounds(PlotBounds::from_min_max(
            [0.0, y_min - margin],
            [(GRAPH_CAPACITY - 1) as f64, y_max + margin],
        ));
        plot_ui.line(
            Line::new("frequency", PlotPoints::from(points))
                .color(LINE_COLOR)
                .width(1.5),
        );
    });
}
