//! Status bar panel: bottom bar showing connection, link and sample counters.

use egui::{Color32, RichText, Ui};

use crate::display::LinkStatus;
use crate::types::{AcquisitionStats, ConnectionStatus, SamplingSpeed};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub status: ConnectionStatus,
    pub port: Option<&'a str>,
    pub link: LinkStatus,
    pub stats: &'a AcquisitionStats,
    pub speed: Option<SamplingSpeed>,
    pub filter_name: &'a str,
    pub last_error: Option<&'a str>,
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + port ===
        let status_color = match ctx.status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
            ConnectionStatus::Error => Color32::RED,
        };
        ui.colored_label(status_color, "●");
        let port_display = match ctx.port {
            Some(port) => format!("{}: {}", ctx.status, port),
            None => ctx.status.to_string(),
        };
        ui.label(RichText::new(port_display).small());

        if !ctx.status.is_open() {
            if let Some(error) = ctx.last_error {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.colored_label(Color32::RED, RichText::new(error).small());
                });
            }
            return;
        }

        ui.separator();

        // === Link health ===
        let link_color = match ctx.link {
            LinkStatus::Receiving => Color32::from_rgb(100, 255, 100),
            LinkStatus::Waiting => Color32::GRAY,
            LinkStatus::NoData => Color32::LIGHT_RED,
        };
        ui.colored_label(link_color, RichText::new(ctx.link.to_string()).small());

        ui.separator();

        if let Some(speed) = ctx.speed {
            ui.label(RichText::new(format!("Mode: {:?}", speed)).small());
            ui.separator();
        }

        // === Sample counters ===
        let stats = ctx.stats;
        ui.label(RichText::new(format!("Samples: {}", stats.valid_samples)).small());

        let error_color = if stats.failed_samples > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            error_color,
            RichText::new(format!("No data: {}", stats.failed_samples)).small(),
        );
        ui.label(RichText::new(format!("OK: {:.1}%", stats.success_rate())).small());

        ui.separator();

        ui.label(RichText::new(format!("Filter: {}", ctx.filter_name)).small());
    });
}
