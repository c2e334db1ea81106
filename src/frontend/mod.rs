//! Frontend module for egui UI
//!
//! The window is a thin shell around [`MeterSession`]: every frame it drains
//! the reader channel through [`MeterSession::pump`], renders the readouts,
//! the controls and the graph, and applies the [`UiAction`]s the panels
//! produced.
//!
//! # Main Types
//!
//! - [`FreqMeterApp`] - Main application state implementing [`eframe::App`]
//!
//! # Submodules
//!
//! - `panels` - Connection, settings, controls, readout and filter editor
//! - `plot` - Graph rendering with egui_plot
//! - `status_bar` - Bottom status bar

mod panels;
mod plot;
mod status_bar;

pub use panels::{FilterEditorState, UiAction};

use crate::app::MeterSession;
use crate::backend::{available_ports, PortEntry};
use crate::config::{AppConfig, SerialConfig};
use panels::{ConnectionPanel, ControlsPanel, FilterEditor, ReadoutPanel, SerialSettingsPanel};
use status_bar::{render_status_bar, StatusBarContext};
use std::time::Duration;

/// The graph and its menu toggle are only available while connected
fn graph_visible(show_graph: bool, connection_open: bool) -> bool {
    show_graph && connection_open
}

/// Main application state for the frequency meter window
pub struct FreqMeterApp {
    session: MeterSession,
    /// Serial settings being edited; applied on "Apply"
    serial_draft: SerialConfig,
    ports: Vec<PortEntry>,
    filter_editor: FilterEditorState,
    show_settings: bool,
    show_graph: bool,
    show_filter_editor: bool,
    /// Error shown in a modal window until dismissed
    error_dialog: Option<String>,
}

impl FreqMeterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let session = MeterSession::system(&config);
        let ports = available_ports();

        let mut serial_draft = config.serial.clone();
        if serial_draft.port.is_empty() {
            if let Some(first) = ports.first() {
                serial_draft.port = first.port_name.clone();
            }
        }

        let mut filter_editor = FilterEditorState::default();
        if let Ok(Some(source)) = config.filter.source() {
            filter_editor.name = crate::app::CONFIG_FILTER_NAME.to_string();
            filter_editor.source = source;
        }

        Self {
            show_settings: !session.acquisition.can_connect(),
            session,
            serial_draft,
            ports,
            filter_editor,
            show_graph: true,
            show_filter_editor: false,
            error_dialog: None,
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        tracing::debug!("UI action: {:?}", action);
        match action {
            UiAction::Connect => {
                self.session.connect();
                if self.session.acquisition.is_connected() {
                    self.show_settings = false;
                }
            }
            UiAction::Disconnect => self.session.disconnect(),
            UiAction::RescanPorts => self.ports = available_ports(),
            UiAction::ApplySerialSettings => {
                self.session.apply_serial_config(self.serial_draft.clone());
            }
            UiAction::SetSpeed(speed) => self.session.set_speed(speed),
            UiAction::CheckFilter => {
                let name = self.filter_editor.filter_name();
                self.filter_editor.status = Some(
                    self.session
                        .filter
                        .check_script(&name, &self.filter_editor.source)
                        .map_err(|e| e.to_string()),
                );
            }
            UiAction::InstallFilter => {
                let name = self.filter_editor.filter_name();
                if self.session.install_filter(&name, &self.filter_editor.source) {
                    self.filter_editor.status = Some(Ok(()));
                }
            }
            UiAction::ClearFilter => self.session.filter.clear(),
        }
    }

    fn render_error_dialog(&mut self, ctx: &egui::Context) {
        if let Some(notice) = self.session.take_notice() {
            self.error_dialog = Some(notice);
        }
        let Some(message) = self.error_dialog.clone() else {
            return;
        };

        let mut open = true;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(message.as_str());
                if ui.button("OK").clicked() {
                    self.error_dialog = None;
                }
            });
        if !open {
            self.error_dialog = None;
        }
    }
}

impl eframe::App for FreqMeterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let handled = self.session.pump();
        if self.session.acquisition.is_connected() || handled > 0 {
            // Slow mode sends one line per second; poll the channel regularly
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        let mut actions = Vec::new();

        // Menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("View", |ui| {
                    if ui.checkbox(&mut self.show_settings, "Serial settings").clicked() {
                        ui.close();
                    }
                    let connected = self.session.state.connection_open;
                    if ui
                        .add_enabled(connected, egui::Checkbox::new(&mut self.show_graph, "Graph"))
                        .clicked()
                    {
                        ui.close();
                    }
                    if ui.checkbox(&mut self.show_filter_editor, "Filter editor").clicked() {
                        ui.close();
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ConnectionPanel::render(
                        ui,
                        self.session.status(),
                        self.session.acquisition.can_connect(),
                        &mut actions,
                    );
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let port = self.session.acquisition.port_name();
            let status_ctx = StatusBarContext {
                status: self.session.status(),
                port: port.as_deref(),
                link: self.session.display.link_status(),
                stats: self.session.display.stats(),
                speed: self.session.acquisition.speed(),
                filter_name: self.session.filter.name(),
                last_error: self.session.acquisition.last_error(),
            };
            render_status_bar(ui, &status_ctx);
        });

        if self.show_settings {
            egui::SidePanel::left("serial_settings")
                .resizable(false)
                .show(ctx, |ui| {
                    ui.heading("Serial settings");
                    ui.separator();
                    SerialSettingsPanel::render(
                        ui,
                        &mut self.serial_draft,
                        &self.ports,
                        self.session.acquisition.is_connected(),
                        &mut actions,
                    );
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ControlsPanel::render(ui, &mut self.session.state, self.session.speed, &mut actions);
            ui.separator();

            ReadoutPanel::render(
                ui,
                self.session.display.displayed(),
                self.session.display.link_status(),
                self.session.state.hold,
            );

            if self.show_filter_editor {
                ui.separator();
                egui::CollapsingHeader::new("Filter script")
                    .default_open(true)
                    .show(ui, |ui| {
                        FilterEditor::render(
                            ui,
                            &mut self.filter_editor,
                            self.session.filter.name(),
                            &mut actions,
                        );
                    });
            }

            if graph_visible(self.show_graph, self.session.state.connection_open) {
                ui.separator();
                plot::render_graph_options(ui, &mut self.session.graph);
                plot::render_graph(ui, &self.session.graph);
            }
        });

        for action in actions {
            self.handle_action(action);
        }

        self.render_error_dialog(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.disconnect();
    }
}
