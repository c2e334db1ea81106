//! Panel components for the frontend UI
//!
//! Each panel renders one piece of the window and reports what the user
//! asked for as [`UiAction`]s; the app applies them after rendering.
//!
//! # Panels
//!
//! - [`ConnectionPanel`] - Status and connect/disconnect button
//! - [`SerialSettingsPanel`] - Port, baud rate and line framing
//! - [`ControlsPanel`] - Speed, hold, autorange, filter and multiplier
//! - [`ReadoutPanel`] - Frequency and period readouts
//! - [`FilterEditor`] - Rhai filter script editor with presets

use crate::backend::PortEntry;
use crate::config::{Parity, SerialConfig, BAUD_RATES};
use crate::display::{DisplayReading, DisplayState, LinkStatus};
use crate::scripting::presets;
use crate::types::{ConnectionStatus, Multiplier, SamplingSpeed};
use egui::{Color32, RichText, Ui};

/// Requests produced by the panels
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Connect,
    Disconnect,
    RescanPorts,
    ApplySerialSettings,
    SetSpeed(SamplingSpeed),
    CheckFilter,
    InstallFilter,
    ClearFilter,
}

/// Renders the connection status panel
pub struct ConnectionPanel;

impl ConnectionPanel {
    pub fn render(
        ui: &mut Ui,
        status: ConnectionStatus,
        can_connect: bool,
        actions: &mut Vec<UiAction>,
    ) {
        ui.horizontal(|ui| {
            let status_color = match status {
                ConnectionStatus::Disconnected => Color32::GRAY,
                ConnectionStatus::Connecting => Color32::YELLOW,
                ConnectionStatus::Connected => Color32::GREEN,
                ConnectionStatus::Error => Color32::RED,
            };
            ui.colored_label(status_color, format!("● {}", status));

            match status {
                ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                    let button = ui
                        .add_enabled(can_connect, egui::Button::new("🔌 Connect"))
                        .on_disabled_hover_text("Select a serial port first");
                    if button.clicked() {
                        actions.push(UiAction::Connect);
                    }
                }
                ConnectionStatus::Connecting => {
                    ui.add_enabled(false, egui::Button::new("⏳ Connecting..."));
                }
                ConnectionStatus::Connected => {
                    if ui.button("🔌 Disconnect").clicked() {
                        actions.push(UiAction::Disconnect);
                    }
                }
            }
        });
    }
}

/// Serial port settings form
pub struct SerialSettingsPanel;

impl SerialSettingsPanel {
    /// Render the form editing `draft`; disabled while connected
    pub fn render(
        ui: &mut Ui,
        draft: &mut SerialConfig,
        ports: &[PortEntry],
        connected: bool,
        actions: &mut Vec<UiAction>,
    ) {
        ui.add_enabled_ui(!connected, |ui| {
            egui::Grid::new("serial_settings_grid")
                .num_columns(2)
                .spacing([12.0, 6.0])
                .show(ui, |ui| {
                    ui.label("Port:");
                    ui.horizontal(|ui| {
                        let selected = ports
                            .iter()
                            .find(|p| p.port_name == draft.port)
                            .map(|p| p.display.clone())
                            .unwrap_or_else(|| draft.port.clone());
                        egui::ComboBox::from_id_salt("serial_port_selector")
                            .selected_text(selected)
                            .width(220.0)
                            .show_ui(ui, |ui| {
                                for port in ports {
                                    ui.selectable_value(
                                        &mut draft.port,
                                        port.port_name.clone(),
                                        port.display.as_str(),
                                    );
                                }
                            });
                        if ui.button("🔄").on_hover_text("Rescan ports").clicked() {
                            actions.push(UiAction::RescanPorts);
                        }
                    });
                    ui.end_row();

                    ui.label("Baud rate:");
                    egui::ComboBox::from_id_salt("serial_baud_selector")
                        .selected_text(draft.baud.to_string())
                        .show_ui(ui, |ui| {
                            for baud in BAUD_RATES {
                                ui.selectable_value(&mut draft.baud, baud, baud.to_string());
                            }
                        });
                    ui.end_row();

                    ui.label("Data bits:");
                    egui::ComboBox::from_id_salt("serial_data_bits")
                        .selected_text(draft.data_bits.to_string())
                        .show_ui(ui, |ui| {
                            for bits in 5..=8u8 {
                                ui.selectable_value(&mut draft.data_bits, bits, bits.to_string());
                            }
                        });
                    ui.end_row();

                    ui.label("Parity:");
                    egui::ComboBox::from_id_salt("serial_parity")
                        .selected_text(draft.parity.to_string())
                        .show_ui(ui, |ui| {
                            for parity in Parity::ALL {
                                ui.selectable_value(&mut draft.parity, parity, parity.to_string());
                            }
                        });
                    ui.end_row();

                    ui.label("Stop bits:");
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut draft.stop_bits, 1, "1");
                        ui.radio_value(&mut draft.stop_bits, 2, "2");
                    });
                    ui.end_row();

                    ui.label("Flow control:");
                    ui.horizontal(|ui| {
                        ui.checkbox(&mut draft.cts, "CTS");
                        ui.checkbox(&mut draft.dtr, "DTR");
                        ui.checkbox(&mut draft.xon, "XON");
                    });
                    ui.end_row();
                });

            ui.add_space(4.0);
            if ui.button("Apply").clicked() {
                draft.enabled = true;
                actions.push(UiAction::ApplySerialSettings);
            }
        });
    }
}

/// Acquisition and display toggles
pub struct ControlsPanel;

impl ControlsPanel {
    pub fn render(
        ui: &mut Ui,
        state: &mut DisplayState,
        speed: SamplingSpeed,
        actions: &mut Vec<UiAction>,
    ) {
        let connected = state.connection_open;
        ui.horizontal(|ui| {
            ui.add_enabled_ui(connected, |ui| {
                if ui.radio(speed == SamplingSpeed::Fast, "Fast").clicked() {
                    actions.push(UiAction::SetSpeed(SamplingSpeed::Fast));
                }
                if ui.radio(speed == SamplingSpeed::Slow, "Slow").clicked() {
                    actions.push(UiAction::SetSpeed(SamplingSpeed::Slow));
                }
                ui.separator();
                ui.checkbox(&mut state.hold, "Hold");
                ui.checkbox(&mut state.autorange, "Autorange");
            });

            ui.separator();
            ui.checkbox(&mut state.filter_enabled, "Filter");

            ui.separator();
            ui.label("Scale:");
            egui::ComboBox::from_id_salt("multiplier_selector")
                .selected_text(state.multiplier.to_string())
                .show_ui(ui, |ui| {
                    for multiplier in Multiplier::all() {
                        ui.selectable_value(
                            &mut state.multiplier,
                            multiplier,
                            multiplier.to_string(),
                        );
                    }
                });
        });
    }
}

/// Large frequency and period readouts
pub struct ReadoutPanel;

impl ReadoutPanel {
    pub fn render(ui: &mut Ui, reading: &DisplayReading, link: LinkStatus, hold: bool) {
        let value_color = match link {
            LinkStatus::NoData => Color32::LIGHT_RED,
            _ if hold => Color32::YELLOW,
            _ => ui.visuals().strong_text_color(),
        };

        ui.vertical_centered(|ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(&reading.value_text)
                        .size(56.0)
                        .monospace()
                        .color(value_color),
                );
                ui.label(RichText::new(reading.unit.label()).size(28.0));
            });
            ui.horizontal(|ui| {
                ui.label(RichText::new("Period").size(16.0).weak());
                ui.label(RichText::new(&reading.period_text).size(24.0).monospace());
                ui.label(RichText::new(reading.period_unit.label()).size(16.0));
            });
            if hold {
                ui.colored_label(Color32::YELLOW, "HOLD");
            }
        });
    }
}

/// Filter editor contents
#[derive(Debug, Clone)]
pub struct FilterEditorState {
    pub name: String,
    pub source: String,
    /// Outcome of the last validation, shown below the editor
    pub status: Option<Result<(), String>>,
}

impl FilterEditorState {
    /// Name to install the script under, `custom` when left blank
    pub fn filter_name(&self) -> String {
        match self.name.trim() {
            "" => "custom".to_string(),
            name => name.to_string(),
        }
    }
}

impl Default for FilterEditorState {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            source: presets::IDENTITY.trim_start().to_string(),
            status: None,
        }
    }
}

/// Plain-text Rhai filter editor
pub struct FilterEditor;

impl FilterEditor {
    pub fn render(
        ui: &mut Ui,
        state: &mut FilterEditorState,
        active_filter: &str,
        actions: &mut Vec<UiAction>,
    ) {
        ui.horizontal(|ui| {
            ui.label("Preset:");
            egui::ComboBox::from_id_salt("filter_preset_selector")
                .selected_text("Load preset...")
                .show_ui(ui, |ui| {
                    for (name, source) in presets::all() {
                        if ui.selectable_label(false, name).clicked() {
                            state.name = name.to_string();
                            state.source = source.trim_start().to_string();
                            state.status = None;
                        }
                    }
                });
            ui.separator();
            ui.label("Name:");
            ui.add(egui::TextEdit::singleline(&mut state.name).desired_width(140.0));
        });

        ui.label(
            RichText::new("`value` is the sample in Hz; return the filtered value.")
                .small()
                .weak(),
        );

        let editor = ui.add(
            egui::TextEdit::multiline(&mut state.source)
                .code_editor()
                .desired_rows(10)
                .desired_width(f32::INFINITY),
        );
        if editor.changed() {
            state.status = None;
        }

        ui.horizontal(|ui| {
            if ui.button("Check").clicked() {
                actions.push(UiAction::CheckFilter);
            }
            if ui.button("Install").clicked() {
                actions.push(UiAction::InstallFilter);
            }
            if ui.button("Reset to identity").clicked() {
                actions.push(UiAction::ClearFilter);
            }
            ui.separator();
            ui.label(format!("Active: {}", active_filter));
        });

        match &state.status {
            Some(Ok(())) => {
                ui.colored_label(Color32::GREEN, "✓ Script compiles");
            }
            Some(Err(e)) => {
                ui.colored_label(Color32::RED, e.as_str());
            }
            None => {}
        }
    }
}
