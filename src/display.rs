//! Display controller: turns incoming samples into the displayed reading
//!
//! For every sample delivered by the line reader, [`DisplayController::process`]
//! decides what the frequency and period readouts show and whether the
//! graph receives the sample:
//!
//! 1. The failure sentinel only flips the link status to "no data".
//! 2. The multiplier is applied, then the filter when enabled. The result
//!    is the *effective* frequency in Hz.
//! 3. With autoranging the effective value is scaled to Hz, kHz or MHz at
//!    the half-open thresholds 1e3 and 1e6; the period unit follows.
//! 4. The period is `1 / converted`, or `"0"` for a zero reading.
//! 5. While holding, the reading is computed but the readouts and the graph
//!    stay frozen. Otherwise both are updated; the graph gets the effective
//!    frequency, not the unit-scaled value.

use crate::config::DisplayConfig;
use crate::filter::SampleFilter;
use crate::graph::GraphSink;
use crate::types::{is_failure, AcquisitionStats, FrequencyUnit, Multiplier, PeriodUnit, Sample};

/// Operator toggles consulted for every sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayState {
    /// Freeze the readouts and the graph
    pub hold: bool,
    /// Pick Hz/kHz/MHz automatically
    pub autorange: bool,
    /// Route samples through the filter
    pub filter_enabled: bool,
    /// External prescaler factor
    pub multiplier: Multiplier,
    /// Serial port is open
    pub connection_open: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::from_config(&DisplayConfig::default())
    }
}

impl DisplayState {
    /// Initial toggles from the config file
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            hold: false,
            autorange: config.autorange,
            filter_enabled: config.filter,
            multiplier: config.multiplier,
            connection_open: false,
        }
    }
}

/// What the readouts show
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayReading {
    /// Value in `unit`
    pub value: f64,
    /// Value with three decimals
    pub value_text: String,
    pub unit: FrequencyUnit,
    /// Period with six decimals, or "0"
    pub period_text: String,
    pub period_unit: PeriodUnit,
}

impl Default for DisplayReading {
    fn default() -> Self {
        Self {
            value: 0.0,
            value_text: "0".to_string(),
            unit: FrequencyUnit::Hz,
            period_text: "0".to_string(),
            period_unit: PeriodUnit::Seconds,
        }
    }
}

impl DisplayReading {
    /// Build the reading for an effective frequency in Hz
    pub fn compute(effective: Sample, autorange: bool) -> Self {
        let unit = select_unit(effective, autorange);
        let value = effective / unit.divisor();
        Self {
            value,
            value_text: format!("{:.3}", value),
            unit,
            period_text: format_period(value),
            period_unit: unit.period_unit(),
        }
    }
}

/// Pick the display unit for a frequency in Hz
pub fn select_unit(hz: Sample, autorange: bool) -> FrequencyUnit {
    if !autorange {
        FrequencyUnit::Hz
    } else if hz >= 1_000_000.0 {
        FrequencyUnit::MHz
    } else if hz >= 1_000.0 {
        FrequencyUnit::KHz
    } else {
        FrequencyUnit::Hz
    }
}

/// Format the period of a unit-scaled frequency
pub fn format_period(converted: f64) -> String {
    if converted != 0.0 {
        format!("{:.6}", 1.0 / converted)
    } else {
        "0".to_string()
    }
}

/// Link health derived from the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    /// Nothing received yet
    #[default]
    Waiting,
    /// Last sample was valid
    Receiving,
    /// Last sample was the failure sentinel
    NoData,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Waiting => write!(f, "Waiting for data"),
            LinkStatus::Receiving => write!(f, "Receiving data"),
            LinkStatus::NoData => write!(f, "No data"),
        }
    }
}

/// Result of processing one sample
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutcome {
    /// Failure sentinel, nothing changed
    NoData,
    /// Reading computed but not shown because hold is active
    Held(DisplayReading),
    /// Readouts updated and effective frequency pushed to the graph
    Updated { effective: Sample },
}

/// Sample sink feeding the readouts and the graph
#[derive(Debug, Clone, Default)]
pub struct DisplayController {
    displayed: DisplayReading,
    last_computed: Option<DisplayReading>,
    link_status: LinkStatus,
    stats: AcquisitionStats,
}

impl DisplayController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one sample. Never fails.
    pub fn process<F, G>(
        &mut self,
        sample: Sample,
        state: &DisplayState,
        filter: &mut F,
        graph: &mut G,
    ) -> SinkOutcome
    where
        F: SampleFilter + ?Sized,
        G: GraphSink + ?Sized,
    {
        self.stats.record(sample);

        if is_failure(sample) {
            self.link_status = LinkStatus::NoData;
            return SinkOutcome::NoData;
        }
        self.link_status = LinkStatus::Receiving;

        let scaled = state.multiplier.apply(sample);
        let effective = if state.filter_enabled {
            filter.apply(scaled)
        } else {
            scaled
        };

        let reading = DisplayReading::compute(effective, state.autorange);
        self.last_computed = Some(reading.clone());

        if state.hold {
            tracing::trace!("Holding display, discarded {} Hz", effective);
            return SinkOutcome::Held(reading);
        }

        self.displayed = reading;
        graph.update(effective);
        SinkOutcome::Updated { effective }
    }

    /// Reading currently shown
    pub fn displayed(&self) -> &DisplayReading {
        &self.displayed
    }

    /// Most recent reading, shown or not
    pub fn last_computed(&self) -> Option<&DisplayReading> {
        self.last_computed.as_ref()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link_status
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    /// Reset status and counters for a new connection; the readouts keep
    /// their last values
    pub fn reset_link(&mut self) {
        self.link_status = LinkStatus::Waiting;
        self.stats.reset();
    }
}
