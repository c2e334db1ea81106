//! Core data types for the frequency meter
//!
//! This module contains the small value types shared by the acquisition
//! backend, the display controller and the frontend.
//!
//! # Main Types
//!
//! - [`FAILURE_SAMPLE`] - In-band sentinel for "no valid measurement"
//! - [`ConnectionStatus`] - Serial connection state machine states
//! - [`SamplingSpeed`] - Fast/slow gate time of the counter firmware
//! - [`Multiplier`] - Power-of-two external prescaler factor
//! - [`FrequencyUnit`] / [`PeriodUnit`] - Display units chosen by autoranging
//! - [`AcquisitionStats`] - Running counters shown in the status bar

use serde::{Deserialize, Serialize};

/// A single frequency measurement in Hz.
pub type Sample = f64;

/// Sample value emitted for lines that could not be decoded or parsed.
pub const FAILURE_SAMPLE: Sample = -1.0;

/// Check whether a sample is the failure sentinel
pub fn is_failure(sample: Sample) -> bool {
    sample == FAILURE_SAMPLE
}

/// Connection status of the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Port closed
    #[default]
    Disconnected,
    /// Port open in progress
    Connecting,
    /// Port open and reader running
    Connected,
    /// Last connection attempt failed
    Error,
}

impl ConnectionStatus {
    /// Whether the port is currently open
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Sampling mode of the counter firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingSpeed {
    /// Short gate time, ten readings per second
    Fast,
    /// Long gate time, one reading per second
    #[default]
    Slow,
}

impl SamplingSpeed {
    /// Mode switch command understood by the firmware
    pub fn command(&self) -> &'static [u8] {
        match self {
            SamplingSpeed::Fast => b"f\n",
            SamplingSpeed::Slow => b"s\n",
        }
    }
}

impl std::fmt::Display for SamplingSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingSpeed::Fast => write!(f, "Fast"),
            SamplingSpeed::Slow => write!(f, "Slow"),
        }
    }
}

/// External frequency divider factor, a power of two from x1 to x256.
///
/// Stored as the exponent so that only valid factors can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Multiplier(u8);

impl Multiplier {
    /// Highest supported exponent (x256)
    pub const MAX_EXPONENT: u8 = 8;

    /// Multiplier of one (no prescaler)
    pub const ONE: Multiplier = Multiplier(0);

    /// Build from the exponent (index in the x1..x256 list)
    pub fn from_exponent(exponent: u8) -> Option<Self> {
        (exponent <= Self::MAX_EXPONENT).then_some(Self(exponent))
    }

    /// Build from the factor itself (1, 2, 4 ... 256)
    pub fn from_factor(factor: u32) -> Option<Self> {
        if factor.is_power_of_two() {
            Self::from_exponent(factor.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// All selectable multipliers in ascending order
    pub fn all() -> impl Iterator<Item = Multiplier> {
        (0..=Self::MAX_EXPONENT).map(Multiplier)
    }

    /// Exponent of two
    pub fn exponent(&self) -> u8 {
        self.0
    }

    /// Integer factor
    pub fn factor(&self) -> u32 {
        1u32 << self.0
    }

    /// Apply the factor to a measured sample
    pub fn apply(&self, sample: Sample) -> Sample {
        sample * self.factor() as f64
    }
}

impl TryFrom<u32> for Multiplier {
    type Error = String;

    fn try_from(factor: u32) -> std::result::Result<Self, Self::Error> {
        Multiplier::from_factor(factor)
            .ok_or_else(|| format!("multiplier must be a power of two between 1 and 256, got {factor}"))
    }
}

impl From<Multiplier> for u32 {
    fn from(m: Multiplier) -> Self {
        m.factor()
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.factor())
    }
}

/// Unit of the displayed frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    #[default]
    Hz,
    KHz,
    MHz,
}

impl FrequencyUnit {
    /// Divisor that maps a value in Hz onto this unit
    pub fn divisor(&self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1_000.0,
            FrequencyUnit::MHz => 1_000_000.0,
        }
    }

    /// Matching period unit (reciprocal scale)
    pub fn period_unit(&self) -> PeriodUnit {
        match self {
            FrequencyUnit::Hz => PeriodUnit::Seconds,
            FrequencyUnit::KHz => PeriodUnit::Milliseconds,
            FrequencyUnit::MHz => PeriodUnit::Microseconds,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            FrequencyUnit::Hz => "Hz",
            FrequencyUnit::KHz => "kHz",
            FrequencyUnit::MHz => "MHz",
        }
    }
}

impl std::fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Unit of the displayed period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodUnit {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
}

impl PeriodUnit {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            PeriodUnit::Seconds => "s",
            PeriodUnit::Milliseconds => "ms",
            PeriodUnit::Microseconds => "µs",
        }
    }
}

impl std::fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Running acquisition counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionStats {
    /// Number of valid samples received
    pub valid_samples: u64,
    /// Number of failure sentinels received
    pub failed_samples: u64,
    /// Last valid sample before multiplier and filter
    pub last_raw: Option<Sample>,
}

impl AcquisitionStats {
    /// Account for one incoming sample
    pub fn record(&mut self, sample: Sample) {
        if is_failure(sample) {
            self.failed_samples += 1;
        } else {
            self.valid_samples += 1;
            self.last_raw = Some(sample);
        }
    }

    /// Percentage of samples that were valid
    pub fn success_rate(&self) -> f64 {
        let total = self.valid_samples + self.failed_samples;
        if total == 0 {
            100.0
        } else {
            (self.valid_samples as f64 / total as f64) * 100.0
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_sentinel() {
        assert!(is_failure(-1.0));
        assert!(!is_failure(-1.5));
        assert!(!is_failure(0.0));
    }

    #[test]
    fn test_multiplier_factors() {
        let factors: Vec<u32> = Multiplier::all().map(|m| m.factor()).collect();
        assert_eq!(factors, vec![1, 2, 4, 8, 16, 32, 64, 128, 256]);
        assert_eq!(Multiplier::default(), Multiplier::ONE);
    }

    #[test]
    fn test_multiplier_from_factor() {
        assert_eq!(Multiplier::from_factor(16).map(|m| m.exponent()), Some(4));
        assert!(Multiplier::from_factor(3).is_none());
        assert!(Multiplier::from_factor(512).is_none());
        assert!(Multiplier::from_factor(0).is_none());
        assert!(Multiplier::from_exponent(9).is_none());
    }

    #[test]
    fn test_multiplier_apply_and_display() {
        let m = Multiplier::from_exponent(3).unwrap();
        assert_eq!(m.apply(125.0), 1000.0);
        assert_eq!(m.to_string(), "x8");
    }

    #[test]
    fn test_speed_commands() {
        assert_eq!(SamplingSpeed::Fast.command(), b"f\n");
        assert_eq!(SamplingSpeed::Slow.command(), b"s\n");
    }

    #[test]
    fn test_unit_period_pairs() {
        assert_eq!(FrequencyUnit::Hz.period_unit(), PeriodUnit::Seconds);
        assert_eq!(FrequencyUnit::KHz.period_unit(), PeriodUnit::Milliseconds);
        assert_eq!(FrequencyUnit::MHz.period_unit(), PeriodUnit::Microseconds);
        assert_eq!(PeriodUnit::Microseconds.to_string(), "µs");
    }

    #[test]
    fn test_stats_record() {
        let mut stats = AcquisitionStats::default();
        stats.record(50.0);
        stats.record(FAILURE_SAMPLE);
        stats.record(60.0);
        assert_eq!(stats.valid_samples, 2);
        assert_eq!(stats.failed_samples, 1);
        assert_eq!(stats.last_raw, Some(60.0));
        assert!((stats.success_rate() - 66.666).abs() < 0.01);

        stats.reset();
        assert_eq!(stats, AcquisitionStats::default());
        assert_eq!(stats.success_rate(), 100.0);
    }
}
