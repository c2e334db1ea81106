//! Test data builders for creating configs

use freqmeter_rs::config::{AppConfig, SerialConfig};
use freqmeter_rs::types::Multiplier;

/// Port name accepted by the fake opener
pub const FAKE_PORT: &str = "/dev/ttyFAKE0";

/// Builder for application configs pointing at the fake port
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.serial = SerialConfig::new(FAKE_PORT, 57600);
        config.serial.timeout_ms = 20;
        Self { config }
    }

    pub fn autorange(mut self, on: bool) -> Self {
        self.config.display.autorange = on;
        self
    }

    pub fn multiplier(mut self, factor: u32) -> Self {
        self.config.display.multiplier =
            Multiplier::from_factor(factor).expect("factor must be a power of two");
        self
    }

    pub fn filter_script(mut self, source: &str) -> Self {
        self.config.display.filter = true;
        self.config.filter.script = Some(source.to_string());
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new().multiplier(8).autorange(false).build();
        assert_eq!(config.serial.port, FAKE_PORT);
        assert_eq!(config.display.multiplier.factor(), 8);
        assert!(!config.display.autorange);
        assert!(config.serial.validate().is_ok());
    }
}
