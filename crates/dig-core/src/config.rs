//! Adapter-wide tuning of the DIG backends

use serde::{Deserialize, Serialize};

/// DIG output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigConfig {
    /// Pixel clock above which a dual-link DVI connector runs both links (kHz)
    pub dual_link_threshold_khz: u32,
    /// Maximum number of LVDS power sequencer status polls
    pub pwrseq_poll_iterations: u32,
    /// Wait before each power sequencer status poll (microseconds)
    pub pwrseq_poll_interval_us: u32,
    /// Firmware data table holding the transmitter electrical settings
    pub golden_settings_table: u8,
}

impl Default for DigConfig {
    fn default() -> Self {
        Self {
            dual_link_threshold_khz: 165_000,
            pwrseq_poll_iterations: 500,
            pwrseq_poll_interval_us: 1000,
            golden_settings_table: dig_hw::regs::GOLDEN_SETTINGS_TABLE,
        }
    }
}

impl DigConfig {
    /// Whether a mode at `clock_khz` needs both links
    pub fn needs_dual_link(&self, clock_khz: u32) -> bool {
        clock_khz > self.dual_link_threshold_khz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DigConfig::default();
        assert_eq!(config.dual_link_threshold_khz, 165_000);
        assert_eq!(config.pwrseq_poll_iterations, 500);
        assert_eq!(config.pwrseq_poll_interval_us, 1000);
        assert_eq!(config.golden_settings_table, 0x4d);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let config = DigConfig::default();
        assert!(!config.needs_dual_link(165_000));
        assert!(config.needs_dual_link(165_001));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DigConfig = serde_json::from_str(r#"{"pwrseq_poll_iterations": 3}"#).unwrap();
        assert_eq!(config.pwrseq_poll_iterations, 3);
        assert_eq!(config.dual_link_threshold_khz, 165_000);
    }
}
