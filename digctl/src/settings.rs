//! Board description

use std::path::{Path, PathBuf};

use dig_core::DigConfig;
use dig_hw::{ConnectorType, DisplayMode, OutputId};
use dig_sim::SimFirmwareConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One output to bring up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputEntry {
    pub id: OutputId,
    pub connector: ConnectorType,
    /// CRTC feeding the output
    #[serde(default)]
    pub crtc: u8,
    pub clock_khz: u32,
    #[serde(default = "default_hdisplay")]
    pub hdisplay: u32,
    #[serde(default = "default_vdisplay")]
    pub vdisplay: u32,
}

fn default_hdisplay() -> u32 {
    1920
}

fn default_vdisplay() -> u32 {
    1080
}

impl OutputEntry {
    pub fn mode(&self) -> DisplayMode {
        DisplayMode::new(
            format!("{}x{}", self.hdisplay, self.vdisplay),
            self.clock_khz,
            self.hdisplay,
            self.vdisplay,
        )
    }
}

/// Simulated adapter and its outputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardConfig {
    #[serde(default)]
    pub adapter: DigConfig,
    /// Integrated chipset (UNIPHY runs as PCIE PHY)
    #[serde(default)]
    pub igp: bool,
    /// Firmware tables; `None` for a board without them
    #[serde(default)]
    pub firmware: Option<SimFirmwareConfig>,
    pub outputs: Vec<OutputEntry>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            adapter: DigConfig::default(),
            igp: false,
            firmware: Some(SimFirmwareConfig::default()),
            outputs: vec![
                OutputEntry {
                    id: OutputId::UniphyA,
                    connector: ConnectorType::Dvi,
                    crtc: 0,
                    clock_khz: 148_500,
                    hdisplay: 1920,
                    vdisplay: 1080,
                },
                OutputEntry {
                    id: OutputId::Lvtma,
                    connector: ConnectorType::Panel,
                    crtc: 1,
                    clock_khz: 71_000,
                    hdisplay: 1280,
                    vdisplay: 800,
                },
            ],
        }
    }
}

impl BoardConfig {
    /// $XDG_CONFIG_HOME/digctl, falling back to ~/.config/digctl
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("digctl"));
            }
        }
        dirs::home_dir().map(|h| h.join(".config").join("digctl"))
    }

    pub fn default_path() -> Result<PathBuf, SettingsError> {
        Self::config_dir()
            .map(|p| p.join("board.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load the board at the default path, or the built-in one if absent
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::info!("{} not found, using built-in board", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Firmware simulator config, serving golden settings under the adapter's table index
    pub fn firmware_config(&self) -> Option<SimFirmwareConfig> {
        self.firmware.clone().map(|mut config| {
            config.golden_table_index = self.adapter.golden_settings_table;
            config
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        // serializing plain data cannot fail
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        std::fs::write(path, json).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_board() {
        let board = BoardConfig::parse(
            r#"{ "outputs": [ { "id": "UniphyB", "connector": "DviSingle", "clock_khz": 108000 } ] }"#,
        )
        .unwrap();

        assert_eq!(board.adapter, DigConfig::default());
        assert!(!board.igp);
        assert!(board.firmware.is_none());
        assert_eq!(board.outputs[0].id, OutputId::UniphyB);
        assert_eq!(board.outputs[0].crtc, 0);
        assert_eq!(board.outputs[0].mode().name, "1920x1080");
    }

    #[test]
    fn test_parse_adapter_overrides() {
        let board = BoardConfig::parse(
            r#"{
                "adapter": { "pwrseq_poll_iterations": 20 },
                "igp": true,
                "firmware": { "golden_table_present": false },
                "outputs": []
            }"#,
        )
        .unwrap();

        assert_eq!(board.adapter.pwrseq_poll_iterations, 20);
        assert_eq!(board.adapter.dual_link_threshold_khz, 165_000);
        assert!(board.igp);
        assert!(!board.firmware.unwrap().golden_table_present);
    }

    #[test]
    fn test_firmware_follows_adapter_table_index() {
        let board = BoardConfig::parse(
            r#"{
                "adapter": { "golden_settings_table": 32 },
                "firmware": { "golden_table_index": 77 },
                "outputs": []
            }"#,
        )
        .unwrap();

        assert_eq!(board.firmware_config().unwrap().golden_table_index, 32);
        assert!(BoardConfig {
            firmware: None,
            ..board
        }
        .firmware_config()
        .is_none());
    }

    #[test]
    fn test_default_board_survives_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("digctl-test-{}", std::process::id()))
            .join("board.json");
        let board = BoardConfig::default();

        board.save_to(&path).unwrap();
        let loaded = BoardConfig::load_from(&path).unwrap();
        let _ = std::fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(loaded, board);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = BoardConfig::load_from(Path::new("/nonexistent/digctl/board.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
