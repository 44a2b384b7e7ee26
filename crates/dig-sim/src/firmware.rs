//! Firmware command-table simulator
//!
//! Answers golden-settings lookups from an in-memory table, records every
//! transmitter control command, and serves LVDS, PCIE lane and backlight
//! queries from configured values.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dig_hw::{
    BacklightControl, DataTable, FirmwareError, FirmwareTables, GoldenSettings, GoldenSettingsKey,
    LvdsQuery, OutputId, PcieLanes, TransmitterAction, TransmitterConfig, TransmitterId,
};
use serde::{Deserialize, Serialize};

/// Index of the data table holding the transmitter electrical settings
pub const GOLDEN_SETTINGS_TABLE: u8 = dig_hw::regs::GOLDEN_SETTINGS_TABLE;

/// One golden-settings table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenEntry {
    /// Raw lookup key
    pub key: u32,
    pub settings: GoldenSettings,
}

/// PCIE lane answer for one connector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEntry {
    pub connector: u8,
    pub lanes: PcieLanes,
}

/// LVDS info answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LvdsEntry {
    pub query: LvdsQuery,
    pub value: u32,
}

/// Configuration for a simulated firmware image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimFirmwareConfig {
    /// Whether the golden-settings data table exists at all
    pub golden_table_present: bool,
    /// Data table index the golden settings are served under
    pub golden_table_index: u8,
    pub golden_settings: Vec<GoldenEntry>,
    pub pcie_lanes: Vec<LaneEntry>,
    pub lvds_info: Vec<LvdsEntry>,
    /// Offer a firmware backlight control starting at this level
    pub backlight_level: Option<i32>,
}

impl Default for SimFirmwareConfig {
    fn default() -> Self {
        Self {
            golden_table_present: true,
            golden_table_index: GOLDEN_SETTINGS_TABLE,
            golden_settings: Vec::new(),
            pcie_lanes: Vec::new(),
            lvds_info: Vec::new(),
            backlight_level: None,
        }
    }
}

/// A transmitter control command as received by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitterCommand {
    pub id: TransmitterId,
    pub action: TransmitterAction,
    pub config: TransmitterConfig,
}

/// Observable state of a simulated firmware backlight control
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklightLog {
    pub level: i32,
    /// Levels programmed by each commit
    pub commits: Vec<i32>,
    pub released: bool,
}

/// Recording firmware backlight control
#[derive(Debug, Clone)]
pub struct SimBacklight {
    log: Arc<Mutex<BacklightLog>>,
}

impl SimBacklight {
    pub fn new(level: i32) -> Self {
        Self {
            log: Arc::new(Mutex::new(BacklightLog {
                level,
                ..BacklightLog::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BacklightLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of everything done to this control
    pub fn log(&self) -> BacklightLog {
        self.lock().clone()
    }
}

impl BacklightControl for SimBacklight {
    fn level(&self) -> i32 {
        self.lock().level
    }

    fn set_level(&mut self, level: i32) {
        self.lock().level = level;
    }

    fn commit(&mut self) {
        let mut log = self.lock();
        let level = log.level;
        log.commits.push(level);
    }

    fn release(&mut self) {
        self.lock().released = true;
    }
}

#[derive(Debug, Default)]
struct FirmwareState {
    golden_table_present: bool,
    golden_table_index: u8,
    golden: HashMap<u32, GoldenSettings>,
    lookups: Vec<GoldenSettingsKey>,
    lanes: HashMap<u8, PcieLanes>,
    lvds: HashMap<LvdsQuery, u32>,
    commands: Vec<TransmitterCommand>,
    fail_commands: bool,
    backlight: Option<SimBacklight>,
}

/// Simulated firmware command-table interpreter
#[derive(Debug)]
pub struct SimFirmware {
    state: Mutex<FirmwareState>,
}

impl Default for SimFirmware {
    fn default() -> Self {
        Self::from_config(SimFirmwareConfig::default())
    }
}

impl SimFirmware {
    /// Firmware with an empty golden-settings table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simulator from configuration
    pub fn from_config(config: SimFirmwareConfig) -> Self {
        let state = FirmwareState {
            golden_table_present: config.golden_table_present,
            golden_table_index: config.golden_table_index,
            golden: config
                .golden_settings
                .iter()
                .map(|e| (e.key, e.settings))
                .collect(),
            lanes: config
                .pcie_lanes
                .iter()
                .map(|e| (e.connector, e.lanes))
                .collect(),
            lvds: config.lvds_info.iter().map(|e| (e.query, e.value)).collect(),
            backlight: config.backlight_level.map(SimBacklight::new),
            ..FirmwareState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FirmwareState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the golden-settings data table
    pub fn remove_golden_table(&self) {
        self.lock().golden_table_present = false;
    }

    pub fn add_golden_settings(&self, key: GoldenSettingsKey, settings: GoldenSettings) {
        self.lock().golden.insert(key.value(), settings);
    }

    pub fn set_pcie_lanes(&self, connector: u8, lanes: PcieLanes) {
        self.lock().lanes.insert(connector, lanes);
    }

    pub fn set_lvds_info(&self, query: LvdsQuery, value: u32) {
        self.lock().lvds.insert(query, value);
    }

    /// Offer a firmware backlight control; returns a handle for inspection
    pub fn offer_backlight(&self, level: i32) -> SimBacklight {
        let backlight = SimBacklight::new(level);
        self.lock().backlight = Some(backlight.clone());
        backlight
    }

    /// Make every transmitter command fail
    pub fn fail_commands(&self, fail: bool) {
        self.lock().fail_commands = fail;
    }

    /// Keys queried against the golden-settings table, in order
    pub fn lookups(&self) -> Vec<GoldenSettingsKey> {
        self.lock().lookups.clone()
    }

    /// Transmitter commands received, in order
    pub fn commands(&self) -> Vec<TransmitterCommand> {
        self.lock().commands.clone()
    }

    /// Actions of the transmitter commands received, in order
    pub fn actions(&self) -> Vec<TransmitterAction> {
        self.lock().commands.iter().map(|c| c.action).collect()
    }

    pub fn clear_log(&self) {
        let mut state = self.lock();
        state.lookups.clear();
        state.commands.clear();
    }
}

impl FirmwareTables for SimFirmware {
    fn code_data_table(&self, index: u8) -> Option<DataTable> {
        let state = self.lock();
        (index == state.golden_table_index && state.golden_table_present).then(|| DataTable {
            index,
            offset: 0x100 + u32::from(index) * 0x10,
            size: (state.golden.len() as u32) * 16,
        })
    }

    fn conditional_golden_settings(
        &self,
        table: &DataTable,
        key: GoldenSettingsKey,
    ) -> Option<GoldenSettings> {
        let mut state = self.lock();
        state.lookups.push(key);
        if table.index != state.golden_table_index {
            return None;
        }
        let found = state.golden.get(&key.value()).copied();
        tracing::trace!("sim golden lookup {} -> {:?}", key, found);
        found
    }

    fn transmitter_control(
        &self,
        id: TransmitterId,
        action: TransmitterAction,
        config: &TransmitterConfig,
    ) -> Result<(), FirmwareError> {
        let mut state = self.lock();
        state.commands.push(TransmitterCommand {
            id,
            action,
            config: *config,
        });
        if state.fail_commands {
            return Err(FirmwareError::CommandFailed {
                action,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn pcie_lanes(&self, index: u8) -> Option<PcieLanes> {
        self.lock().lanes.get(&index).copied()
    }

    fn lvds_info(&self, query: LvdsQuery) -> Option<u32> {
        self.lock().lvds.get(&query).copied()
    }

    fn backlight_control(&self, output: OutputId) -> Option<Box<dyn BacklightControl>> {
        let backlight = self.lock().backlight.clone()?;
        tracing::debug!("sim firmware offering backlight control for {}", output);
        Some(Box::new(backlight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dig_hw::{EncoderMode, TransmitterLink};

    fn settings(n: u32) -> GoldenSettings {
        GoldenSettings {
            transmitter_adjust: n,
            preemphasis_control: n + 1,
            macro_control: n + 2,
        }
    }

    #[test]
    fn test_golden_lookup_hit_and_miss() {
        let fw = SimFirmware::new();
        let key = GoldenSettingsKey::new(108_000, false, EncoderMode::TmdsDvi, false);
        fw.add_golden_settings(key, settings(10));

        let table = fw.code_data_table(GOLDEN_SETTINGS_TABLE).unwrap();
        assert_eq!(fw.conditional_golden_settings(&table, key), Some(settings(10)));
        assert_eq!(fw.conditional_golden_settings(&table, key.with_coherent(true)), None);
        assert_eq!(fw.lookups().len(), 2);
    }

    #[test]
    fn test_missing_table() {
        let fw = SimFirmware::new();
        fw.remove_golden_table();
        assert!(fw.code_data_table(GOLDEN_SETTINGS_TABLE).is_none());
        assert!(SimFirmware::new().code_data_table(0x10).is_none());
    }

    #[test]
    fn test_commands_are_recorded_and_can_fail() {
        let fw = SimFirmware::new();
        let config = TransmitterConfig::new(TransmitterLink::A);

        fw.transmitter_control(TransmitterId::Uniphy, TransmitterAction::Setup, &config)
            .unwrap();
        fw.fail_commands(true);
        let err = fw
            .transmitter_control(TransmitterId::Uniphy, TransmitterAction::Enable, &config)
            .unwrap_err();

        assert!(matches!(err, FirmwareError::CommandFailed { action: TransmitterAction::Enable, .. }));
        assert_eq!(
            fw.actions(),
            vec![TransmitterAction::Setup, TransmitterAction::Enable]
        );
    }

    #[test]
    fn test_backlight_shares_state_with_handle() {
        let fw = SimFirmware::new();
        assert!(fw.backlight_control(OutputId::Lvtma).is_none());

        let handle = fw.offer_backlight(40);
        let mut control = fw.backlight_control(OutputId::Lvtma).unwrap();
        control.set_level(90);
        control.commit();
        control.release();

        let log = handle.log();
        assert_eq!(log.level, 90);
        assert_eq!(log.commits, vec![90]);
        assert!(log.released);
    }

    #[test]
    fn test_golden_table_follows_configured_index() {
        let key = GoldenSettingsKey::new(108_000, false, EncoderMode::TmdsDvi, false);
        let fw = SimFirmware::from_config(SimFirmwareConfig {
            golden_table_index: 0x20,
            golden_settings: vec![GoldenEntry {
                key: key.value(),
                settings: settings(3),
            }],
            ..SimFirmwareConfig::default()
        });

        assert!(fw.code_data_table(GOLDEN_SETTINGS_TABLE).is_none());
        let table = fw.code_data_table(0x20).unwrap();
        assert_eq!(fw.conditional_golden_settings(&table, key), Some(settings(3)));
    }

    #[test]
    fn test_from_config() {
        let config: SimFirmwareConfig = serde_json::from_str(
            r#"{
                "pcie_lanes": [{"connector": 1, "lanes": {"chassis": 15, "docking": 0}}],
                "lvds_info": [{"query": "Fpdi", "value": 1}],
                "backlight_level": 7
            }"#,
        )
        .unwrap();
        let fw = SimFirmware::from_config(config);

        assert!(fw.code_data_table(GOLDEN_SETTINGS_TABLE).is_some());
        assert_eq!(fw.pcie_lanes(1).map(|l| l.chassis), Some(15));
        assert_eq!(fw.pcie_lanes(2), None);
        assert_eq!(fw.lvds_info(LvdsQuery::Fpdi), Some(1));
        assert_eq!(fw.lvds_info(LvdsQuery::DualLink), None);
        assert_eq!(fw.backlight_control(OutputId::Lvtma).map(|b| b.level()), Some(7));
    }
}
