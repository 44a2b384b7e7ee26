//! Request/response contract of the firmware command-table interpreter
//!
//! The interpreter itself lives outside this workspace. Backends only use it
//! for three things: looking up electrical ("golden") settings for the legacy
//! transmitter, driving table-based transmitters, and answering board
//! configuration queries for LVDS panels.

use std::fmt;

use crate::error::FirmwareError;
use crate::types::{EncoderMode, EncoderSlot, OutputId};

/// Handle to a firmware data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTable {
    /// Table index within the firmware master data table
    pub index: u8,
    /// Byte offset of the table within the firmware image
    pub offset: u32,
    /// Table size in bytes
    pub size: u32,
}

/// Electrical parameters for the legacy transmitter front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoldenSettings {
    pub transmitter_adjust: u32,
    pub preemphasis_control: u32,
    pub macro_control: u32,
}

/// Lookup key for conditional golden settings
///
/// Packs the per-link clock in 10 kHz units into bits 0..16, the encoder mode
/// into bits 16..24 and the coherent flag as value 2 into bits 24..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoldenSettingsKey(pub u32);

impl GoldenSettingsKey {
    const COHERENT: u32 = 0x2 << 24;

    /// Build the key for a mode
    pub fn new(clock_khz: u32, dual_link: bool, mode: EncoderMode, coherent: bool) -> Self {
        let links = if dual_link { 2 } else { 1 };
        let clock = (clock_khz / 10 / links) & 0xffff;
        Self(clock | (mode.bits() << 16)).with_coherent(coherent)
    }

    /// Same key with the coherent field replaced
    pub fn with_coherent(self, coherent: bool) -> Self {
        let base = self.0 & !Self::COHERENT;
        Self(if coherent { base | Self::COHERENT } else { base })
    }

    pub fn coherent(&self) -> bool {
        self.0 & Self::COHERENT != 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GoldenSettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Which table-driven transmitter a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransmitterId {
    /// UNIPHY on discrete chips
    Uniphy,
    /// PCIE PHY on integrated chips
    PciePhy,
}

/// Transmitter control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransmitterAction {
    Setup,
    Enable,
    EnableOutput,
    DisableOutput,
    Disable,
}

/// Number of links driven by a table-driven transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkCount {
    #[default]
    Single,
    Dual,
}

/// Physical link assignment of a table-driven transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransmitterLink {
    A,
    B,
    /// Dual link, A as primary
    AB,
    /// Dual link, B as primary
    BA,
}

impl TransmitterLink {
    /// Link assignment for the given link count, keeping the primary link
    pub fn for_link_count(self, count: LinkCount) -> TransmitterLink {
        match (count, self) {
            (LinkCount::Dual, TransmitterLink::A) => TransmitterLink::AB,
            (LinkCount::Dual, TransmitterLink::B) => TransmitterLink::BA,
            (LinkCount::Single, TransmitterLink::AB) => TransmitterLink::A,
            (LinkCount::Single, TransmitterLink::BA) => TransmitterLink::B,
            (_, link) => link,
        }
    }
}

/// Config record passed with every transmitter control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransmitterConfig {
    pub coherent: bool,
    pub pixel_clock_khz: u32,
    pub link_count: LinkCount,
    /// PCIE lane mask, only set on integrated chips
    pub lanes: Option<u32>,
    pub link: TransmitterLink,
    /// Encoder feeding the transmitter, `None` until assigned
    pub encoder: Option<EncoderSlot>,
}

impl TransmitterConfig {
    /// Initial config for a transmitter on the given primary link
    pub fn new(link: TransmitterLink) -> Self {
        Self {
            coherent: false,
            pixel_clock_khz: 0,
            link_count: LinkCount::Single,
            lanes: None,
            link,
            encoder: None,
        }
    }
}

/// PCIE lane configuration reported by the firmware for a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcieLanes {
    pub chassis: u32,
    pub docking: u32,
}

/// LVDS panel parameters the firmware can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LvdsQuery {
    Fpdi,
    DualLink,
    GreyLevel,
    SeqDigOntoDe,
    SeqDeToBl,
    OffDelay,
    Bits24,
    SpatialDither,
    TemporalDither,
}

/// Firmware-provided backlight control for panels without a usable
/// modulation register
pub trait BacklightControl: Send {
    /// Current level, negative if unknown
    fn level(&self) -> i32;

    fn set_level(&mut self, level: i32);

    /// Program the cached level into the hardware
    fn commit(&mut self);

    /// Release firmware-side resources; no further calls follow
    fn release(&mut self);
}

/// The firmware command-table interpreter
pub trait FirmwareTables: Send + Sync {
    /// Locate a data table by index
    fn code_data_table(&self, index: u8) -> Option<DataTable>;

    /// Search a data table for the electrical settings matching `key`
    fn conditional_golden_settings(
        &self,
        table: &DataTable,
        key: GoldenSettingsKey,
    ) -> Option<GoldenSettings>;

    /// Run a transmitter control command
    fn transmitter_control(
        &self,
        id: TransmitterId,
        action: TransmitterAction,
        config: &TransmitterConfig,
    ) -> Result<(), FirmwareError>;

    /// PCIE lanes wired to connector `index` (1-based)
    fn pcie_lanes(&self, index: u8) -> Option<PcieLanes>;

    /// Answer an LVDS panel query, `None` if the firmware has no entry
    fn lvds_info(&self, query: LvdsQuery) -> Option<u32>;

    /// Backlight control for a panel output, if the firmware provides one
    fn backlight_control(&self, output: OutputId) -> Option<Box<dyn BacklightControl>>;
}
