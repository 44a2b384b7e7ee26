//! Per-output DIG configuration

use std::fmt;

use dig_hw::{ConnectorType, DisplayMode, EncoderMode, EncoderSlot, FmtDither, OutputId};
use serde::{Deserialize, Serialize};

/// Unique identifier for an output on one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputHandle(pub u32);

impl OutputHandle {
    /// Get the raw handle value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of an output, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputInfo {
    pub id: OutputId,
    pub handle: OutputHandle,
    pub connector: ConnectorType,
}

/// LVDS panel parameters discovered at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LvdsParams {
    /// FPDI (vs LDI) 24 bit data format
    pub fpdi: bool,
    /// Power sequencer delay from DIG on to data enable, in ms
    pub dig_to_de: u32,
    /// Power sequencer delay from data enable to backlight on, in ms
    pub de_to_bl: u32,
    /// Power sequencer off delay, in ms
    pub off_delay: u32,
    /// Bit depth and dithering handed to the CRTC
    pub dither: FmtDither,
    /// Backlight level from the modulation register, `None` if not in use
    pub backlight_level: Option<i32>,
}

/// Mutable state shared by the encoder and transmitter of one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigState {
    /// Encoder slot granted by the allocator
    pub encoder_slot: Option<EncoderSlot>,
    pub encoder_mode: EncoderMode,
    pub coherent: bool,
    pub dual_link: bool,
    /// Mode last programmed through the output
    pub mode: Option<DisplayMode>,
    pub lvds: LvdsParams,
}

impl DigState {
    pub fn new(encoder_mode: EncoderMode) -> Self {
        Self {
            encoder_slot: None,
            encoder_mode,
            coherent: false,
            dual_link: false,
            mode: None,
            lvds: LvdsParams::default(),
        }
    }
}
