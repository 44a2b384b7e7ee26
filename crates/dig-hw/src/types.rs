//! Value types shared by the encoder and transmitter backends

use std::fmt;

/// Output blocks of the display engine
///
/// Only [`OutputId::Lvtma`], [`OutputId::UniphyA`] and [`OutputId::UniphyB`]
/// are driven through a DIG encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputId {
    /// Primary DAC (analog)
    DacA,
    /// Secondary DAC (analog)
    DacB,
    /// Integrated TMDS transmitter
    Tmdsa,
    /// External DVO port
    Dvo,
    /// Dedicated LVTMA transmitter, hardwired to DIG2
    Lvtma,
    /// Shared UNIPHY transmitter, link A
    UniphyA,
    /// Shared UNIPHY transmitter, link B
    UniphyB,
}

impl OutputId {
    /// Returns a human-readable name for the output
    pub fn name(&self) -> &'static str {
        match self {
            OutputId::DacA => "DAC_A",
            OutputId::DacB => "DAC_B",
            OutputId::Tmdsa => "TMDS_A",
            OutputId::Dvo => "DVO",
            OutputId::Lvtma => "UNIPHY_LVTMA",
            OutputId::UniphyA => "UNIPHY_A",
            OutputId::UniphyB => "UNIPHY_B",
        }
    }

    /// Whether this output is the dedicated sink that may only use DIG2
    pub fn is_dedicated(&self) -> bool {
        matches!(self, OutputId::Lvtma)
    }

    /// Whether this output is fed by a DIG encoder
    pub fn is_dig(&self) -> bool {
        matches!(self, OutputId::Lvtma | OutputId::UniphyA | OutputId::UniphyB)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connector attached to an output, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectorType {
    /// Internal LVDS panel
    Panel,
    /// Dual-link capable DVI
    Dvi,
    /// Single-link DVI (also used for HDMI)
    DviSingle,
    /// TV out
    Tv,
}

impl ConnectorType {
    /// Whether this is a DVI connector of either link width
    pub fn is_dvi(&self) -> bool {
        matches!(self, ConnectorType::Dvi | ConnectorType::DviSingle)
    }
}

/// Signal format produced by a DIG encoder
///
/// The discriminant is the value of the DIG_CNTL mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncoderMode {
    DisplayPort = 0,
    Lvds = 1,
    TmdsDvi = 2,
    TmdsHdmi = 3,
    Sdvo = 4,
}

impl EncoderMode {
    /// Raw mode field value
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Whether this is one of the TMDS modes
    pub fn is_tmds(self) -> bool {
        matches!(self, EncoderMode::TmdsDvi | EncoderMode::TmdsHdmi)
    }
}

/// One of the two physical DIG encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncoderSlot {
    Dig1,
    Dig2,
}

impl EncoderSlot {
    /// All slots, in allocation preference order for shared outputs
    pub const ALL: [EncoderSlot; 2] = [EncoderSlot::Dig1, EncoderSlot::Dig2];

    /// Index into the slot ownership table
    pub fn index(self) -> usize {
        match self {
            EncoderSlot::Dig1 => 0,
            EncoderSlot::Dig2 => 1,
        }
    }

    /// The other slot
    pub fn other(self) -> EncoderSlot {
        match self {
            EncoderSlot::Dig1 => EncoderSlot::Dig2,
            EncoderSlot::Dig2 => EncoderSlot::Dig1,
        }
    }
}

impl fmt::Display for EncoderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderSlot::Dig1 => f.write_str("DIG1"),
            EncoderSlot::Dig2 => f.write_str("DIG2"),
        }
    }
}

/// Power transition requested by the mode-setting sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerState {
    On,
    Reset,
    Shutdown,
}

impl PowerState {
    pub fn name(&self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Reset => "reset",
            PowerState::Shutdown => "shutdown",
        }
    }
}

/// Result of validating a mode against an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeStatus {
    Ok,
    /// Pixel clock exceeds what the link can carry
    ClockHigh,
}

/// A display mode as far as the output hardware is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayMode {
    /// Modeline name
    pub name: String,
    /// Synthesized pixel clock in kHz
    pub clock_khz: u32,
    /// Active width
    pub hdisplay: u32,
    /// Active height
    pub vdisplay: u32,
}

impl DisplayMode {
    pub fn new(name: impl Into<String>, clock_khz: u32, hdisplay: u32, vdisplay: u32) -> Self {
        Self {
            name: name.into(),
            clock_khz,
            hdisplay,
            vdisplay,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" {}x{} @ {}.{:03} MHz",
            self.name,
            self.hdisplay,
            self.vdisplay,
            self.clock_khz / 1000,
            self.clock_khz % 1000
        )
    }
}

/// LVDS bit depth and dithering parameters handed to the CRTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FmtDither {
    /// Panel takes 24 bit data (else 18 bit)
    pub lvds_24bit: bool,
    pub spatial_dither: bool,
    pub temporal_dither: bool,
    pub grey_level: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_mode_bits() {
        assert_eq!(EncoderMode::DisplayPort.bits(), 0);
        assert_eq!(EncoderMode::Lvds.bits(), 1);
        assert_eq!(EncoderMode::TmdsDvi.bits(), 2);
        assert_eq!(EncoderMode::TmdsHdmi.bits(), 3);
        assert_eq!(EncoderMode::Sdvo.bits(), 4);
    }

    #[test]
    fn test_slot_other() {
        assert_eq!(EncoderSlot::Dig1.other(), EncoderSlot::Dig2);
        assert_eq!(EncoderSlot::Dig2.other().index(), 0);
    }

    #[test]
    fn test_only_lvtma_is_dedicated() {
        assert!(OutputId::Lvtma.is_dedicated());
        assert!(!OutputId::UniphyA.is_dedicated());
        assert!(OutputId::UniphyB.is_dig());
        assert!(!OutputId::DacA.is_dig());
    }

    #[test]
    fn test_mode_display() {
        let mode = DisplayMode::new("1920x1200", 154_000, 1920, 1200);
        assert_eq!(mode.to_string(), "\"1920x1200\" 1920x1200 @ 154.000 MHz");
    }
}
