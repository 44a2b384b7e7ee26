//! Register map of the DIG encoders and the LVTMA / UNIPHY transmitters
//!
//! Addresses are byte offsets into the display MMIO aperture. Registers that
//! exist once per DIG encoder are given for DIG1; add [`DIG2_OFFSET`] to reach
//! the DIG2 bank.

/// Offset of the DIG1 register bank
pub const DIG1_OFFSET: u32 = 0x000;
/// Offset of the DIG2 register bank relative to DIG1
pub const DIG2_OFFSET: u32 = 0x400;
/// Offset of the FMT2 block relative to FMT1
pub const FMT2_OFFSET: u32 = 0x800;

// ============================================================================
// DIG encoder
// ============================================================================

pub const DIG1_CNTL: u32 = 0x75A0;
pub const DIG1_CLOCK_PATTERN: u32 = 0x75AC;
pub const LVDS1_DATA_CNTL: u32 = 0x75BC;
pub const TMDS1_CNTL: u32 = 0x75C0;

/// DIG_CNTL: CRTC feeding this encoder
pub const DIG_SOURCE_SELECT: u32 = 1 << 0;
/// DIG_CNTL: stereo sync source
pub const DIG_STEREOSYNC_SELECT: u32 = 1 << 2;
/// DIG_CNTL: encoder block enable
pub const DIG_ENABLE: u32 = 1 << 4;
/// DIG_CNTL: start the encoder
pub const DIG_START: u32 = 1 << 6;
/// DIG_CNTL: encoder mode field (3 bits)
pub const DIG_MODE: u32 = 0x7 << 8;
pub const DIG_MODE_SHIFT: u32 = 8;
pub const DIG_DUAL_LINK_ENABLE: u32 = 1 << 12;
/// DIG_CNTL: swap upper and lower link
pub const DIG_SWAP: u32 = 1 << 16;

/// Clock pattern for LVDS links
pub const DIG_CLOCK_PATTERN_LVDS: u32 = 0x0063;
/// Clock pattern for TMDS links
pub const DIG_CLOCK_PATTERN_TMDS: u32 = 0x001F;

pub const LVDS_24BIT_ENABLE: u32 = 1 << 0;
pub const LVDS_24BIT_FORMAT: u32 = 1 << 4;

pub const TMDS_PIXEL_ENCODING: u32 = 1 << 4;
pub const TMDS_COLOR_FORMAT: u32 = 0x3 << 8;

// ============================================================================
// Clocking and link steering
// ============================================================================

pub const EXT1_DIFF_POST_DIV_CNTL: u32 = 0x0420;
pub const EXT2_DIFF_POST_DIV_CNTL: u32 = 0x0424;
pub const EXT1_DIFF_DRIVER_ENABLE: u32 = 1 << 0;
pub const EXT2_DIFF_DRIVER_ENABLE: u32 = 1 << 0;

pub const DCCG_PCLK_DIGA_CNTL: u32 = 0x04B0;
pub const DCCG_PCLK_DIGB_CNTL: u32 = 0x04B4;
pub const PCLK_DIG_ON: u32 = 1 << 0;

pub const DCCG_SYMCLK_CNTL: u32 = 0x04B8;
pub const SYMCLKA_SRC_SHIFT: u32 = 8;
pub const SYMCLKB_SRC_SHIFT: u32 = 12;

pub const DCIO_LINK_STEER_CNTL: u32 = 0x7FA4;
pub const LINK_STEER_SWAP: u32 = 1 << 0;

// ============================================================================
// FMT (bit depth reduction / dithering)
// ============================================================================

pub const FMT1_BIT_DEPTH_CONTROL: u32 = 0x6710;
pub const FMT_SPATIAL_DITHER_EN: u32 = 1 << 8;
pub const FMT_TEMPORAL_DITHER_EN: u32 = 1 << 24;
pub const FMT_TEMPORAL_LEVEL: u32 = 1 << 16;

// ============================================================================
// LVTMA transmitter
// ============================================================================

pub const LVTMA_TRANSMITTER_CONTROL: u32 = 0x7F00;
pub const LVTMA_TRANSMITTER_ENABLE: u32 = 0x7F04;
pub const LVTMA_MACRO_CONTROL: u32 = 0x7F0C;
pub const LVTMA_TRANSMITTER_ADJUST: u32 = 0x7F18;
pub const LVTMA_PREEMPHASIS_CONTROL: u32 = 0x7F1C;
pub const LVTMA_PWRSEQ_CNTL: u32 = 0x7F80;
pub const LVTMA_PWRSEQ_STATE: u32 = 0x7F84;
pub const LVTMA_PWRSEQ_REF_DIV: u32 = 0x7F88;
pub const LVTMA_PWRSEQ_DELAY1: u32 = 0x7F8C;
pub const LVTMA_PWRSEQ_DELAY2: u32 = 0x7F90;
pub const LVTMA_BL_MOD_CNTL: u32 = 0x7F94;
pub const LVTMA_DATA_SYNCHRONIZATION: u32 = 0x7F98;

// TRANSMITTER_CONTROL
pub const LVTMA_PLL_ENABLE: u32 = 1 << 0;
pub const LVTMA_PLL_RESET: u32 = 1 << 1;
pub const LVTMA_IDSCKSEL: u32 = 1 << 4;
pub const LVTMA_BYPASS_PLL: u32 = 1 << 28;
pub const LVTMA_USE_CLK_DATA: u32 = 1 << 29;
/// 1 = TMDS, 0 = LVDS
pub const LVTMA_MODE: u32 = 1 << 30;

// TRANSMITTER_ENABLE
pub const LVTMA_LNKL: u32 = 0x01F;
pub const LVTMA_LNKU: u32 = 0x3E0;
pub const LVTMA_LNK_ALL: u32 = 0x3FF;

// DATA_SYNCHRONIZATION
pub const LVTMA_DSYNSEL: u32 = 1 << 0;
pub const LVTMA_PFREQCHG: u32 = 1 << 8;

// PWRSEQ_CNTL
pub const LVTMA_PWRSEQ_EN: u32 = 1 << 0;
pub const LVTMA_PLL_ENABLE_PWRSEQ_MASK: u32 = 1 << 2;
pub const LVTMA_PLL_RESET_PWRSEQ_MASK: u32 = 1 << 3;
pub const LVTMA_PWRSEQ_TARGET_STATE: u32 = 1 << 4;
pub const LVTMA_PWRSEQ_DISABLE_SYNCEN_CONTROL_OF_TX_EN: u32 = 1 << 8;
pub const LVTMA_DIGON_OVRD: u32 = 1 << 17;
pub const LVTMA_BLON_OVRD: u32 = 1 << 25;

// PWRSEQ_STATE
pub const LVTMA_PWRSEQ_STATE_SHIFT: u32 = 8;
pub const PWRSEQ_POWERUP_DONE: u32 = 4;
pub const PWRSEQ_POWERDOWN_DONE: u32 = 9;

// PWRSEQ_REF_DIV
pub const LVTMA_BL_MOD_REF_DI_SHIFT: u32 = 16;
/// Reference divider for a 1 kHz sequencer tick (4000 - 1)
pub const LVTMA_PWRSEQ_REF_DIV_VALUE: u32 = 3999;

// BL_MOD_CNTL
pub const LVTMA_BL_MOD_EN: u32 = 1 << 0;
pub const LVTMA_BL_MOD_LEVEL_SHIFT: u32 = 8;
pub const LVTMA_BL_MOD_RES_SHIFT: u32 = 16;

/// TRANSMITTER_ADJUST value for a powered down LVDS front end
/// (op-amp, output driver bias and shunt resistor off)
pub const LVTMA_ADJUST_POWERDOWN: u32 = 0x00E0_0000;
/// MACRO_CONTROL value for a powered down LVDS front end
pub const LVTMA_MACRO_POWERDOWN: u32 = 0x0743_0408;

/// Firmware data table holding the transmitter electrical settings
pub const GOLDEN_SETTINGS_TABLE: u8 = 0x4D;

/// Register bank offset for an encoder slot
pub fn dig_offset(slot: crate::EncoderSlot) -> u32 {
    match slot {
        crate::EncoderSlot::Dig1 => DIG1_OFFSET,
        crate::EncoderSlot::Dig2 => DIG2_OFFSET,
    }
}

/// Pixel clock control register of an encoder slot
pub fn pclk_dig_cntl(slot: crate::EncoderSlot) -> u32 {
    match slot {
        crate::EncoderSlot::Dig1 => DCCG_PCLK_DIGA_CNTL,
        crate::EncoderSlot::Dig2 => DCCG_PCLK_DIGB_CNTL,
    }
}

/// Symbol clock source field of an encoder slot
pub fn symclk_src_mask(slot: crate::EncoderSlot) -> u32 {
    match slot {
        crate::EncoderSlot::Dig1 => 0x3 << SYMCLKA_SRC_SHIFT,
        crate::EncoderSlot::Dig2 => 0x3 << SYMCLKB_SRC_SHIFT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncoderSlot;

    #[test]
    fn test_link_masks_cover_all_lanes() {
        assert_eq!(LVTMA_LNKL | LVTMA_LNKU, LVTMA_LNK_ALL);
        assert_eq!(LVTMA_LNKL & LVTMA_LNKU, 0);
    }

    #[test]
    fn test_slot_register_selection() {
        assert_eq!(dig_offset(EncoderSlot::Dig1) + DIG1_CNTL, 0x75A0);
        assert_eq!(dig_offset(EncoderSlot::Dig2) + DIG1_CNTL, 0x79A0);
        assert_eq!(pclk_dig_cntl(EncoderSlot::Dig2), DCCG_PCLK_DIGB_CNTL);
        assert_eq!(symclk_src_mask(EncoderSlot::Dig1), 0x300);
    }
}
