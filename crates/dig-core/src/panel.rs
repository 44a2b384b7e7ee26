//! LVDS panel discovery
//!
//! Panel timing and format are not part of the mode; they are read back from
//! what the firmware programmed at boot and then overridden by whatever the
//! firmware LVDS table reports.

use dig_hw::regs::*;
use dig_hw::{EncoderSlot, LvdsQuery};
use tracing::debug;

use crate::adapter::DisplayAdapter;
use crate::state::LvdsParams;

/// Panel configuration found at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelInfo {
    pub lvds: LvdsParams,
    pub dual_link: bool,
}

/// Read the panel configuration left behind by the firmware
pub fn discover(adapter: &DisplayAdapter, slot: EncoderSlot) -> PanelInfo {
    let regs = adapter.regs();
    let off = dig_offset(slot);
    let mut info = PanelInfo::default();

    let data_cntl = regs.read(off + LVDS1_DATA_CNTL);
    let dig_cntl = regs.read(off + DIG1_CNTL);
    info.lvds.fpdi = data_cntl & LVDS_24BIT_FORMAT != 0;
    info.lvds.dither.lvds_24bit = data_cntl & LVDS_24BIT_ENABLE != 0;
    info.dual_link = dig_cntl & DIG_DUAL_LINK_ENABLE != 0;

    let bl_mod = regs.read(LVTMA_BL_MOD_CNTL);
    info.lvds.backlight_level = (bl_mod & LVTMA_BL_MOD_EN != 0)
        .then(|| ((bl_mod >> LVTMA_BL_MOD_LEVEL_SHIFT) & 0xff) as i32);

    // sequencer ticks per millisecond
    let ticks = ((regs.read(LVTMA_PWRSEQ_REF_DIV) & 0xffff) + 1) / 1000;
    let delay1 = regs.read(LVTMA_PWRSEQ_DELAY1);
    info.lvds.dig_to_de = (delay1 & 0xff).wrapping_mul(ticks) / 10;
    info.lvds.de_to_bl = ((delay1 >> 8) & 0xff).wrapping_mul(ticks) / 10;
    info.lvds.off_delay = regs.read(LVTMA_PWRSEQ_DELAY2).wrapping_mul(ticks);

    let fmt_off = if dig_cntl & DIG_SOURCE_SELECT != 0 {
        FMT2_OFFSET
    } else {
        0
    };
    let bit_depth = regs.read(fmt_off + FMT1_BIT_DEPTH_CONTROL);
    info.lvds.dither.spatial_dither = bit_depth & FMT_SPATIAL_DITHER_EN != 0;
    info.lvds.dither.grey_level = bit_depth & FMT_TEMPORAL_LEVEL != 0;
    info.lvds.dither.temporal_dither =
        info.lvds.dither.grey_level || bit_depth & FMT_TEMPORAL_DITHER_EN != 0;

    if let Some(firmware) = adapter.firmware() {
        let flag = |query| firmware.lvds_info(query).map(|v| v != 0);
        let lvds = &mut info.lvds;

        if let Some(v) = flag(LvdsQuery::Fpdi) {
            lvds.fpdi = v;
        }
        if let Some(v) = flag(LvdsQuery::DualLink) {
            info.dual_link = v;
        }
        if let Some(v) = flag(LvdsQuery::GreyLevel) {
            lvds.dither.grey_level = v;
        }
        if let Some(v) = firmware.lvds_info(LvdsQuery::SeqDigOntoDe) {
            lvds.dig_to_de = v;
        }
        if let Some(v) = firmware.lvds_info(LvdsQuery::SeqDeToBl) {
            lvds.de_to_bl = v;
        }
        if let Some(v) = firmware.lvds_info(LvdsQuery::OffDelay) {
            lvds.off_delay = v;
        }
        if let Some(v) = flag(LvdsQuery::Bits24) {
            lvds.dither.lvds_24bit = v;
        }
        if let Some(v) = flag(LvdsQuery::SpatialDither) {
            lvds.dither.spatial_dither = v;
        }
        if let Some(v) = flag(LvdsQuery::TemporalDither) {
            lvds.dither.temporal_dither = v;
        }
    }

    debug!("panel on {}: {:?}", slot, info);
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dig_sim::{SimFirmware, SimRegisters};

    #[test]
    fn test_discover_from_registers() {
        let regs = Arc::new(SimRegisters::with_values([
            (DIG2_OFFSET + LVDS1_DATA_CNTL, LVDS_24BIT_ENABLE | LVDS_24BIT_FORMAT),
            (DIG2_OFFSET + DIG1_CNTL, DIG_DUAL_LINK_ENABLE | DIG_SOURCE_SELECT),
            (LVTMA_BL_MOD_CNTL, (0xff << 16) | (0x7f << 8) | LVTMA_BL_MOD_EN),
            (LVTMA_PWRSEQ_REF_DIV, 3999),
            (LVTMA_PWRSEQ_DELAY1, 20 | (100 << 8)),
            (LVTMA_PWRSEQ_DELAY2, 100),
            (FMT2_OFFSET + FMT1_BIT_DEPTH_CONTROL, FMT_SPATIAL_DITHER_EN | FMT_TEMPORAL_LEVEL),
        ]));
        let adapter = DisplayAdapter::new(regs.clone(), regs);

        let info = discover(&adapter, EncoderSlot::Dig2);

        assert!(info.dual_link);
        assert!(info.lvds.fpdi);
        assert!(info.lvds.dither.lvds_24bit);
        assert_eq!(info.lvds.backlight_level, Some(0x7f));
        assert_eq!(info.lvds.dig_to_de, 8);
        assert_eq!(info.lvds.de_to_bl, 40);
        assert_eq!(info.lvds.off_delay, 400);
        assert!(info.lvds.dither.spatial_dither);
        assert!(info.lvds.dither.grey_level);
        assert!(info.lvds.dither.temporal_dither);
    }

    #[test]
    fn test_backlight_absent_when_modulation_disabled() {
        let regs = Arc::new(SimRegisters::with_values([(LVTMA_BL_MOD_CNTL, 0x7f << 8)]));
        let adapter = DisplayAdapter::new(regs.clone(), regs);

        assert_eq!(discover(&adapter, EncoderSlot::Dig2).lvds.backlight_level, None);
    }

    #[test]
    fn test_firmware_overrides_registers() {
        let regs = Arc::new(SimRegisters::with_values([(
            DIG2_OFFSET + LVDS1_DATA_CNTL,
            LVDS_24BIT_ENABLE,
        )]));
        let fw = Arc::new(SimFirmware::new());
        fw.set_lvds_info(LvdsQuery::Bits24, 0);
        fw.set_lvds_info(LvdsQuery::DualLink, 1);
        fw.set_lvds_info(LvdsQuery::SeqDeToBl, 30);
        fw.set_lvds_info(LvdsQuery::OffDelay, 200);
        let adapter = DisplayAdapter::new(regs.clone(), regs).with_firmware(fw);

        let info = discover(&adapter, EncoderSlot::Dig2);

        assert!(!info.lvds.dither.lvds_24bit);
        assert!(info.dual_link);
        assert_eq!(info.lvds.de_to_bl, 30);
        assert_eq!(info.lvds.off_delay, 200);
        assert_eq!(info.lvds.dig_to_de, 0);
    }

    #[test]
    fn test_all_ones_delay_register_wraps() {
        let regs = Arc::new(SimRegisters::with_values([
            (LVTMA_PWRSEQ_REF_DIV, 3999),
            (LVTMA_PWRSEQ_DELAY1, 0xffff_ffff),
            (LVTMA_PWRSEQ_DELAY2, 0xffff_ffff),
        ]));
        let adapter = DisplayAdapter::new(regs.clone(), regs);

        let info = discover(&adapter, EncoderSlot::Dig2);

        assert_eq!(info.lvds.off_delay, 0xffff_ffffu32.wrapping_mul(4));
        assert_eq!(info.lvds.dig_to_de, 0xff * 4 / 10);
        assert_eq!(info.lvds.de_to_bl, 0xff * 4 / 10);
    }
}
