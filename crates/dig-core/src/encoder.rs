//! DIG encoder backend
//!
//! Routes a CRTC into one of the two DIG encoders and formats the stream
//! for the transmitter behind it. Shared by every DIG output regardless of
//! transmitter type.

use dig_hw::regs::*;
use dig_hw::{Crtc, DisplayMode, EncoderMode, EncoderSlot, ModeStatus, OutputId, PowerState};
use tracing::{debug, info, warn};

use crate::transmitter::DigContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedRegs {
    slot: EncoderSlot,
    ext1_diff_post_div: u32,
    ext2_diff_post_div: u32,
    clock_pattern: u32,
    lvds_data: u32,
    dig_cntl: u32,
    tmds_cntl: u32,
    link_steer: u32,
    pclk: u32,
    symclk: u32,
    bl_mod: u32,
}

/// The DIG encoder of one output
#[derive(Debug, Default)]
pub struct DigEncoder {
    saved: Option<SavedRegs>,
}

impl DigEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_saved(&self) -> bool {
        self.saved.is_some()
    }

    /// The encoder places no limits of its own on a mode
    pub fn mode_valid(&self, _ctx: &DigContext<'_>, _mode: &DisplayMode) -> ModeStatus {
        ModeStatus::Ok
    }

    /// Slot to program: the allocated one, else whatever the steering says
    fn routed_slot(ctx: &DigContext<'_>) -> Option<EncoderSlot> {
        ctx.dig
            .encoder_slot
            .or_else(|| ctx.adapter.probe_encoder(ctx.output.id))
    }

    fn lvds_format(ctx: &DigContext<'_>, crtc: &dyn Crtc, off: u32) {
        let lvds = &ctx.dig.lvds;
        ctx.mask(off + DIG1_CLOCK_PATTERN, DIG_CLOCK_PATTERN_LVDS, 0xffff);
        ctx.mask(
            off + LVDS1_DATA_CNTL,
            (if lvds.dither.lvds_24bit { LVDS_24BIT_ENABLE } else { 0 })
                | (if lvds.fpdi { LVDS_24BIT_FORMAT } else { 0 }),
            LVDS_24BIT_ENABLE | LVDS_24BIT_FORMAT,
        );
        crtc.set_dither(Some(&lvds.dither));
    }

    fn tmds_format(ctx: &DigContext<'_>, crtc: &dyn Crtc, off: u32) {
        ctx.mask(off + DIG1_CLOCK_PATTERN, DIG_CLOCK_PATTERN_TMDS, 0xffff);
        ctx.mask(off + TMDS1_CNTL, 0, TMDS_PIXEL_ENCODING | TMDS_COLOR_FORMAT);
        crtc.set_dither(None);
    }

    pub fn mode(&mut self, ctx: &mut DigContext<'_>, crtc: &dyn Crtc, _mode: &DisplayMode) {
        let Some(slot) = Self::routed_slot(ctx) else {
            warn!("{}: no encoder routed", ctx.output.id);
            return;
        };
        let off = dig_offset(slot);
        let crtc_id = u32::from(crtc.id());
        let dual = ctx.dig.dual_link;

        ctx.adapter.log_dig_cntl("encoder set");
        ctx.mask(off + DIG1_CNTL, crtc_id, DIG_SOURCE_SELECT);

        match ctx.output.id {
            OutputId::UniphyA => {
                // Link A normally sits on DIG1
                let swap = slot == EncoderSlot::Dig2;
                ctx.mask(
                    DCIO_LINK_STEER_CNTL,
                    if swap { LINK_STEER_SWAP } else { 0 },
                    LINK_STEER_SWAP,
                );
                ctx.mask(
                    off + DIG1_CNTL,
                    if dual { DIG_DUAL_LINK_ENABLE } else { 0 },
                    DIG_SWAP | DIG_DUAL_LINK_ENABLE,
                );
            }
            OutputId::UniphyB => {
                let swap = slot == EncoderSlot::Dig1;
                ctx.mask(
                    DCIO_LINK_STEER_CNTL,
                    if swap { LINK_STEER_SWAP } else { 0 },
                    LINK_STEER_SWAP,
                );
                ctx.mask(
                    off + DIG1_CNTL,
                    if dual { DIG_SWAP | DIG_DUAL_LINK_ENABLE } else { 0 },
                    DIG_SWAP | DIG_DUAL_LINK_ENABLE,
                );
            }
            _ => {
                ctx.mask(EXT2_DIFF_POST_DIV_CNTL, 0, EXT2_DIFF_DRIVER_ENABLE);
            }
        }

        match ctx.dig.encoder_mode {
            EncoderMode::Lvds => Self::lvds_format(ctx, crtc, off),
            EncoderMode::DisplayPort => info!("{}: DisplayPort not supported", ctx.output.id),
            _ => Self::tmds_format(ctx, crtc, off),
        }

        // Mode and start must land in one write
        ctx.mask(
            off + DIG1_CNTL,
            ((ctx.dig.encoder_mode.bits() & 0x7) << DIG_MODE_SHIFT)
                | DIG_START
                | (if dual { DIG_DUAL_LINK_ENABLE } else { 0 })
                | crtc_id,
            DIG_MODE | DIG_START | DIG_DUAL_LINK_ENABLE | DIG_STEREOSYNC_SELECT | DIG_SOURCE_SELECT,
        );
        ctx.adapter.log_dig_cntl("encoder set");
    }

    pub fn power(&mut self, ctx: &mut DigContext<'_>, state: PowerState) {
        let slot = match ctx.dig.encoder_slot {
            Some(slot) => slot,
            None => {
                let Some(slot) = ctx.adapter.probe_encoder(ctx.output.id) else {
                    return;
                };
                if ctx.adapter.slots().taken_by_other(slot, ctx.output.handle) {
                    warn!("{} for {} already taken", slot, ctx.output.id);
                    return;
                }
                slot
            }
        };
        let off = dig_offset(slot);

        // symbol clock from the pixel PLL
        ctx.mask(DCCG_SYMCLK_CNTL, 0, symclk_src_mask(slot));

        debug!("encoder power {} on {}", state.name(), slot);
        match state {
            PowerState::On => {
                ctx.mask(off + DIG1_CNTL, DIG_ENABLE, DIG_ENABLE);
                ctx.mask(pclk_dig_cntl(slot), PCLK_DIG_ON, PCLK_DIG_ON);
            }
            PowerState::Reset | PowerState::Shutdown => {
                match slot {
                    EncoderSlot::Dig1 => {
                        ctx.mask(EXT1_DIFF_POST_DIV_CNTL, 0, EXT1_DIFF_DRIVER_ENABLE)
                    }
                    EncoderSlot::Dig2 => {
                        ctx.mask(EXT2_DIFF_POST_DIV_CNTL, 0, EXT2_DIFF_DRIVER_ENABLE)
                    }
                }
                ctx.mask(off + DIG1_CNTL, 0, DIG_ENABLE);
                ctx.mask(pclk_dig_cntl(slot), 0, PCLK_DIG_ON);
            }
        }
        ctx.adapter.log_dig_cntl("encoder power");
    }

    pub fn save(&mut self, ctx: &mut DigContext<'_>) {
        let Some(slot) = ctx.adapter.probe_encoder(ctx.output.id) else {
            return;
        };
        let off = dig_offset(slot);
        self.saved = Some(SavedRegs {
            slot,
            ext1_diff_post_div: ctx.read(EXT1_DIFF_POST_DIV_CNTL),
            ext2_diff_post_div: ctx.read(EXT2_DIFF_POST_DIV_CNTL),
            clock_pattern: ctx.read(off + DIG1_CLOCK_PATTERN),
            lvds_data: ctx.read(off + LVDS1_DATA_CNTL),
            dig_cntl: ctx.read(off + DIG1_CNTL),
            tmds_cntl: ctx.read(off + TMDS1_CNTL),
            link_steer: ctx.read(DCIO_LINK_STEER_CNTL),
            pclk: ctx.read(pclk_dig_cntl(slot)),
            symclk: ctx.read(DCCG_SYMCLK_CNTL),
            bl_mod: ctx.read(LVTMA_BL_MOD_CNTL),
        });
    }

    pub fn restore(&mut self, ctx: &mut DigContext<'_>) {
        let Some(saved) = self.saved else {
            warn!("{}: no encoder registers stored", ctx.output.id);
            return;
        };
        let off = dig_offset(saved.slot);

        ctx.write(EXT1_DIFF_POST_DIV_CNTL, saved.ext1_diff_post_div);
        ctx.write(EXT2_DIFF_POST_DIV_CNTL, saved.ext2_diff_post_div);
        // everything but start first
        ctx.write(off + DIG1_CNTL, saved.dig_cntl & !DIG_START);
        ctx.write(DCIO_LINK_STEER_CNTL, saved.link_steer);
        ctx.write(off + DIG1_CLOCK_PATTERN, saved.clock_pattern);
        ctx.write(off + LVDS1_DATA_CNTL, saved.lvds_data);
        ctx.write(off + TMDS1_CNTL, saved.tmds_cntl);
        ctx.write(pclk_dig_cntl(saved.slot), saved.pclk);
        ctx.write(off + DIG1_CNTL, saved.dig_cntl);
        ctx.write(DCCG_SYMCLK_CNTL, saved.symclk);
        ctx.write(LVTMA_BL_MOD_CNTL, saved.bl_mod);
    }

    pub fn destroy(&mut self) {
        self.saved = None;
    }
}
