//! Dedicated LVTMA transmitter, programmed directly through registers
//!
//! The power sequences below follow the hardware bring-up order exactly;
//! every delay is a settle time the block needs before the next step.

use dig_hw::regs::*;
use dig_hw::{ConnectorType, DisplayMode, GoldenSettings, GoldenSettingsKey, PowerState};
use tracing::{debug, info, warn};

use super::{DigContext, Transmitter};

/// Signalling used on the LVTMA link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LvtmaLink {
    /// DVI / HDMI
    Tmds,
    /// Internal panel
    Lvds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PowerSequencerRegs {
    cntl: u32,
    ref_div: u32,
    delay1: u32,
    delay2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedRegs {
    control: u32,
    adjust: u32,
    preemphasis: u32,
    macro_control: u32,
    data_sync: u32,
    enable: u32,
    /// Only saved for LVDS
    pwrseq: Option<PowerSequencerRegs>,
}

/// LVTMA transmitter backend
#[derive(Debug)]
pub struct LvtmaTransmitter {
    link: LvtmaLink,
    saved: Option<SavedRegs>,
}

/// Link enable pattern for an LVDS panel
pub fn lvds_link_mask(dual_link: bool, bits24: bool) -> u32 {
    match (dual_link, bits24) {
        (true, true) => 0x3ff,
        (true, false) => 0x1ef,
        (false, true) => 0x1f,
        (false, false) => 0x0f,
    }
}

/// Program the backlight modulation register; levels below 1 are ignored
pub(crate) fn program_backlight(ctx: &DigContext<'_>, level: i32) {
    if level < 1 {
        return;
    }
    debug!("setting BL_MOD_LEVEL to {}", level);
    ctx.mask(
        LVTMA_PWRSEQ_REF_DIV,
        0x144 << LVTMA_BL_MOD_REF_DI_SHIFT,
        0x7ff << LVTMA_BL_MOD_REF_DI_SHIFT,
    );
    ctx.write(
        LVTMA_BL_MOD_CNTL,
        (0xff << LVTMA_BL_MOD_RES_SHIFT)
            | (((level as u32) & 0xff) << LVTMA_BL_MOD_LEVEL_SHIFT)
            | LVTMA_BL_MOD_EN,
    );
}

impl LvtmaTransmitter {
    pub fn new(link: LvtmaLink) -> Self {
        Self { link, saved: None }
    }

    pub fn link(&self) -> LvtmaLink {
        self.link
    }

    pub fn has_saved(&self) -> bool {
        self.saved.is_some()
    }

    fn set_bypass(ctx: &DigContext<'_>, coherent: bool) {
        if ctx.output.connector != ConnectorType::Panel {
            ctx.mask(
                LVTMA_TRANSMITTER_CONTROL,
                if coherent { 0 } else { LVTMA_BYPASS_PLL },
                LVTMA_BYPASS_PLL,
            );
        }
    }

    fn lookup_golden_settings(ctx: &DigContext<'_>, mode: &DisplayMode) -> Option<GoldenSettings> {
        let requested = ctx.dig.coherent;
        let Some(firmware) = ctx.adapter.firmware() else {
            debug!("no firmware supplied electrical parameters available");
            return None;
        };
        let Some(table) = firmware.code_data_table(ctx.adapter.config().golden_settings_table)
        else {
            debug!("no firmware supplied electrical parameters available");
            return None;
        };

        let key = GoldenSettingsKey::new(
            mode.clock_khz,
            ctx.dig.dual_link,
            ctx.dig.encoder_mode,
            requested,
        );
        debug!(
            "golden settings lookup for {} ({:?}): {}",
            mode, ctx.dig.encoder_mode, key
        );
        if let Some(settings) = firmware.conditional_golden_settings(&table, key) {
            return Some(settings);
        }

        let retry = key.with_coherent(!requested);
        match firmware.conditional_golden_settings(&table, retry) {
            Some(settings) => {
                info!(
                    "{} mode not supported, switching to {}",
                    if requested { "Coherent" } else { "Incoherent" },
                    if requested { "incoherent" } else { "coherent" }
                );
                Self::set_bypass(ctx, !requested);
                Some(settings)
            }
            None => {
                warn!("cannot get golden settings for {} or {}", key, retry);
                None
            }
        }
    }

    /// Coherent mode and electrical tuning shared by both flavours
    fn program_electrical(ctx: &DigContext<'_>, mode: &DisplayMode) {
        Self::set_bypass(ctx, ctx.dig.coherent);

        if let Some(settings) = Self::lookup_golden_settings(ctx, mode) {
            debug!(
                "TransmitterAdjust: 0x{:08x} PreemphasisControl: 0x{:08x} MacroControl: 0x{:08x}",
                settings.transmitter_adjust, settings.preemphasis_control, settings.macro_control
            );
            ctx.write(LVTMA_TRANSMITTER_ADJUST, settings.transmitter_adjust);
            ctx.write(LVTMA_PREEMPHASIS_CONTROL, settings.preemphasis_control);
            ctx.write(LVTMA_MACRO_CONTROL, settings.macro_control);
        }
    }

    /// PLL bring-up and data synchronization restart common to both flavours
    fn start_pll(ctx: &DigContext<'_>) {
        ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_PLL_ENABLE, LVTMA_PLL_ENABLE);
        ctx.delay_us(14);
        ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_PLL_RESET, LVTMA_PLL_RESET);
        ctx.delay_us(10);
        ctx.mask(LVTMA_TRANSMITTER_CONTROL, 0, LVTMA_PLL_RESET);
        ctx.delay_us(1000);
        ctx.mask(LVTMA_DATA_SYNCHRONIZATION, LVTMA_PFREQCHG, LVTMA_PFREQCHG);
        ctx.delay_us(1);
        ctx.mask(LVTMA_DATA_SYNCHRONIZATION, LVTMA_DSYNSEL, LVTMA_DSYNSEL);
    }

    /// Poll the power sequencer until `done` accepts its state
    fn wait_for_sequencer(ctx: &DigContext<'_>, done: impl Fn(u32) -> bool) -> Option<u32> {
        let config = ctx.adapter.config();
        for _ in 0..config.pwrseq_poll_iterations {
            ctx.delay_us(config.pwrseq_poll_interval_us);
            let state = (ctx.read(LVTMA_PWRSEQ_STATE) >> LVTMA_PWRSEQ_STATE_SHIFT) & 0xff;
            if done(state) {
                return Some(state);
            }
        }
        warn!(
            "power sequencer did not settle after {} polls",
            config.pwrseq_poll_iterations
        );
        None
    }

    fn tmds_power(ctx: &DigContext<'_>, state: PowerState) {
        match state {
            PowerState::On => {
                Self::start_pll(ctx);
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_MODE, LVTMA_MODE);
                ctx.mask(LVTMA_TRANSMITTER_ENABLE, LVTMA_LNKL, LVTMA_LNK_ALL);
                if ctx.dig.dual_link {
                    ctx.delay_us(28);
                    ctx.mask(LVTMA_TRANSMITTER_ENABLE, LVTMA_LNKU, LVTMA_LNKU);
                }
            }
            PowerState::Reset => {
                ctx.mask(LVTMA_TRANSMITTER_ENABLE, 0, LVTMA_LNK_ALL);
            }
            PowerState::Shutdown => {
                ctx.mask(LVTMA_TRANSMITTER_ENABLE, 0, LVTMA_LNK_ALL);
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_PLL_RESET, LVTMA_PLL_RESET);
                ctx.delay_us(10);
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, 0, LVTMA_PLL_RESET);
                ctx.mask(LVTMA_DATA_SYNCHRONIZATION, 0, LVTMA_DSYNSEL);
                ctx.write(LVTMA_TRANSMITTER_ADJUST, 0);
            }
        }
    }

    fn lvds_power(ctx: &DigContext<'_>, state: PowerState) {
        match state {
            PowerState::On => {
                Self::start_pll(ctx);
                ctx.mask(
                    LVTMA_PWRSEQ_CNTL,
                    LVTMA_PWRSEQ_DISABLE_SYNCEN_CONTROL_OF_TX_EN,
                    LVTMA_PWRSEQ_DISABLE_SYNCEN_CONTROL_OF_TX_EN,
                );
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, 0, LVTMA_MODE);

                let lvds = &ctx.dig.lvds;
                ctx.mask(
                    LVTMA_TRANSMITTER_ENABLE,
                    lvds_link_mask(ctx.dig.dual_link, lvds.dither.lvds_24bit),
                    LVTMA_LNK_ALL,
                );
                ctx.mask(LVTMA_PWRSEQ_CNTL, 0, LVTMA_DIGON_OVRD | LVTMA_BLON_OVRD);
                ctx.mask(LVTMA_PWRSEQ_REF_DIV, LVTMA_PWRSEQ_REF_DIV_VALUE, 0xffff);

                let de_to_bl = lvds.de_to_bl.wrapping_mul(10) / 4;
                let dig_to_de = lvds.dig_to_de.wrapping_mul(10) / 4;
                ctx.write(
                    LVTMA_PWRSEQ_DELAY1,
                    (dig_to_de << 24) | dig_to_de | (de_to_bl << 8) | (de_to_bl << 16),
                );
                ctx.write(LVTMA_PWRSEQ_DELAY2, lvds.off_delay / 4);
                ctx.mask(
                    LVTMA_PWRSEQ_CNTL,
                    0,
                    LVTMA_PWRSEQ_DISABLE_SYNCEN_CONTROL_OF_TX_EN,
                );

                Self::wait_for_sequencer(ctx, |s| {
                    s <= PWRSEQ_POWERUP_DONE || s >= PWRSEQ_POWERDOWN_DONE
                });
                ctx.mask(
                    LVTMA_PWRSEQ_CNTL,
                    LVTMA_PWRSEQ_TARGET_STATE,
                    LVTMA_PWRSEQ_TARGET_STATE,
                );
            }
            PowerState::Reset => {
                ctx.mask(
                    LVTMA_PWRSEQ_CNTL,
                    0,
                    LVTMA_PWRSEQ_TARGET_STATE | LVTMA_DIGON_OVRD | LVTMA_BLON_OVRD,
                );
                Self::wait_for_sequencer(ctx, |s| s >= PWRSEQ_POWERDOWN_DONE);
            }
            PowerState::Shutdown => {
                Self::lvds_power(ctx, PowerState::Reset);
                ctx.write(LVTMA_TRANSMITTER_ADJUST, LVTMA_ADJUST_POWERDOWN);
                ctx.write(LVTMA_MACRO_CONTROL, LVTMA_MACRO_POWERDOWN);
            }
        }
    }
}

impl Transmitter for LvtmaTransmitter {
    fn name(&self) -> &'static str {
        match self.link {
            LvtmaLink::Tmds => "LVTMA/TMDS",
            LvtmaLink::Lvds => "LVTMA/LVDS",
        }
    }

    fn mode(&mut self, ctx: &mut DigContext<'_>, mode: &DisplayMode) {
        match self.link {
            LvtmaLink::Tmds => {
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_USE_CLK_DATA, LVTMA_USE_CLK_DATA);
                Self::program_electrical(ctx, mode);
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_IDSCKSEL, LVTMA_IDSCKSEL);
            }
            LvtmaLink::Lvds => {
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, 0, LVTMA_USE_CLK_DATA);
                Self::program_electrical(ctx, mode);
                ctx.mask(LVTMA_TRANSMITTER_CONTROL, LVTMA_IDSCKSEL, LVTMA_IDSCKSEL);
                let pwrseq = LVTMA_PWRSEQ_EN | LVTMA_PLL_ENABLE_PWRSEQ_MASK | LVTMA_PLL_RESET_PWRSEQ_MASK;
                ctx.mask(LVTMA_PWRSEQ_CNTL, pwrseq, pwrseq);
            }
        }
    }

    fn power(&mut self, ctx: &mut DigContext<'_>, state: PowerState) {
        debug!("{} power {}", self.name(), state.name());
        match self.link {
            LvtmaLink::Tmds => Self::tmds_power(ctx, state),
            LvtmaLink::Lvds => Self::lvds_power(ctx, state),
        }
    }

    fn save(&mut self, ctx: &mut DigContext<'_>) {
        let pwrseq = (self.link == LvtmaLink::Lvds).then(|| PowerSequencerRegs {
            cntl: ctx.read(LVTMA_PWRSEQ_CNTL),
            ref_div: ctx.read(LVTMA_PWRSEQ_REF_DIV),
            delay1: ctx.read(LVTMA_PWRSEQ_DELAY1),
            delay2: ctx.read(LVTMA_PWRSEQ_DELAY2),
        });
        self.saved = Some(SavedRegs {
            control: ctx.read(LVTMA_TRANSMITTER_CONTROL),
            adjust: ctx.read(LVTMA_TRANSMITTER_ADJUST),
            preemphasis: ctx.read(LVTMA_PREEMPHASIS_CONTROL),
            macro_control: ctx.read(LVTMA_MACRO_CONTROL),
            data_sync: ctx.read(LVTMA_DATA_SYNCHRONIZATION),
            enable: ctx.read(LVTMA_TRANSMITTER_ENABLE),
            pwrseq,
        });
    }

    fn restore(&mut self, ctx: &mut DigContext<'_>) {
        let Some(saved) = self.saved else {
            warn!("{}: no registers stored", self.name());
            return;
        };

        ctx.write(LVTMA_TRANSMITTER_CONTROL, saved.control);
        ctx.delay_us(14);
        ctx.write(LVTMA_TRANSMITTER_CONTROL, saved.control | LVTMA_PLL_RESET);
        ctx.delay_us(10);
        ctx.write(LVTMA_TRANSMITTER_CONTROL, saved.control);
        ctx.delay_us(1000);
        ctx.write(LVTMA_TRANSMITTER_ADJUST, saved.adjust);
        ctx.write(LVTMA_PREEMPHASIS_CONTROL, saved.preemphasis);
        ctx.write(LVTMA_MACRO_CONTROL, saved.macro_control);

        ctx.write(
            LVTMA_DATA_SYNCHRONIZATION,
            (saved.data_sync & !LVTMA_DSYNSEL) | LVTMA_PFREQCHG,
        );
        ctx.delay_us(1);
        ctx.write(LVTMA_DATA_SYNCHRONIZATION, saved.data_sync);
        ctx.delay_us(10);
        ctx.write(LVTMA_DATA_SYNCHRONIZATION, saved.data_sync);
        ctx.write(LVTMA_TRANSMITTER_ENABLE, saved.enable);

        if let Some(pwrseq) = saved.pwrseq {
            ctx.write(LVTMA_PWRSEQ_REF_DIV, pwrseq.ref_div);
            ctx.write(LVTMA_PWRSEQ_DELAY1, pwrseq.delay1);
            ctx.write(LVTMA_PWRSEQ_DELAY2, pwrseq.delay2);
            ctx.write(LVTMA_PWRSEQ_CNTL, pwrseq.cntl);
        }
    }

    fn destroy(&mut self) {
        self.saved = None;
    }
}
