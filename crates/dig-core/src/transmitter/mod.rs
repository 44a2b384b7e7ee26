//! Transmitter backends
//!
//! A transmitter drives the electrical front end behind a DIG encoder. Two
//! implementations exist:
//!
//! - [`LvtmaTransmitter`]: the dedicated LVTMA block, programmed register by
//!   register in either TMDS or LVDS flavour
//! - [`AtomTransmitter`]: a UNIPHY or PCIE PHY driven through firmware
//!   command tables
//!
//! The implementation is chosen when the output is built and never changes.

mod atom;
mod lvtma;

pub use atom::AtomTransmitter;
pub use lvtma::{lvds_link_mask, LvtmaLink, LvtmaTransmitter};
pub(crate) use lvtma::program_backlight;

use dig_hw::{ConnectorType, Delay, DisplayMode, EncoderSlot, ModeStatus, PowerState, RegisterIo};

use crate::adapter::DisplayAdapter;
use crate::state::{DigState, OutputInfo};

/// Everything a backend may touch during one operation
pub struct DigContext<'a> {
    pub adapter: &'a DisplayAdapter,
    pub output: OutputInfo,
    pub dig: &'a mut DigState,
}

impl DigContext<'_> {
    pub fn regs(&self) -> &dyn RegisterIo {
        self.adapter.regs()
    }

    pub fn delay_us(&self, us: u32) {
        self.adapter.delay().delay_us(us);
    }

    /// Read-modify-write shorthand
    pub fn mask(&self, reg: u32, value: u32, mask: u32) {
        self.adapter.regs().mask(reg, value, mask);
    }

    pub fn write(&self, reg: u32, value: u32) {
        self.adapter.regs().write(reg, value);
    }

    pub fn read(&self, reg: u32) -> u32 {
        self.adapter.regs().read(reg)
    }
}

/// Electrical front end of a DIG output
pub trait Transmitter: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Check the mode against the link's electrical limits
    fn mode_valid(&self, ctx: &DigContext<'_>, mode: &DisplayMode) -> ModeStatus {
        single_link_mode_valid(ctx, mode)
    }

    /// Program the electrical parameters for `mode`
    fn mode(&mut self, ctx: &mut DigContext<'_>, mode: &DisplayMode);

    fn power(&mut self, ctx: &mut DigContext<'_>, state: PowerState);

    fn save(&mut self, ctx: &mut DigContext<'_>);

    /// Replay the saved state; a no-op if nothing was saved
    fn restore(&mut self, ctx: &mut DigContext<'_>);

    /// Release backend state
    fn destroy(&mut self) {}

    /// Called when the allocator grants or revokes an encoder slot
    fn encoder_assigned(&mut self, _slot: Option<EncoderSlot>) {}
}

/// Single-link DVI connectors cannot carry clocks above the dual-link
/// threshold
pub(crate) fn single_link_mode_valid(ctx: &DigContext<'_>, mode: &DisplayMode) -> ModeStatus {
    if ctx.output.connector == ConnectorType::DviSingle
        && ctx.adapter.config().needs_dual_link(mode.clock_khz)
    {
        return ModeStatus::ClockHigh;
    }
    ModeStatus::Ok
}
