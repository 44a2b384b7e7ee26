//! Firmware-table driven transmitter (UNIPHY / PCIE PHY)

use dig_hw::{
    DisplayMode, EncoderSlot, LinkCount, PowerState, TransmitterAction, TransmitterConfig,
    TransmitterId, TransmitterLink,
};
use tracing::{debug, error, warn};

use super::{DigContext, Transmitter};

/// Transmitter whose programming is owned by the firmware command tables
#[derive(Debug)]
pub struct AtomTransmitter {
    id: TransmitterId,
    config: TransmitterConfig,
}

impl AtomTransmitter {
    /// Create a transmitter on `link` with an optional PCIE lane mask
    pub fn new(id: TransmitterId, link: TransmitterLink, lanes: Option<u32>) -> Self {
        let mut config = TransmitterConfig::new(link);
        config.lanes = lanes;
        Self { id, config }
    }

    pub fn id(&self) -> TransmitterId {
        self.id
    }

    /// Config record sent with the next command
    pub fn config(&self) -> &TransmitterConfig {
        &self.config
    }

    fn link_count(ctx: &DigContext<'_>) -> LinkCount {
        if ctx.dig.dual_link {
            LinkCount::Dual
        } else {
            LinkCount::Single
        }
    }

    fn command(&self, ctx: &DigContext<'_>, action: TransmitterAction) {
        let Some(firmware) = ctx.adapter.firmware() else {
            error!("{}: no firmware tables for {:?}", ctx.output.id, action);
            return;
        };
        if let Err(e) = firmware.transmitter_control(self.id, action, &self.config) {
            error!("{}: {}", ctx.output.id, e);
        }
    }

    /// Recover the encoder slot for an output the allocator never served
    fn resolve_encoder(&mut self, ctx: &DigContext<'_>) -> Option<EncoderSlot> {
        if let Some(slot) = self.config.encoder {
            return Some(slot);
        }
        let slot = ctx.adapter.probe_encoder(ctx.output.id)?;
        if ctx.adapter.slots().taken_by_other(slot, ctx.output.handle) {
            warn!("{} for {} already taken", slot, ctx.output.id);
            return None;
        }
        self.config.encoder = Some(slot);
        Some(slot)
    }
}

impl Transmitter for AtomTransmitter {
    fn name(&self) -> &'static str {
        match self.id {
            TransmitterId::Uniphy => "UNIPHY",
            TransmitterId::PciePhy => "PCIEPHY",
        }
    }

    fn mode(&mut self, ctx: &mut DigContext<'_>, mode: &DisplayMode) {
        let count = Self::link_count(ctx);
        self.config.coherent = ctx.dig.coherent;
        self.config.pixel_clock_khz = mode.clock_khz;
        self.config.link_count = count;
        self.config.link = self.config.link.for_link_count(count);

        ctx.adapter.log_dig_cntl("atom transmitter set");
        self.command(ctx, TransmitterAction::Setup);
    }

    fn power(&mut self, ctx: &mut DigContext<'_>, state: PowerState) {
        self.config.link_count = Self::link_count(ctx);
        self.config.coherent = ctx.dig.coherent;

        if self.resolve_encoder(ctx).is_none() {
            return;
        }

        debug!("{} power {}", self.name(), state.name());
        match state {
            PowerState::On => {
                self.command(ctx, TransmitterAction::Enable);
                self.command(ctx, TransmitterAction::EnableOutput);
            }
            PowerState::Reset => {
                self.command(ctx, TransmitterAction::DisableOutput);
            }
            PowerState::Shutdown => {
                self.command(ctx, TransmitterAction::DisableOutput);
                self.command(ctx, TransmitterAction::Disable);
            }
        }
        ctx.adapter.log_dig_cntl("atom transmitter power");
    }

    fn save(&mut self, _ctx: &mut DigContext<'_>) {}

    fn restore(&mut self, _ctx: &mut DigContext<'_>) {}

    fn encoder_assigned(&mut self, slot: Option<EncoderSlot>) {
        self.config.encoder = slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use dig_hw::{regs, ConnectorType, EncoderMode, OutputId};
    use dig_sim::{SimFirmware, SimRegisters};

    use crate::adapter::DisplayAdapter;
    use crate::state::{DigState, OutputHandle, OutputInfo};

    fn setup() -> (Arc<SimRegisters>, Arc<SimFirmware>, DisplayAdapter) {
        let regs = Arc::new(SimRegisters::new());
        let fw = Arc::new(SimFirmware::new());
        let adapter = DisplayAdapter::new(regs.clone(), regs.clone()).with_firmware(fw.clone());
        (regs, fw, adapter)
    }

    fn info(id: OutputId, handle: u32) -> OutputInfo {
        OutputInfo {
            id,
            handle: OutputHandle(handle),
            connector: ConnectorType::Dvi,
        }
    }

    #[test]
    fn test_mode_remaps_links() {
        let (_regs, fw, adapter) = setup();
        let mut dig = DigState::new(EncoderMode::TmdsDvi);
        dig.dual_link = true;
        dig.coherent = true;
        let mut transmitter = AtomTransmitter::new(TransmitterId::Uniphy, TransmitterLink::B, None);
        let mut ctx = DigContext {
            adapter: &adapter,
            output: info(OutputId::UniphyB, 1),
            dig: &mut dig,
        };

        transmitter.mode(&mut ctx, &DisplayMode::new("2560x1600", 268_000, 2560, 1600));
        assert_eq!(transmitter.config().link, TransmitterLink::BA);
        assert_eq!(transmitter.config().link_count, LinkCount::Dual);

        ctx.dig.dual_link = false;
        transmitter.mode(&mut ctx, &DisplayMode::new("1280x1024", 108_000, 1280, 1024));
        assert_eq!(transmitter.config().link, TransmitterLink::B);

        let commands = fw.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].action, TransmitterAction::Setup);
        assert_eq!(commands[0].config.pixel_clock_khz, 268_000);
        assert!(commands[0].config.coherent);
        assert_eq!(commands[1].config.link_count, LinkCount::Single);
    }

    #[test]
    fn test_power_probes_encoder_lazily() {
        let (regs, fw, adapter) = setup();
        regs.set(regs::DCIO_LINK_STEER_CNTL, regs::LINK_STEER_SWAP);
        let mut dig = DigState::new(EncoderMode::TmdsDvi);
        let mut transmitter = AtomTransmitter::new(TransmitterId::Uniphy, TransmitterLink::A, None);
        let mut ctx = DigContext {
            adapter: &adapter,
            output: info(OutputId::UniphyA, 1),
            dig: &mut dig,
        };

        transmitter.power(&mut ctx, PowerState::On);

        assert_eq!(transmitter.config().encoder, Some(EncoderSlot::Dig2));
        assert_eq!(
            fw.actions(),
            vec![TransmitterAction::Enable, TransmitterAction::EnableOutput]
        );
    }

    #[test]
    fn test_power_refuses_slot_of_other_output() {
        let (_regs, fw, adapter) = setup();
        adapter
            .slots()
            .allocate(OutputHandle(7), OutputId::UniphyB)
            .unwrap();
        let mut dig = DigState::new(EncoderMode::TmdsDvi);
        let mut transmitter = AtomTransmitter::new(TransmitterId::Uniphy, TransmitterLink::A, None);
        let mut ctx = DigContext {
            adapter: &adapter,
            output: info(OutputId::UniphyA, 1),
            dig: &mut dig,
        };

        transmitter.power(&mut ctx, PowerState::On);

        assert_eq!(transmitter.config().encoder, None);
        assert!(fw.commands().is_empty());
    }

    #[test]
    fn test_power_states() {
        let (_regs, fw, adapter) = setup();
        let mut dig = DigState::new(EncoderMode::TmdsDvi);
        let mut transmitter = AtomTransmitter::new(TransmitterId::PciePhy, TransmitterLink::A, Some(0xf));
        transmitter.encoder_assigned(Some(EncoderSlot::Dig1));
        let mut ctx = DigContext {
            adapter: &adapter,
            output: info(OutputId::UniphyA, 1),
            dig: &mut dig,
        };

        transmitter.power(&mut ctx, PowerState::Reset);
        transmitter.power(&mut ctx, PowerState::Shutdown);

        assert_eq!(
            fw.actions(),
            vec![
                TransmitterAction::DisableOutput,
                TransmitterAction::DisableOutput,
                TransmitterAction::Disable
            ]
        );
        let commands = fw.commands();
        assert!(commands.iter().all(|c| c.id == TransmitterId::PciePhy));
        assert!(commands.iter().all(|c| c.config.lanes == Some(0xf)));
    }

    #[test]
    fn test_failed_command_is_not_fatal() {
        let (_regs, fw, adapter) = setup();
        fw.fail_commands(true);
        let mut dig = DigState::new(EncoderMode::TmdsDvi);
        let mut transmitter = AtomTransmitter::new(TransmitterId::Uniphy, TransmitterLink::A, None);
        transmitter.encoder_assigned(Some(EncoderSlot::Dig1));
        let mut ctx = DigContext {
            adapter: &adapter,
            output: info(OutputId::UniphyA, 1),
            dig: &mut dig,
        };

        transmitter.power(&mut ctx, PowerState::On);
        assert_eq!(fw.commands().len(), 2);
    }
}
