//! DIG output facade
//!
//! An [`Output`] owns one encoder, one transmitter and the DIG state they
//! share, and sequences them in the order the hardware requires.

use std::sync::Arc;

use dig_hw::{
    ConnectorType, Crtc, DisplayMode, EncoderMode, EncoderSlot, HdmiController, ModeStatus,
    OutputId, PowerState, TransmitterId, TransmitterLink,
};
use tracing::{debug, info, warn};

use crate::adapter::DisplayAdapter;
use crate::encoder::DigEncoder;
use crate::error::{DigError, PropertyError};
use crate::panel;
use crate::property::{
    FirmwareBacklight, LvdsBacklight, OutputProperty, PropertyAction, PropertyControl,
    PropertyReply, TmdsProperties,
};
use crate::state::{DigState, OutputHandle, OutputInfo};
use crate::transmitter::{
    AtomTransmitter, DigContext, LvtmaLink, LvtmaTransmitter, Transmitter,
};

/// Slot request passed to [`Output::alloc_free`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocOp {
    Allocate,
    Free,
}

/// A DIG display output: encoder, transmitter and their shared state
pub struct Output {
    adapter: Arc<DisplayAdapter>,
    info: OutputInfo,
    dig: DigState,
    encoder: DigEncoder,
    transmitter: Box<dyn Transmitter>,
    properties: Option<Box<dyn PropertyControl>>,
    hdmi: Option<Box<dyn HdmiController>>,
    crtc: Option<Arc<dyn Crtc>>,
    destroyed: bool,
}

macro_rules! context {
    ($output:ident) => {
        DigContext {
            adapter: &*$output.adapter,
            output: $output.info,
            dig: &mut $output.dig,
        }
    };
}

impl Output {
    pub(crate) fn new(
        adapter: Arc<DisplayAdapter>,
        id: OutputId,
        connector: ConnectorType,
        hdmi: Option<Box<dyn HdmiController>>,
    ) -> Result<Self, DigError> {
        let encoder_mode = match connector {
            ConnectorType::Panel => EncoderMode::Lvds,
            ConnectorType::Dvi | ConnectorType::DviSingle => EncoderMode::TmdsDvi,
            ConnectorType::Tv => return Err(DigError::unsupported_connector(id, connector)),
        };

        let (transmitter, mut properties): (Box<dyn Transmitter>, Box<dyn PropertyControl>) =
            match id {
                OutputId::UniphyA | OutputId::UniphyB => {
                    let Some(firmware) = adapter.firmware() else {
                        return Err(DigError::UnsupportedConfiguration(format!(
                            "{} needs firmware tables",
                            id
                        )));
                    };
                    let (link, lane_index) = if id == OutputId::UniphyA {
                        (TransmitterLink::A, 1)
                    } else {
                        (TransmitterLink::B, 2)
                    };
                    let (tid, lanes) = if adapter.is_igp() {
                        let lanes = firmware.pcie_lanes(lane_index).ok_or_else(|| {
                            DigError::UnsupportedConfiguration(format!(
                                "no PCIE lane info for {}",
                                id
                            ))
                        })?;
                        // docking lanes are not handled
                        (TransmitterId::PciePhy, Some(lanes.chassis))
                    } else {
                        (TransmitterId::Uniphy, None)
                    };
                    (
                        Box::new(AtomTransmitter::new(tid, link, lanes)),
                        Box::new(TmdsProperties),
                    )
                }
                OutputId::Lvtma if connector == ConnectorType::Panel => (
                    Box::new(LvtmaTransmitter::new(LvtmaLink::Lvds)),
                    Box::new(LvdsBacklight),
                ),
                OutputId::Lvtma => (
                    Box::new(LvtmaTransmitter::new(LvtmaLink::Tmds)),
                    Box::new(TmdsProperties),
                ),
                _ => {
                    return Err(DigError::UnsupportedConfiguration(format!(
                        "{} is not a DIG output",
                        id
                    )))
                }
            };

        let mut dig = DigState::new(encoder_mode);
        let hdmi = match connector {
            ConnectorType::Panel => {
                let slot = adapter.probe_encoder(id).unwrap_or(EncoderSlot::Dig1);
                let panel = panel::discover(&adapter, slot);
                dig.lvds = panel.lvds;
                dig.dual_link = panel.dual_link;

                if dig.lvds.backlight_level.is_none() {
                    if let Some(control) = adapter
                        .firmware()
                        .and_then(|firmware| firmware.backlight_control(id))
                    {
                        debug!("{}: backlight served by firmware", id);
                        properties = Box::new(FirmwareBacklight::new(control));
                    }
                }
                None
            }
            _ => hdmi,
        };

        let info = OutputInfo {
            id,
            handle: adapter.next_handle(),
            connector,
        };
        info!(
            "created {} ({}) with {} transmitter",
            id,
            info.handle,
            transmitter.name()
        );

        Ok(Self {
            adapter,
            info,
            dig,
            encoder: DigEncoder::new(),
            transmitter,
            properties: Some(properties),
            hdmi,
            crtc: None,
            destroyed: false,
        })
    }

    pub fn id(&self) -> OutputId {
        self.info.id
    }

    pub fn handle(&self) -> OutputHandle {
        self.info.handle
    }

    pub fn connector(&self) -> ConnectorType {
        self.info.connector
    }

    pub fn info(&self) -> OutputInfo {
        self.info
    }

    /// Shared DIG state
    pub fn dig(&self) -> &DigState {
        &self.dig
    }

    /// Name of the transmitter backend
    pub fn transmitter_name(&self) -> &'static str {
        self.transmitter.name()
    }

    pub fn adapter(&self) -> &Arc<DisplayAdapter> {
        &self.adapter
    }

    /// Set the CRTC that feeds this output
    pub fn attach_crtc(&mut self, crtc: Arc<dyn Crtc>) {
        debug!("{}: attached to CRTC {}", self.info.id, crtc.id());
        self.crtc = Some(crtc);
    }

    /// Check a mode; transmitter limits take priority over the encoder
    pub fn mode_valid(&mut self, mode: &DisplayMode) -> ModeStatus {
        let ctx = context!(self);
        match self.transmitter.mode_valid(&ctx, mode) {
            ModeStatus::Ok => self.encoder.mode_valid(&ctx, mode),
            status => status,
        }
    }

    /// Program `mode`: routing first, then the electrical front end
    pub fn mode(&mut self, mode: &DisplayMode) -> Result<(), DigError> {
        let crtc = self.crtc.clone().ok_or(DigError::NoCrtc(self.info.id))?;

        self.dig.mode = Some(mode.clone());
        if self.info.connector == ConnectorType::Dvi {
            self.dig.dual_link = self.adapter.config().needs_dual_link(mode.clock_khz);
        }
        debug!(
            "{}: mode {} ({} link)",
            self.info.id,
            mode,
            if self.dig.dual_link { "dual" } else { "single" }
        );

        let mut ctx = context!(self);
        self.encoder.mode(&mut ctx, crtc.as_ref(), mode);
        self.transmitter.mode(&mut ctx, mode);
        if let Some(hdmi) = self.hdmi.as_mut() {
            hdmi.set_mode(mode);
        }
        Ok(())
    }

    pub fn power(&mut self, state: PowerState) {
        info!("{} power {}", self.info.id, state.name());
        let mut ctx = context!(self);
        match state {
            PowerState::On => {
                self.encoder.power(&mut ctx, state);
                self.transmitter.power(&mut ctx, state);
                let hdmi_mode = ctx.dig.encoder_mode == EncoderMode::TmdsHdmi;
                if let Some(hdmi) = self.hdmi.as_mut() {
                    hdmi.enable(hdmi_mode);
                }
            }
            PowerState::Reset => {
                self.transmitter.power(&mut ctx, state);
                self.encoder.power(&mut ctx, state);
            }
            PowerState::Shutdown => {
                self.transmitter.power(&mut ctx, state);
                self.encoder.power(&mut ctx, state);
                if let Some(hdmi) = self.hdmi.as_mut() {
                    hdmi.enable(false);
                }
            }
        }
    }

    pub fn save(&mut self) {
        let mut ctx = context!(self);
        self.encoder.save(&mut ctx);
        self.transmitter.save(&mut ctx);
        if let Some(hdmi) = self.hdmi.as_mut() {
            hdmi.save();
        }
    }

    pub fn restore(&mut self) {
        let mut ctx = context!(self);
        self.encoder.restore(&mut ctx);
        self.transmitter.restore(&mut ctx);
        if let Some(hdmi) = self.hdmi.as_mut() {
            hdmi.restore();
        }
    }

    /// Run a property request
    ///
    /// Committing a TMDS property reprograms the last mode and powers the
    /// output back on.
    pub fn property(
        &mut self,
        action: PropertyAction,
        property: OutputProperty,
    ) -> Result<PropertyReply, DigError> {
        if !matches!(
            property,
            OutputProperty::Coherent | OutputProperty::Backlight | OutputProperty::Hdmi
        ) {
            return Err(PropertyError::Unsupported(property).into());
        }
        let Some(properties) = self.properties.as_mut() else {
            return Err(PropertyError::Unsupported(property).into());
        };

        let mut ctx = context!(self);
        match properties.handle(&mut ctx, action, property)? {
            PropertyReply::Reprogram => {
                let mode = self.dig.mode.clone().ok_or(PropertyError::NoModeProgrammed)?;
                self.mode(&mode)?;
                self.power(PowerState::On);
                Ok(PropertyReply::Done)
            }
            reply => Ok(reply),
        }
    }

    /// Claim or release a DIG encoder slot
    pub fn alloc_free(&mut self, op: AllocOp) -> Result<Option<EncoderSlot>, DigError> {
        match op {
            AllocOp::Allocate => self.allocate().map(Some),
            AllocOp::Free => self.free().map(|_| None),
        }
    }

    pub fn allocate(&mut self) -> Result<EncoderSlot, DigError> {
        if let Some(slot) = self.dig.encoder_slot {
            return Ok(slot);
        }
        let slot = self
            .adapter
            .slots()
            .allocate(self.info.handle, self.info.id)?;
        self.dig.encoder_slot = Some(slot);
        self.transmitter.encoder_assigned(Some(slot));
        Ok(slot)
    }

    pub fn free(&mut self) -> Result<EncoderSlot, DigError> {
        self.dig.encoder_slot = None;
        self.transmitter.encoder_assigned(None);
        self.adapter
            .slots()
            .free(self.info.handle)
            .ok_or(DigError::NotAllocated(self.info.id))
    }

    /// Tear the output down and give back its slot
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.encoder.destroy();
        self.transmitter.destroy();
        if let Some(mut hdmi) = self.hdmi.take() {
            hdmi.destroy();
        }
        if let Some(mut properties) = self.properties.take() {
            properties.release();
        }
        if let Some(slot) = self.adapter.slots().free(self.info.handle) {
            warn!("{} destroyed while holding {}", self.info.id, slot);
        }
        self.dig.encoder_slot = None;
        debug!("destroyed {} ({})", self.info.id, self.info.handle);
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("info", &self.info)
            .field("transmitter", &self.transmitter.name())
            .field("dig", &self.dig)
            .field("hdmi", &self.hdmi.is_some())
            .field("crtc", &self.crtc.as_ref().map(|c| c.id()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dig_hw::{regs, LvdsQuery, PcieLanes, TransmitterAction};
    use dig_sim::{HdmiCall, SimCrtc, SimFirmware, SimHdmi, SimRegisters};

    struct Fixture {
        regs: Arc<SimRegisters>,
        fw: Arc<SimFirmware>,
        adapter: Arc<DisplayAdapter>,
    }

    fn fixture(igp: bool) -> Fixture {
        let regs = Arc::new(SimRegisters::new());
        let fw = Arc::new(SimFirmware::new());
        let adapter = Arc::new(
            DisplayAdapter::new(regs.clone(), regs.clone())
                .with_firmware(fw.clone())
                .with_igp(igp),
        );
        Fixture { regs, fw, adapter }
    }

    fn mode(clock_khz: u32) -> DisplayMode {
        DisplayMode::new("test", clock_khz, 1920, 1080)
    }

    #[test]
    fn test_rejects_tv_and_non_dig() {
        let f = fixture(false);
        assert!(matches!(
            f.adapter.create_output(OutputId::UniphyA, ConnectorType::Tv, None),
            Err(DigError::UnsupportedConfiguration(_))
        ));
        assert!(matches!(
            f.adapter.create_output(OutputId::DacA, ConnectorType::Dvi, None),
            Err(DigError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_uniphy_needs_firmware() {
        let regs = Arc::new(SimRegisters::new());
        let adapter = Arc::new(DisplayAdapter::new(regs.clone(), regs));
        assert!(matches!(
            adapter.create_output(OutputId::UniphyB, ConnectorType::Dvi, None),
            Err(DigError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_igp_needs_lane_info() {
        let f = fixture(true);
        assert!(f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .is_err());

        f.fw.set_pcie_lanes(1, PcieLanes { chassis: 0xf, docking: 0xf0 });
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(output.transmitter_name(), "PCIEPHY");

        output.allocate().unwrap();
        output.power(PowerState::On);
        let commands = f.fw.commands();
        assert_eq!(commands[0].config.lanes, Some(0xf));
        assert_eq!(commands[0].config.encoder, Some(EncoderSlot::Dig1));
    }

    #[test]
    fn test_mode_requires_crtc() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::Lvtma, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(
            output.mode(&mode(108_000)),
            Err(DigError::NoCrtc(OutputId::Lvtma))
        );
        assert!(f.regs.writes().is_empty());
    }

    #[test]
    fn test_dvi_dual_link_follows_clock() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .unwrap();
        output.attach_crtc(Arc::new(SimCrtc::new(0)));

        output.mode(&mode(165_001)).unwrap();
        assert!(output.dig().dual_link);
        output.mode(&mode(165_000)).unwrap();
        assert!(!output.dig().dual_link);
    }

    #[test]
    fn test_single_link_dvi_never_goes_dual() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyB, ConnectorType::DviSingle, None)
            .unwrap();
        output.attach_crtc(Arc::new(SimCrtc::new(1)));

        assert_eq!(output.mode_valid(&mode(200_000)), ModeStatus::ClockHigh);
        output.mode(&mode(200_000)).unwrap();
        assert!(!output.dig().dual_link);
    }

    #[test]
    fn test_power_orders_hdmi() {
        let f = fixture(false);
        let hdmi = SimHdmi::new();
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::DviSingle, Some(Box::new(hdmi.clone())))
            .unwrap();
        output.allocate().unwrap();

        output.power(PowerState::On);
        output.power(PowerState::Reset);
        output.power(PowerState::Shutdown);

        assert_eq!(hdmi.calls(), vec![HdmiCall::Enable(false), HdmiCall::Enable(false)]);
        assert_eq!(
            f.fw.actions(),
            vec![
                TransmitterAction::Enable,
                TransmitterAction::EnableOutput,
                TransmitterAction::DisableOutput,
                TransmitterAction::DisableOutput,
                TransmitterAction::Disable,
            ]
        );
    }

    #[test]
    fn test_panel_drops_hdmi_and_discovers() {
        let f = fixture(false);
        f.fw.set_lvds_info(LvdsQuery::DualLink, 1);
        let hdmi = SimHdmi::new();
        let mut output = f
            .adapter
            .create_output(OutputId::Lvtma, ConnectorType::Panel, Some(Box::new(hdmi.clone())))
            .unwrap();

        assert_eq!(output.dig().encoder_mode, EncoderMode::Lvds);
        assert!(output.dig().dual_link);
        output.power(PowerState::Shutdown);
        assert!(hdmi.calls().is_empty());
    }

    #[test]
    fn test_panel_uses_firmware_backlight_when_register_unset() {
        let f = fixture(false);
        let backlight = f.fw.offer_backlight(40);
        let mut output = f
            .adapter
            .create_output(OutputId::Lvtma, ConnectorType::Panel, None)
            .unwrap();

        assert_eq!(
            output.property(PropertyAction::Get, OutputProperty::Backlight),
            Ok(PropertyReply::Value(crate::property::PropertyValue::Integer(40)))
        );
        output.destroy();
        assert!(backlight.log().released);
    }

    #[test]
    fn test_register_backlight_wins_over_firmware() {
        let f = fixture(false);
        f.regs.set(regs::LVTMA_BL_MOD_CNTL, (0x33 << 8) | regs::LVTMA_BL_MOD_EN);
        let backlight = f.fw.offer_backlight(40);
        let mut output = f
            .adapter
            .create_output(OutputId::Lvtma, ConnectorType::Panel, None)
            .unwrap();

        assert_eq!(
            output.property(PropertyAction::Get, OutputProperty::Backlight),
            Ok(PropertyReply::Value(crate::property::PropertyValue::Integer(0x33)))
        );
        drop(output);
        assert!(!backlight.log().released);
    }

    #[test]
    fn test_audio_workaround_is_never_delegated() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(
            output.property(PropertyAction::Check, OutputProperty::AudioWorkaround),
            Err(DigError::Property(PropertyError::Unsupported(
                OutputProperty::AudioWorkaround
            )))
        );
    }

    #[test]
    fn test_commit_without_mode() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(
            output.property(PropertyAction::Commit, OutputProperty::Coherent),
            Err(DigError::Property(PropertyError::NoModeProgrammed))
        );
    }

    #[test]
    fn test_free_without_allocation() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(
            output.alloc_free(AllocOp::Free),
            Err(DigError::NotAllocated(OutputId::UniphyA))
        );
    }

    #[test]
    fn test_drop_releases_slot() {
        let f = fixture(false);
        let mut output = f
            .adapter
            .create_output(OutputId::UniphyB, ConnectorType::Dvi, None)
            .unwrap();
        assert_eq!(output.alloc_free(AllocOp::Allocate), Ok(Some(EncoderSlot::Dig1)));
        drop(output);
        assert_eq!(f.adapter.slot_owner(EncoderSlot::Dig1), None);
    }
}
