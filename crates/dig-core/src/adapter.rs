//! Display adapter context
//!
//! Owns everything the DIG outputs of one GPU share: register access, the
//! delay source, the firmware interpreter and the encoder slot table.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dig_hw::{
    regs, ConnectorType, Delay, EncoderSlot, FirmwareTables, HdmiController, OutputId, RegisterIo,
};
use tracing::{debug, Level};

use crate::allocator::{SlotAllocator, SlotEvent};
use crate::config::DigConfig;
use crate::error::DigError;
use crate::output::Output;
use crate::state::OutputHandle;

/// Shared context of all DIG outputs on one adapter
pub struct DisplayAdapter {
    regs: Arc<dyn RegisterIo>,
    delay: Arc<dyn Delay>,
    firmware: Option<Arc<dyn FirmwareTables>>,
    is_igp: bool,
    config: DigConfig,
    slots: Mutex<SlotAllocator>,
    next_handle: AtomicU32,
}

impl DisplayAdapter {
    /// Create an adapter without firmware tables on a discrete chip
    pub fn new(regs: Arc<dyn RegisterIo>, delay: Arc<dyn Delay>) -> Self {
        Self {
            regs,
            delay,
            firmware: None,
            is_igp: false,
            config: DigConfig::default(),
            slots: Mutex::new(SlotAllocator::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    /// Attach the firmware command-table interpreter
    pub fn with_firmware(mut self, firmware: Arc<dyn FirmwareTables>) -> Self {
        self.firmware = Some(firmware);
        self
    }

    /// Mark the chip as an integrated (IGP) part
    pub fn with_igp(mut self, is_igp: bool) -> Self {
        self.is_igp = is_igp;
        self
    }

    pub fn with_config(mut self, config: DigConfig) -> Self {
        self.config = config;
        self
    }

    pub fn regs(&self) -> &dyn RegisterIo {
        self.regs.as_ref()
    }

    pub fn delay(&self) -> &dyn Delay {
        self.delay.as_ref()
    }

    pub fn firmware(&self) -> Option<&dyn FirmwareTables> {
        self.firmware.as_deref()
    }

    pub fn is_igp(&self) -> bool {
        self.is_igp
    }

    pub fn config(&self) -> &DigConfig {
        &self.config
    }

    /// Build a DIG output on this adapter
    pub fn create_output(
        self: &Arc<Self>,
        id: OutputId,
        connector: ConnectorType,
        hdmi: Option<Box<dyn HdmiController>>,
    ) -> Result<Output, DigError> {
        Output::new(Arc::clone(self), id, connector, hdmi)
    }

    pub(crate) fn next_handle(&self) -> OutputHandle {
        OutputHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn slots(&self) -> MutexGuard<'_, SlotAllocator> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Output currently holding `slot`
    pub fn slot_owner(&self, slot: EncoderSlot) -> Option<OutputHandle> {
        self.slots().owner(slot)
    }

    /// Take buffered slot events
    pub fn drain_slot_events(&self) -> Vec<SlotEvent> {
        self.slots().drain_events()
    }

    /// Find the encoder currently routed to `output` from the link steering
    ///
    /// Only used to recover a slot for an output that was never allocated
    /// one, e.g. when the firmware left it running.
    pub fn probe_encoder(&self, output: OutputId) -> Option<EncoderSlot> {
        if output.is_dedicated() {
            return Some(EncoderSlot::Dig2);
        }
        let swap = self.regs.read(regs::DCIO_LINK_STEER_CNTL) & regs::LINK_STEER_SWAP != 0;
        let slot = match (output, swap) {
            (OutputId::UniphyA, false) | (OutputId::UniphyB, true) => EncoderSlot::Dig1,
            (OutputId::UniphyA, true) | (OutputId::UniphyB, false) => EncoderSlot::Dig2,
            _ => return None,
        };
        debug!("detected {} for {}", slot, output);
        Some(slot)
    }

    /// Trace the control registers of both encoders
    pub(crate) fn log_dig_cntl(&self, context: &str) {
        if tracing::enabled!(Level::TRACE) {
            tracing::trace!(
                "{}: DIGn_CNTL: n=1: 0x{:x} n=2: 0x{:x}",
                context,
                self.regs.read(regs::DIG1_CNTL),
                self.regs.read(regs::DIG2_OFFSET + regs::DIG1_CNTL)
            );
        }
    }
}

impl std::fmt::Debug for DisplayAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayAdapter")
            .field("firmware", &self.firmware.is_some())
            .field("is_igp", &self.is_igp)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dig_sim::SimRegisters;

    fn adapter(steer: u32) -> DisplayAdapter {
        let regs = Arc::new(SimRegisters::with_values([(regs::DCIO_LINK_STEER_CNTL, steer)]));
        DisplayAdapter::new(regs.clone(), regs)
    }

    #[test]
    fn test_probe_without_swap() {
        let adapter = adapter(0);
        assert_eq!(adapter.probe_encoder(OutputId::UniphyA), Some(EncoderSlot::Dig1));
        assert_eq!(adapter.probe_encoder(OutputId::UniphyB), Some(EncoderSlot::Dig2));
        assert_eq!(adapter.probe_encoder(OutputId::Lvtma), Some(EncoderSlot::Dig2));
    }

    #[test]
    fn test_probe_with_swap() {
        let adapter = adapter(regs::LINK_STEER_SWAP);
        assert_eq!(adapter.probe_encoder(OutputId::UniphyA), Some(EncoderSlot::Dig2));
        assert_eq!(adapter.probe_encoder(OutputId::UniphyB), Some(EncoderSlot::Dig1));
        assert_eq!(adapter.probe_encoder(OutputId::Lvtma), Some(EncoderSlot::Dig2));
    }

    #[test]
    fn test_probe_non_dig_output() {
        assert_eq!(adapter(0).probe_encoder(OutputId::DacA), None);
    }

    #[test]
    fn test_handles_are_unique() {
        let adapter = adapter(0);
        let a = adapter.next_handle();
        let b = adapter.next_handle();
        assert_ne!(a, b);
    }
}
