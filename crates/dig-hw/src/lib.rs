//! DIG Output Hardware Library
//!
//! This crate describes the hardware a DIG display output is built from:
//!
//! - **Register map**: DIG encoder banks, LVTMA transmitter, clocking and
//!   link-steering registers ([`regs`])
//! - **Value types**: modes, encoder modes, connector types, encoder slots,
//!   power states
//! - **Collaborators**: register access, delays, the firmware command-table
//!   interpreter, the HDMI controller and the CRTC
//!
//! # Architecture
//!
//! Backends never touch memory directly. All register traffic goes through
//! [`RegisterIo`] and all settle times through [`Delay`], so the same code
//! runs against [`mmio::MmioRegisters`] on hardware and against a simulated
//! register file in tests.
//!
//! # Example
//!
//! ```rust
//! use dig_hw::{EncoderMode, GoldenSettingsKey};
//!
//! let key = GoldenSettingsKey::new(148_500, false, EncoderMode::TmdsHdmi, true);
//! assert_eq!(key.value() & 0xffff, 14_850);
//! assert!(key.coherent());
//! ```

pub mod collab;
pub mod error;
pub mod firmware;
pub mod mmio;
pub mod regs;
pub mod types;

pub use collab::{Crtc, HdmiController};
pub use error::FirmwareError;
pub use firmware::{
    BacklightControl, DataTable, FirmwareTables, GoldenSettings, GoldenSettingsKey, LinkCount,
    LvdsQuery, PcieLanes, TransmitterAction, TransmitterConfig, TransmitterId, TransmitterLink,
};
pub use types::{
    ConnectorType, DisplayMode, EncoderMode, EncoderSlot, FmtDither, ModeStatus, OutputId,
    PowerState,
};

/// 32-bit register access
pub trait RegisterIo: Send + Sync {
    fn read(&self, reg: u32) -> u32;

    fn write(&self, reg: u32, value: u32);

    /// Read-modify-write: replace the bits selected by `mask` with `value`
    fn mask(&self, reg: u32, value: u32, mask: u32) {
        let old = self.read(reg);
        self.write(reg, (old & !mask) | (value & mask));
    }
}

/// Blocking hardware settle time
pub trait Delay: Send + Sync {
    /// Busy-wait or sleep for `us` microseconds
    fn delay_us(&self, us: u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct OneReg(Mutex<u32>);

    impl RegisterIo for OneReg {
        fn read(&self, _reg: u32) -> u32 {
            *self.0.lock().unwrap()
        }

        fn write(&self, _reg: u32, value: u32) {
            *self.0.lock().unwrap() = value;
        }
    }

    #[test]
    fn test_mask_keeps_unselected_bits() {
        let reg = OneReg(Mutex::new(0xffff_0000));
        reg.mask(0, 0x0000_00ff, 0x0001_00ff);
        assert_eq!(reg.read(0), 0xfffe_00ff);
    }
}
