//! DIG Output Simulation Library
//!
//! This crate provides stand-ins for the hardware and firmware a DIG output
//! talks to, so the encoder and transmitter backends can be exercised
//! without a GPU:
//!
//! - **SimRegisters**: a register file recording every read, write and delay
//! - **SimFirmware**: golden-settings table, transmitter command log, LVDS,
//!   PCIE lane and backlight answers
//! - **SimHdmi / SimCrtc**: recording display-pipeline collaborators
//!
//! # Example
//!
//! ```rust
//! use dig_hw::{Delay, RegisterIo};
//! use dig_sim::{Access, SimRegisters};
//!
//! let regs = SimRegisters::new();
//! regs.write(0x7F00, 0x1);
//! regs.delay_us(14);
//!
//! assert_eq!(
//!     regs.trace(),
//!     vec![Access::Write { reg: 0x7F00, value: 0x1 }, Access::Delay { us: 14 }]
//! );
//! ```

pub mod firmware;
pub mod pipeline;
pub mod registers;

pub use firmware::{
    BacklightLog, GoldenEntry, LaneEntry, LvdsEntry, SimBacklight, SimFirmware, SimFirmwareConfig,
    TransmitterCommand,
};
pub use pipeline::{HdmiCall, SimCrtc, SimHdmi};
pub use registers::{Access, SimRegisters};
