//! DIG Output Control Core
//!
//! This crate configures, powers and sequences the DIG digital outputs of a
//! display adapter: the encoder that routes a CRTC into one of two DIG
//! blocks, and the transmitter that drives TMDS or LVDS onto the wire.
//!
//! # Architecture
//!
//! Every output is an [`Output`] built by a [`DisplayAdapter`]. The adapter
//! owns what the outputs share (register access, firmware tables and the
//! [`SlotAllocator`] for the two encoder slots). An output owns:
//!
//! - a [`DigEncoder`], common to every DIG output
//! - a [`Transmitter`] backend, chosen from the output identity:
//!   - **LVTMA**: programmed register by register in TMDS or LVDS flavour
//!   - **UNIPHY / PCIE PHY**: driven through firmware command tables
//! - a [`PropertyControl`] handler for coherent mode, HDMI and backlight
//!
//! Mode and power-on run the encoder before the transmitter; reset and
//! shutdown run them in reverse.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use dig_core::{DisplayAdapter, EncoderSlot};
//! use dig_hw::{ConnectorType, DisplayMode, OutputId, PowerState};
//! use dig_sim::{SimCrtc, SimFirmware, SimRegisters};
//!
//! let regs = Arc::new(SimRegisters::new());
//! let adapter = Arc::new(
//!     DisplayAdapter::new(regs.clone(), regs.clone()).with_firmware(Arc::new(SimFirmware::new())),
//! );
//!
//! let mut output = adapter
//!     .create_output(OutputId::UniphyA, ConnectorType::Dvi, None)
//!     .unwrap();
//! assert_eq!(output.allocate().unwrap(), EncoderSlot::Dig1);
//!
//! output.attach_crtc(Arc::new(SimCrtc::new(0)));
//! output.mode(&DisplayMode::new("1920x1080", 148_500, 1920, 1080)).unwrap();
//! output.power(PowerState::On);
//! ```

pub mod adapter;
pub mod allocator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod output;
pub mod panel;
pub mod property;
pub mod state;
pub mod transmitter;

pub use adapter::DisplayAdapter;
pub use allocator::{SlotAllocator, SlotEvent};
pub use config::DigConfig;
pub use encoder::DigEncoder;
pub use error::{DigError, PropertyError};
pub use output::{AllocOp, Output};
pub use panel::PanelInfo;
pub use property::{
    FirmwareBacklight, LvdsBacklight, OutputProperty, PropertyAction, PropertyControl,
    PropertyReply, PropertyValue, TmdsProperties,
};
pub use state::{DigState, LvdsParams, OutputHandle, OutputInfo};
pub use transmitter::{
    lvds_link_mask, AtomTransmitter, DigContext, LvtmaLink, LvtmaTransmitter, Transmitter,
};

// Hardware types that appear in this crate's API
pub use dig_hw::{EncoderSlot, ModeStatus, PowerState};
