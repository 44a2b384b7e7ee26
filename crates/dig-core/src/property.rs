//! Output property protocol
//!
//! Properties are checked, read, staged with `Set` and applied with
//! `Commit`. Which properties an output has depends on its transmitter:
//! TMDS links expose coherent mode and HDMI, LVDS panels expose the
//! backlight.

use dig_hw::{BacklightControl, EncoderMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PropertyError;
use crate::transmitter::{program_backlight, DigContext};

/// Output attributes reachable through the property protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputProperty {
    /// Coherent TMDS clock/data alignment
    Coherent,
    /// Panel backlight level
    Backlight,
    /// HDMI (vs plain DVI) signalling
    Hdmi,
    /// HDMI audio stream workaround, not handled by DIG outputs
    AudioWorkaround,
}

/// Typed property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i32),
}

impl PropertyValue {
    fn as_bool(self, property: OutputProperty) -> Result<bool, PropertyError> {
        match self {
            PropertyValue::Bool(b) => Ok(b),
            PropertyValue::Integer(_) => Err(PropertyError::InvalidValue(property)),
        }
    }

    fn as_integer(self, property: OutputProperty) -> Result<i32, PropertyError> {
        match self {
            PropertyValue::Integer(i) => Ok(i),
            PropertyValue::Bool(_) => Err(PropertyError::InvalidValue(property)),
        }
    }
}

/// Property request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAction {
    /// Is the property available on this output
    Check,
    Get,
    /// Stage a new value; takes effect on commit
    Set(PropertyValue),
    /// Apply staged values to the hardware
    Commit,
}

/// Successful property response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyReply {
    /// Check succeeded
    Supported,
    /// Get result
    Value(PropertyValue),
    /// Set or Commit completed
    Done,
    /// Commit needs the output to reprogram its mode and power on
    Reprogram,
}

/// Property handler bound to an output's transmitter
pub trait PropertyControl: Send {
    fn handle(
        &mut self,
        ctx: &mut DigContext<'_>,
        action: PropertyAction,
        property: OutputProperty,
    ) -> Result<PropertyReply, PropertyError>;

    /// Release resources held by the handler
    fn release(&mut self) {}
}

/// Coherent mode and HDMI on TMDS links
#[derive(Debug, Default)]
pub struct TmdsProperties;

impl PropertyControl for TmdsProperties {
    fn handle(
        &mut self,
        ctx: &mut DigContext<'_>,
        action: PropertyAction,
        property: OutputProperty,
    ) -> Result<PropertyReply, PropertyError> {
        if !matches!(property, OutputProperty::Coherent | OutputProperty::Hdmi) {
            return Err(PropertyError::Unsupported(property));
        }
        match action {
            PropertyAction::Check => Ok(PropertyReply::Supported),
            PropertyAction::Get => {
                let value = match property {
                    OutputProperty::Coherent => ctx.dig.coherent,
                    _ => ctx.dig.encoder_mode == EncoderMode::TmdsHdmi,
                };
                Ok(PropertyReply::Value(PropertyValue::Bool(value)))
            }
            PropertyAction::Set(value) => {
                let value = value.as_bool(property)?;
                match property {
                    OutputProperty::Coherent => ctx.dig.coherent = value,
                    _ => {
                        ctx.dig.encoder_mode = if value {
                            EncoderMode::TmdsHdmi
                        } else {
                            EncoderMode::TmdsDvi
                        }
                    }
                }
                debug!("{}: {:?} staged as {}", ctx.output.id, property, value);
                Ok(PropertyReply::Done)
            }
            // both flags feed the electrical settings lookup
            PropertyAction::Commit => Ok(PropertyReply::Reprogram),
        }
    }
}

/// Backlight through the LVTMA modulation register
#[derive(Debug, Default)]
pub struct LvdsBacklight;

impl PropertyControl for LvdsBacklight {
    fn handle(
        &mut self,
        ctx: &mut DigContext<'_>,
        action: PropertyAction,
        property: OutputProperty,
    ) -> Result<PropertyReply, PropertyError> {
        if property != OutputProperty::Backlight {
            return Err(PropertyError::Unsupported(property));
        }
        let level = ctx
            .dig
            .lvds
            .backlight_level
            .filter(|level| *level >= 0)
            .ok_or(PropertyError::Unavailable(property))?;

        match action {
            PropertyAction::Check => Ok(PropertyReply::Supported),
            PropertyAction::Get => Ok(PropertyReply::Value(PropertyValue::Integer(level))),
            PropertyAction::Set(value) => {
                ctx.dig.lvds.backlight_level = Some(value.as_integer(property)?);
                Ok(PropertyReply::Done)
            }
            PropertyAction::Commit => {
                program_backlight(ctx, level);
                Ok(PropertyReply::Done)
            }
        }
    }
}

/// Backlight served by a firmware-provided control
pub struct FirmwareBacklight {
    control: Box<dyn BacklightControl>,
}

impl FirmwareBacklight {
    pub fn new(control: Box<dyn BacklightControl>) -> Self {
        Self { control }
    }
}

impl std::fmt::Debug for FirmwareBacklight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareBacklight")
            .field("level", &self.control.level())
            .finish()
    }
}

impl PropertyControl for FirmwareBacklight {
    fn handle(
        &mut self,
        _ctx: &mut DigContext<'_>,
        action: PropertyAction,
        property: OutputProperty,
    ) -> Result<PropertyReply, PropertyError> {
        if property != OutputProperty::Backlight {
            return Err(PropertyError::Unsupported(property));
        }
        match action {
            PropertyAction::Check => Ok(PropertyReply::Supported),
            PropertyAction::Get => Ok(PropertyReply::Value(PropertyValue::Integer(
                self.control.level(),
            ))),
            PropertyAction::Set(value) => {
                self.control.set_level(value.as_integer(property)?);
                Ok(PropertyReply::Done)
            }
            PropertyAction::Commit => {
                self.control.commit();
                Ok(PropertyReply::Done)
            }
        }
    }

    fn release(&mut self) {
        self.control.release();
    }
}
