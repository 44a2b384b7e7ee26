//! Error types for DIG output control

use dig_hw::{ConnectorType, EncoderSlot, OutputId};
use thiserror::Error;

use crate::property::OutputProperty;
use crate::state::OutputHandle;

/// Errors that can occur while building or driving a DIG output
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigError {
    /// The output cannot be built on this adapter
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// No DIG encoder slot is free for this output
    #[error("no encoder available for {output}")]
    ResourceUnavailable {
        output: OutputId,
        /// Slot that blocked the request, if a single one did
        held: Option<(EncoderSlot, OutputHandle)>,
    },

    /// Free was requested by an output that owns no slot
    #[error("{0} owns no encoder")]
    NotAllocated(OutputId),

    /// Mode was requested before a CRTC was attached
    #[error("no CRTC attached to {0}")]
    NoCrtc(OutputId),

    /// Property request failed
    #[error("property error: {0}")]
    Property(#[from] PropertyError),
}

impl DigError {
    pub(crate) fn unsupported_connector(output: OutputId, connector: ConnectorType) -> Self {
        DigError::UnsupportedConfiguration(format!(
            "{} cannot drive a {:?} connector",
            output, connector
        ))
    }
}

/// Errors from the output property protocol
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    /// The output has no handler for this property
    #[error("property {0:?} not supported")]
    Unsupported(OutputProperty),

    /// The property exists but has no usable value on this output
    #[error("property {0:?} not available")]
    Unavailable(OutputProperty),

    /// The value has the wrong type for the property
    #[error("invalid value for property {0:?}")]
    InvalidValue(OutputProperty),

    /// Commit needs a previously programmed mode
    #[error("no mode programmed")]
    NoModeProgrammed,
}
