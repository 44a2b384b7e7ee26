//! Error types for hardware collaborators

use thiserror::Error;

use crate::firmware::TransmitterAction;

/// Errors reported by the firmware command-table interpreter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FirmwareError {
    /// A data table the caller depends on is not present
    #[error("firmware data table 0x{0:02x} not present")]
    TableMissing(u8),

    /// The interpreter rejected or failed to execute a command
    #[error("transmitter command {action:?} failed: {reason}")]
    CommandFailed {
        action: TransmitterAction,
        reason: String,
    },
}
