//! Crate-level error aggregation.
//!
//! Each module defines its own error enum next to the code that raises it;
//! this module folds them into one type for callers that don't care which
//! stage of a call failed.

use thiserror::Error;

use crate::host::InvokeError;
use crate::memory::MemoryError;
use crate::sbor::{DecodeError, EncodeError};
use crate::slice::SliceOverflow;

/// Result type alias for Vellum operations.
pub type Result<T> = std::result::Result<T, VellumError>;

/// Aggregate error for the contract host core.
#[derive(Error, Debug)]
pub enum VellumError {
    /// Guest memory access violated bounds or the environment refused a grow
    #[error("guest memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Malformed SBOR payload from the guest
    #[error("sbor decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Host-built value tree violated a codec invariant
    #[error("sbor encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A region does not fit the 32-bit slice packing
    #[error("slice packing error: {0}")]
    Slice(#[from] SliceOverflow),

    /// A contract invocation failed
    #[error("invocation error: {0}")]
    Invoke(#[from] InvokeError),
}

impl VellumError {
    /// Returns true when the failure is a per-call condition the host can
    /// report and move on from, as opposed to a guest execution fault.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        match self {
            VellumError::Memory(_) | VellumError::Decode(_) => true,
            VellumError::Invoke(e) => !matches!(e, InvokeError::Trap(_)),
            _ => false,
        }
    }

    /// Returns true when the guest itself faulted (trapped) during execution.
    #[inline]
    pub fn is_guest_fault(&self) -> bool {
        matches!(self, VellumError::Invoke(InvokeError::Trap(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let trap: VellumError = InvokeError::Trap("unreachable".to_owned()).into();
        assert!(trap.is_guest_fault());
        assert!(!trap.is_recoverable());

        let oob: VellumError = MemoryError::OutOfBounds {
            offset: 0,
            len: 5,
            size: 3,
        }
        .into();
        assert!(oob.is_recoverable());
        assert!(!oob.is_guest_fault());

        let decode: VellumError = crate::sbor::decode(&[0x00]).unwrap_err().into();
        assert!(decode.is_recoverable());
    }
}
