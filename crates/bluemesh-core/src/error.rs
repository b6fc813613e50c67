//! Error types for the bluemesh-core crate.

use core::fmt;

use crate::types::ValueOutOfRange;

/// Errors from decoding a persisted record.
///
/// Consumers treat any decode failure as a malformed slot: the record is
/// skipped and loading continues with the next slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Payload length differs from the fixed record size.
    WrongLength { expected: usize, actual: usize },
    /// A decoded field falls outside its legal range.
    OutOfRange(ValueOutOfRange),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::WrongLength { expected, actual } => {
                write!(
                    f,
                    "malformed record: expected {expected} bytes, got {actual}"
                )
            }
            RecordError::OutOfRange(e) => write!(f, "malformed record: {e}"),
        }
    }
}

impl From<ValueOutOfRange> for RecordError {
    fn from(e: ValueOutOfRange) -> Self {
        RecordError::OutOfRange(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordError {}
