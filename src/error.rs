//! Domain errors for key indices, slots and letters.

use thiserror::Error;

/// Contract violations at the key-mapping boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Key number outside 0..=127.
    #[error("key number {0} is outside 0..=127")]
    KeyOutOfRange(i32),

    /// Layout slot past the end of its offset table.
    #[error("slot {slot} is outside 0..={max}")]
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Highest valid slot.
        max: usize,
    },

    /// Letter text that is not one of the twelve chromatic letters.
    #[error("unknown note letter: {0:?}")]
    UnknownLetter(String),
}

/// Result type for key-mapping operations.
pub type KeyResult<T> = Result<T, KeyError>;
