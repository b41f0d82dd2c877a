//! Packed (offset, length) slice words - the contract return convention.
//!
//! A contract function returns a single `u64` identifying a byte range in its
//! own linear memory: the high 32 bits are the offset, the low 32 bits the
//! length. Packing is pure arithmetic; validating the range against the
//! actual memory size belongs to [`crate::memory::GuestMemory`].

use thiserror::Error;

/// A byte range in guest linear memory, identified by offset and length.
///
/// `Slice` carries no liveness information: it is only as valid as the memory
/// snapshot it was read against. See [`crate::memory::SliceHandle`] for the
/// generation-stamped form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    offset: u32,
    len: u32,
}

/// Raised when a region cannot be represented in the 32+32 bit packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("region offset={offset} len={len} does not fit the 32-bit slice packing")]
pub struct SliceOverflow {
    pub offset: u64,
    pub len: u64,
}

impl Slice {
    #[inline]
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Builds a slice from wide parts, failing if either half exceeds 32 bits.
    pub fn try_from_parts(offset: u64, len: u64) -> Result<Self, SliceOverflow> {
        let narrow_offset = u32::try_from(offset).map_err(|_| SliceOverflow { offset, len })?;
        let narrow_len = u32::try_from(len).map_err(|_| SliceOverflow { offset, len })?;
        Ok(Self {
            offset: narrow_offset,
            len: narrow_len,
        })
    }

    /// Packs into the single-word ABI form: `(offset << 32) | length`.
    #[inline]
    pub fn to_word(self) -> u64 {
        (u64::from(self.offset) << 32) | u64::from(self.len)
    }

    /// Unpacks a word produced by [`Slice::to_word`] (or by a guest).
    #[inline]
    pub fn from_word(word: u64) -> Self {
        Self {
            offset: (word >> 32) as u32,
            len: (word & 0xFFFF_FFFF) as u32,
        }
    }

    #[inline]
    pub fn offset(self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the range. Cannot overflow: both halves are
    /// 32-bit and the sum is computed in 64 bits.
    #[inline]
    pub fn end(self) -> u64 {
        u64::from(self.offset) + u64::from(self.len)
    }
}
