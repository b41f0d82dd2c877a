//! Bounds-checked access to a guest module's linear memory.
//!
//! All guest-supplied offsets and lengths pass through here before any byte
//! is touched. Reads never exceed the memory's current size and writes grow
//! the memory (page-granular) when the target range extends past it.
//!
//! # Staleness
//!
//! A slice read out of the guest identifies bytes only for as long as the
//! memory stays unmutated: a later host write may move or overwrite them.
//! [`GuestMemory`] keeps a generation counter that is bumped on every host
//! write, and [`SliceHandle`] stamps a slice with the generation it was
//! minted under. Reading through a stale handle fails loudly instead of
//! returning bytes from the wrong epoch. Guest-side growth during a call
//! does not move committed bytes, so handles minted after the call returns
//! observe the grown size.

use thiserror::Error;
use wasmtime::{AsContext, AsContextMut, Memory};

use crate::slice::Slice;

/// Size of one WASM linear memory page.
pub const WASM_PAGE_SIZE: u64 = 64 * 1024;

/// Errors raised by guest memory access.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The requested range extends past the current memory size
    #[error("out of bounds: range {offset}+{len} exceeds memory size {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// The requested range does not fit the host address type
    #[error("address overflow: range {offset}+{len} is not addressable")]
    Overflow { offset: u64, len: u64 },

    /// The execution environment refused to grow the memory
    #[error("memory grow of {needed_pages} page(s) refused: {reason}")]
    GrowFailed { needed_pages: u64, reason: String },

    /// The slice was minted before a later host write and may alias moved bytes
    #[error("stale slice: minted at generation {slice_generation}, memory is at {memory_generation}")]
    StaleSlice {
        slice_generation: u64,
        memory_generation: u64,
    },
}

/// A [`Slice`] stamped with the memory generation it was minted under.
///
/// Handles are only readable while no host write has happened since minting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceHandle {
    slice: Slice,
    generation: u64,
}

impl SliceHandle {
    #[inline]
    pub fn slice(&self) -> Slice {
        self.slice
    }

    /// The packed ABI word for this handle's range.
    #[inline]
    pub fn to_word(&self) -> u64 {
        self.slice.to_word()
    }
}

/// Safe view over one guest module's exported linear memory.
pub struct GuestMemory {
    memory: Memory,
    generation: u64,
}

impl GuestMemory {
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            generation: 0,
        }
    }

    /// Current memory size in bytes.
    #[inline]
    pub fn size(&self, store: impl AsContext) -> u64 {
        self.memory.data_size(store) as u64
    }

    /// Current host-write generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Binds a guest-returned slice to the current generation.
    #[inline]
    pub fn stamp(&self, slice: Slice) -> SliceHandle {
        SliceHandle {
            slice,
            generation: self.generation,
        }
    }

    /// Reads the exact range behind `handle`, rejecting stale handles.
    pub fn read(
        &self,
        store: impl AsContext,
        handle: &SliceHandle,
    ) -> Result<Vec<u8>, MemoryError> {
        if handle.generation != self.generation {
            return Err(MemoryError::StaleSlice {
                slice_generation: handle.generation,
                memory_generation: self.generation,
            });
        }
        self.read_raw(store, handle.slice)
    }

    /// Reads exactly `slice.len()` bytes at `slice.offset()` out of the
    /// current memory snapshot, bounds-checked against the current size.
    pub fn read_raw(&self, store: impl AsContext, slice: Slice) -> Result<Vec<u8>, MemoryError> {
        let offset = u64::from(slice.offset());
        let len = u64::from(slice.len());
        let size = self.size(&store);
        if slice.end() > size {
            return Err(MemoryError::OutOfBounds { offset, len, size });
        }
        let start =
            usize::try_from(offset).map_err(|_| MemoryError::Overflow { offset, len })?;
        let count = usize::try_from(len).map_err(|_| MemoryError::Overflow { offset, len })?;
        let end = start
            .checked_add(count)
            .ok_or(MemoryError::Overflow { offset, len })?;
        Ok(self.memory.data(&store)[start..end].to_vec())
    }

    /// Writes `bytes` at `offset`, growing the memory first if the range
    /// extends past the current size. Bumps the generation: every handle
    /// minted earlier becomes stale.
    pub fn write(
        &mut self,
        mut store: impl AsContextMut,
        offset: u64,
        bytes: &[u8],
    ) -> Result<SliceHandle, MemoryError> {
        let len = bytes.len() as u64;
        let end = offset
            .checked_add(len)
            .ok_or(MemoryError::Overflow { offset, len })?;
        let slice =
            Slice::try_from_parts(offset, len).map_err(|_| MemoryError::Overflow { offset, len })?;

        let size = self.size(&store);
        if end > size {
            let needed_pages = (end - size).div_ceil(WASM_PAGE_SIZE);
            self.memory
                .grow(&mut store, needed_pages)
                .map_err(|e| MemoryError::GrowFailed {
                    needed_pages,
                    reason: e.to_string(),
                })?;
        }

        let start = usize::try_from(offset).map_err(|_| MemoryError::Overflow { offset, len })?;
        self.memory.data_mut(&mut store)[start..start + bytes.len()].copy_from_slice(bytes);

        self.generation += 1;
        Ok(SliceHandle {
            slice,
            generation: self.generation,
        })
    }

    /// Writes `bytes` just past the current end of memory.
    pub fn append(
        &mut self,
        mut store: impl AsContextMut,
        bytes: &[u8],
    ) -> Result<SliceHandle, MemoryError> {
        let offset = self.size(&store);
        self.write(&mut store, offset, bytes)
    }
}
