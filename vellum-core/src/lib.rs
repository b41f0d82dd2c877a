//! Vellum Core - Host-side execution core for WASM smart contracts
//!
//! This crate implements the contract-to-host ABI: it invokes exported
//! contract functions inside a sandboxed WASM module, interprets the module's
//! linear memory, and codecs SBOR (Simple Binary Object Representation)
//! values across the boundary. Key design principles:
//!
//! - **Untrusted by default**: every length, tag, and offset supplied by the
//!   guest is validated against real buffer bounds before any read
//! - **Single-word ABI**: a contract result is one 64-bit word packing an
//!   (offset, length) slice into the guest's exported linear memory
//! - **Stale-slice safety**: host-side writes bump a memory generation, so a
//!   slice captured before a mutation cannot be silently misread
//! - **Hot-swap**: contract code versions publish atomically without dropping
//!   in-flight calls
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       CONTRACT HOST LAYER                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌────────────────┐   │
//! │  │ ContractRegistry│  │ InstancePool    │  │ GuestMemory    │   │
//! │  │ (hot-publish)   │  │ (per-thread)    │  │ (bounds+gen)   │   │
//! │  └─────────────────┘  └─────────────────┘  └────────────────┘   │
//! │                              │                                  │
//! │                              ▼                                  │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │              ContractHost (high-level API)                 │ │
//! │  │  invoke(export, params) -> Result<SborValue, InvokeError>  │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! │                              │                                  │
//! │                   slice codec + sbor codec                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::unnecessary_to_owned)]

pub mod error;
pub mod host;
pub mod memory;
pub mod sbor;
pub mod slice;

pub use error::{Result, VellumError};
pub use host::{
    ContractHost, ContractInstance, ContractRegistry, HostConfig, InvokeError, ResultError,
};
pub use memory::{GuestMemory, MemoryError, SliceHandle};
pub use sbor::{decode, encode, DecodeError, EncodeError, SborValue, ValueKind};
pub use slice::Slice;
