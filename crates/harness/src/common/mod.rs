//! Common utilities and types used throughout the harness.
//!
//! This module provides the building blocks shared by the host, decoder, extractor,
//! and recorder. It includes:
//! 1. **Address Types:** A strong type for offsets into the module's linear memory.
//! 2. **Constants:** Button masks, frame record width, and module ABI names.
//! 3. **Error Handling:** The crate-wide error enum and result alias.

/// Guest address type definition.
pub mod addr;

/// Common constants used throughout the harness.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::GuestAddr;
pub use constants::FRAME_RECORD_SIZE;
pub use error::{Error, Result};
