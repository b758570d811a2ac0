//! Guest address type.
//!
//! This module defines a strong type for offsets into the module's linear memory so
//! they cannot be confused with host sizes or frame indices. It provides the following:
//! 1. **Type Safety:** Distinguishes guest offsets from host `usize` lengths at compile time.
//! 2. **ABI Conversion:** Reinterprets the signed `i32` returned by the module as an unsigned offset.
//! 3. **Checked Arithmetic:** Offsetting never wraps silently past the 32-bit address space.

use std::fmt;

use serde::Serialize;

/// A byte offset into a module's 32-bit linear memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GuestAddr(pub u32);

impl GuestAddr {
    /// Creates a new guest address from a raw 32-bit offset.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw offset into linear memory.
    ///
    /// # Returns
    ///
    /// A new `GuestAddr` wrapping the provided offset.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Reinterprets a pointer returned through the wasm `i32` ABI as an unsigned offset.
    ///
    /// Wasm has no unsigned integer type, so a module returning an address above 2 GiB
    /// hands back a negative `i32`; the bit pattern is the address.
    #[inline]
    pub const fn from_abi(raw: i32) -> Self {
        Self(raw as u32)
    }

    /// Returns the raw 32-bit offset.
    #[inline]
    pub const fn val(self) -> u32 {
        self.0
    }

    /// Returns the offset as a host index.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Adds a byte offset, returning `None` if the result leaves the 32-bit address space.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Number of bytes to advance.
    ///
    /// # Returns
    ///
    /// The advanced address, or `None` on overflow.
    pub fn checked_add(self, bytes: usize) -> Option<Self> {
        let bytes = u32::try_from(bytes).ok()?;
        self.0.checked_add(bytes).map(Self)
    }
}

impl fmt::Display for GuestAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for GuestAddr {
    fn from(addr: u32) -> Self {
        Self(addr)
    }
}
