//! Per-frame state extraction.
//!
//! After each step the recorder reads the position/velocity window of the state record
//! and nothing else. The window is `SNAPSHOT_SIZE` bytes starting `SNAPSHOT_OFFSET` bytes
//! past the address the module reports.

use std::fmt;

use serde::Serialize;

use super::layout::{FieldReader, POSITION, SNAPSHOT_OFFSET, SNAPSHOT_SIZE, VELOCITY};
use crate::common::{Error, GuestAddr, Result};
use crate::host::SimulationHost;

/// A 3-component single-precision vector.
pub type Vec3 = [f32; 3];

/// Position and velocity at the end of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct StateSnapshot {
    /// Player position.
    pub position: Vec3,
    /// Player velocity.
    pub velocity: Vec3,
}

impl StateSnapshot {
    /// Decodes the snapshot window.
    ///
    /// # Arguments
    ///
    /// * `window` - Exactly the bytes at `[SNAPSHOT_OFFSET, SNAPSHOT_OFFSET + SNAPSHOT_SIZE)`.
    ///
    /// # Returns
    ///
    /// The decoded snapshot.
    pub fn decode(window: &[u8; SNAPSHOT_SIZE]) -> Self {
        let reader = FieldReader::new(window, SNAPSHOT_OFFSET);
        // The window covers both fields by construction.
        Self {
            position: reader.vec3_at(POSITION).unwrap_or_default(),
            velocity: reader.vec3_at(VELOCITY).unwrap_or_default(),
        }
    }

    /// Reads and decodes the snapshot of the record at `base`.
    ///
    /// # Arguments
    ///
    /// * `host` - Host whose memory holds the record.
    /// * `base` - Address returned by the state pointer export.
    ///
    /// # Returns
    ///
    /// The snapshot, or the host's read error unchanged.
    pub fn extract<H: SimulationHost + ?Sized>(host: &H, base: GuestAddr) -> Result<Self> {
        let window = read_window(host, base, SNAPSHOT_OFFSET, SNAPSHOT_SIZE)?;
        let window: [u8; SNAPSHOT_SIZE] = window
            .as_slice()
            .try_into()
            .map_err(|_| short_read(host, base, SNAPSHOT_OFFSET, SNAPSHOT_SIZE))?;
        Ok(Self::decode(&window))
    }
}

impl fmt::Display for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [px, py, pz] = self.position;
        let [vx, vy, vz] = self.velocity;
        write!(f, "pos=({px}, {py}, {pz}) vel=({vx}, {vy}, {vz})")
    }
}

/// Extracts the snapshot of the record at `base` from `host`.
pub fn extract<H: SimulationHost + ?Sized>(host: &H, base: GuestAddr) -> Result<StateSnapshot> {
    StateSnapshot::extract(host, base)
}

/// Reads `length` bytes at `base + offset`.
///
/// A window whose first byte would lie past the 32-bit address space is reported as
/// out of bounds at `base`, spanning `offset + length` bytes.
pub(crate) fn read_window<H: SimulationHost + ?Sized>(
    host: &H,
    base: GuestAddr,
    offset: usize,
    length: usize,
) -> Result<Vec<u8>> {
    let address = base.checked_add(offset).ok_or_else(|| Error::OutOfBounds {
        address: base,
        length: offset.saturating_add(length),
        memory_size: host.memory_size(),
    })?;
    host.read_memory(address, length)
}

/// Error for a host that returned fewer bytes than requested.
pub(crate) fn short_read<H: SimulationHost + ?Sized>(
    host: &H,
    base: GuestAddr,
    offset: usize,
    length: usize,
) -> Error {
    Error::OutOfBounds {
        address: base.checked_add(offset).unwrap_or(base),
        length,
        memory_size: host.memory_size(),
    }
}
