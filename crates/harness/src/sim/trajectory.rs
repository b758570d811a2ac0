//! Recorded trajectory.
//!
//! An ordered sequence of positions, one per simulated frame. Insertion order is
//! simulation time order; only the recorder appends, and once a run completes the
//! trajectory is handed over by value and never touched again.

use std::io::Write;

use serde::Serialize;

use crate::common::Result;
use crate::state::Vec3;

/// Positions in frame order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trajectory {
    positions: Vec<Vec3>,
}

impl Trajectory {
    /// Creates an empty trajectory with room for `frames` positions.
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            positions: Vec::with_capacity(frames),
        }
    }

    pub(crate) fn push(&mut self, position: Vec3) {
        self.positions.push(position);
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no frame has been recorded.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions in frame order.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Position after `frame`.
    pub fn get(&self, frame: usize) -> Option<Vec3> {
        self.positions.get(frame).copied()
    }

    /// Iterates positions in frame order.
    pub fn iter(&self) -> std::slice::Iter<'_, Vec3> {
        self.positions.iter()
    }

    /// Consumes the trajectory, returning the raw positions.
    pub fn into_inner(self) -> Vec<Vec3> {
        self.positions
    }

    /// Axis-aligned bounding box as `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(mut lo, mut hi), p| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
            (lo, hi)
        }))
    }

    /// Total distance travelled along the path.
    pub fn path_length(&self) -> f64 {
        self.positions
            .windows(2)
            .map(|w| {
                let d = |axis: usize| f64::from(w[1][axis]) - f64::from(w[0][axis]);
                d(0).mul_add(d(0), d(1).mul_add(d(1), d(2) * d(2))).sqrt()
            })
            .sum()
    }

    /// Serializes as a JSON array of `[x, y, z]` triples.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Writes the JSON form to `writer`.
    pub fn write_json(&self, writer: impl Write) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Vec3;
    type IntoIter = std::slice::Iter<'a, Vec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
