//! Full state record.
//!
//! The frame loop only needs position and velocity, but the record carries more: the
//! star counter in its header, the camera, and where in the game the player is. This is
//! read on demand (for instance once after the final frame) rather than every frame.

use std::fmt;

use serde::Serialize;

use super::layout::{
    ACT, AREA, CAMERA_POSITION, CAMERA_YAW, COURSE, FieldReader, IN_CREDITS, NUM_STARS, POSITION,
    RECORD_SIZE, VELOCITY,
};
use super::snapshot::{StateSnapshot, Vec3, read_window, short_read};
use crate::common::{GuestAddr, Result};
use crate::host::SimulationHost;

/// Every field of the published state record.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize)]
pub struct GameState {
    /// Stars collected.
    pub num_stars: i32,
    /// Player position.
    pub position: Vec3,
    /// Player velocity.
    pub velocity: Vec3,
    /// Camera position.
    pub camera_position: Vec3,
    /// Camera yaw.
    pub camera_yaw: i32,
    /// Non-zero while the end credits are rolling.
    pub in_credits: i32,
    /// Current course number.
    pub course: i32,
    /// Current act number.
    pub act: i32,
    /// Current area index.
    pub area: i32,
}

impl GameState {
    /// Decodes a complete record.
    pub fn decode(record: &[u8; RECORD_SIZE]) -> Self {
        let r = FieldReader::new(record, 0);
        // Every field lies inside RECORD_SIZE by construction.
        Self {
            num_stars: r.i32_at(NUM_STARS).unwrap_or_default(),
            position: r.vec3_at(POSITION).unwrap_or_default(),
            velocity: r.vec3_at(VELOCITY).unwrap_or_default(),
            camera_position: r.vec3_at(CAMERA_POSITION).unwrap_or_default(),
            camera_yaw: r.i32_at(CAMERA_YAW).unwrap_or_default(),
            in_credits: r.i32_at(IN_CREDITS).unwrap_or_default(),
            course: r.i32_at(COURSE).unwrap_or_default(),
            act: r.i32_at(ACT).unwrap_or_default(),
            area: r.i32_at(AREA).unwrap_or_default(),
        }
    }

    /// Reads and decodes the record at `base`.
    pub fn extract<H: SimulationHost + ?Sized>(host: &H, base: GuestAddr) -> Result<Self> {
        let bytes = read_window(host, base, 0, RECORD_SIZE)?;
        let record: [u8; RECORD_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| short_read(host, base, 0, RECORD_SIZE))?;
        Ok(Self::decode(&record))
    }

    /// True once at least one star has been collected.
    pub const fn has_won(&self) -> bool {
        self.num_stars > 0
    }

    /// The per-frame subset of this record.
    pub const fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            position: self.position,
            velocity: self.velocity,
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [px, py, pz] = self.position;
        let [vx, vy, vz] = self.velocity;
        let [cx, cy, cz] = self.camera_position;
        writeln!(f, "stars:    {}", self.num_stars)?;
        writeln!(f, "position: ({px}, {py}, {pz})")?;
        writeln!(f, "velocity: ({vx}, {vy}, {vz})")?;
        writeln!(f, "camera:   ({cx}, {cy}, {cz}) yaw {}", self.camera_yaw)?;
        write!(
            f,
            "course {} act {} area {}{}",
            self.course,
            self.act,
            self.area,
            if self.in_credits != 0 { " (credits)" } else { "" }
        )
    }
}
