//! Per-frame controller input.
//!
//! A frame record is four bytes `b0 b1 b2 b3` taken from the macro stream. It unpacks as:
//! 1. **Buttons:** `(b0 << 8) | b1`, a 16-bit mask of the `*_BUTTON`/`*_TRIG`/`*_JPAD` bits.
//! 2. **Stick X:** `b2` reinterpreted as a signed 8-bit axis.
//! 3. **Stick Y:** `b3` reinterpreted as a signed 8-bit axis.

use std::fmt;

use serde::Serialize;

use crate::common::FRAME_RECORD_SIZE;

/// Bit shift placing the first record byte in the high half of the button mask.
const BUTTONS_HIGH_SHIFT: u32 = 8;

/// One frame's worth of controller input, as passed to `step_game`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct InputCommand {
    /// Pressed buttons.
    pub buttons: u16,
    /// Analog stick horizontal axis.
    pub stick_x: i8,
    /// Analog stick vertical axis.
    pub stick_y: i8,
}

impl InputCommand {
    /// No buttons pressed, stick centered.
    pub const NEUTRAL: Self = Self::new(0, 0, 0);

    /// Creates an input command from its decoded fields.
    pub const fn new(buttons: u16, stick_x: i8, stick_y: i8) -> Self {
        Self {
            buttons,
            stick_x,
            stick_y,
        }
    }

    /// Unpacks a 4-byte frame record.
    ///
    /// # Arguments
    ///
    /// * `record` - The raw `b0 b1 b2 b3` bytes of one frame.
    ///
    /// # Returns
    ///
    /// The decoded input command.
    #[inline]
    pub const fn from_record(record: [u8; FRAME_RECORD_SIZE]) -> Self {
        let buttons = ((record[0] as u16) << BUTTONS_HIGH_SHIFT) | record[1] as u16;
        Self {
            buttons,
            stick_x: record[2] as i8,
            stick_y: record[3] as i8,
        }
    }

    /// Packs the command back into its 4-byte record form.
    pub const fn to_record(self) -> [u8; FRAME_RECORD_SIZE] {
        [
            (self.buttons >> BUTTONS_HIGH_SHIFT) as u8,
            self.buttons as u8,
            self.stick_x as u8,
            self.stick_y as u8,
        ]
    }

    /// Returns the arguments for `step_game`, widened to the wasm `i32` ABI.
    ///
    /// Buttons are zero-extended; stick axes are sign-extended.
    #[inline]
    pub fn abi_args(self) -> (i32, i32, i32) {
        (
            i32::from(self.buttons),
            i32::from(self.stick_x),
            i32::from(self.stick_y),
        )
    }

    /// Returns true if any bit of `mask` is pressed.
    pub const fn is_pressed(self, mask: u16) -> bool {
        (self.buttons & mask) != 0
    }

    /// Returns a copy with every bit of `mask` pressed.
    #[must_use]
    pub const fn press(self, mask: u16) -> Self {
        Self {
            buttons: self.buttons | mask,
            ..self
        }
    }

    /// Returns a copy with every bit of `mask` released.
    #[must_use]
    pub const fn release(self, mask: u16) -> Self {
        Self {
            buttons: self.buttons & !mask,
            ..self
        }
    }
}

impl fmt::Display for InputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buttons={:#06x} stick=({}, {})",
            self.buttons, self.stick_x, self.stick_y
        )
    }
}
