//! Input macro decoding.
//!
//! Turns a recorded macro into the per-frame commands passed to `step_game`.

/// Decoded per-frame controller input.
pub mod command;

/// Macro sources (keyed JSON and raw `.m64` streams).
pub mod source;

pub use command::InputCommand;
pub use source::{MacroSource, decode_frame, frame_count};
