//! State record schema and extraction.
//!
//! 1. **Layout:** The versioned byte layout of the module's state record (`layout`).
//! 2. **Snapshot:** The position/velocity window read after every frame (`snapshot`).
//! 3. **Game state:** The complete record, read on demand (`game_state`).

/// Full state record.
pub mod game_state;

/// Record layout schema.
pub mod layout;

/// Per-frame snapshot extraction.
pub mod snapshot;

pub use game_state::GameState;
pub use snapshot::{StateSnapshot, Vec3, extract};
