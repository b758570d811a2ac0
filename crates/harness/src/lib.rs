//! Deterministic input-macro replay for WebAssembly game simulations.
//!
//! This crate drives a precompiled simulation module frame by frame and extracts its
//! internal state from linear memory after every step. It provides the following:
//! 1. **Input:** Decoding of recorded controller macros into per-frame input commands.
//! 2. **Host:** Loading, linking, and invoking the module's entry points through wasmtime.
//! 3. **State:** A versioned binary schema for the module's state record and its decoder.
//! 4. **Simulation:** The trajectory recorder state machine, run configuration, and statistics.

/// Common types and constants (guest addresses, button masks, errors).
pub mod common;
/// Harness configuration (defaults, module exports, macro input, run options).
pub mod config;
/// Simulation module host (load, link, typed entry points, memory reads).
pub mod host;
/// Input macro decoding (macro sources and input commands).
pub mod input;
/// Trajectory recording (recorder state machine and the trajectory buffer).
pub mod sim;
/// State record schema and extraction.
pub mod state;
/// Run statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Crate-wide error type and result alias.
pub use crate::common::{Error, Result};
/// Loaded module handle; the only owner of the module's linear memory.
pub use crate::host::{ModuleHandle, SimulationHost};
/// Decoded controller input for one frame and the recorded macro it came from.
pub use crate::input::{InputCommand, MacroSource};
/// Recorder entry points and the trajectory they produce.
pub use crate::sim::{Recording, RunError, Trajectory, TrajectoryRecorder, record};
/// Per-frame position/velocity snapshot.
pub use crate::state::StateSnapshot;
