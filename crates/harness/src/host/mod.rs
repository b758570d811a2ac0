//! Simulation module host.
//!
//! Owns the lifecycle of one simulation module instance and exposes a narrow, typed
//! call surface over it:
//! 1. **Load:** `load` compiles a module and validates its exports (`module`).
//! 2. **Link:** `ModuleImage::link_and_instantiate` resolves imports and binds entry points (`handle`).
//! 3. **Call:** `SimulationHost` is the four-operation surface the recorder drives (`traits`).

/// Instantiated module handle.
pub mod handle;

/// Module compilation and export validation.
pub mod module;

/// The host call surface as a trait.
pub mod traits;

pub use handle::ModuleHandle;
pub use module::{ExportNames, ModuleImage, load};
pub use traits::SimulationHost;
