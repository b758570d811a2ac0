//! Harness error definitions.
//!
//! This module defines the error taxonomy shared by every layer of the harness. It provides:
//! 1. **Host Errors:** Load, link, trap, and out-of-bounds failures raised by the module host.
//! 2. **Input Errors:** Missing macro indices and malformed macro sources.
//! 3. **Ambient Errors:** I/O, JSON, and configuration failures.
//!
//! None of these are recovered locally; every error surfaces to the caller of the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::addr::GuestAddr;

/// Result alias used throughout the harness.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the harness can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The module binary is missing, malformed, or exports the wrong entry points.
    #[error("failed to load module '{}': {reason}", path.display())]
    Load {
        /// Path the module was loaded from.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// The module declares an import outside the supported surface.
    #[error("unsupported import '{module}::{name}'")]
    UnsupportedImport {
        /// Import namespace.
        module: String,
        /// Import field name.
        name: String,
    },

    /// Linking or instantiation failed for a reason other than an unsupported import.
    #[error("failed to link module: {reason}")]
    Link {
        /// Human-readable cause.
        reason: String,
    },

    /// A dynamic call named an export that is not a function.
    #[error("no exported function named '{name}'")]
    UnknownExport {
        /// Requested export name.
        name: String,
    },

    /// A dynamic call supplied arguments that don't fit the export's signature.
    ///
    /// Raised before the call is made; the module never runs.
    #[error("bad arguments for '{entry}': {reason}")]
    BadArguments {
        /// Export that was being called.
        entry: String,
        /// Which argument is wrong, and how.
        reason: String,
    },

    /// The module trapped while executing an entry point.
    #[error("trap in '{entry}': {message}")]
    CallTrap {
        /// Export that was being called.
        entry: String,
        /// Trap description reported by the runtime.
        message: String,
    },

    /// A read would extend past the end of linear memory.
    #[error("read of {length} bytes at {address} exceeds memory size {memory_size:#x}")]
    OutOfBounds {
        /// First byte of the requested window, or the record base when that byte would
        /// lie past the 32-bit address space.
        address: GuestAddr,
        /// Requested window length, measured from `address`.
        length: usize,
        /// Linear memory size at the time of the read.
        memory_size: usize,
    },

    /// A macro index needed to build a frame record is absent.
    #[error("macro index {index} missing (frame {frame})")]
    MissingIndex {
        /// Flat byte index that was looked up.
        index: usize,
        /// Frame whose record needed it.
        frame: usize,
    },

    /// The macro source could not be interpreted.
    #[error("malformed macro source: {reason}")]
    MacroFormat {
        /// Human-readable cause.
        reason: String,
    },

    /// Configuration is invalid or incomplete.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Human-readable cause.
        reason: String,
    },

    /// Reading an input file failed.
    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for failures that occur before any frame runs.
    ///
    /// Load and link errors are detected while building the module handle; everything
    /// else can only surface once the frame loop is underway.
    pub const fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::UnsupportedImport { .. } | Self::Link { .. }
        )
    }

    /// Wraps a wasmtime error raised while calling `entry`.
    pub(crate) fn trap(entry: &str, err: &wasmtime::Error) -> Self {
        let message = err.downcast_ref::<wasmtime::Trap>().map_or_else(
            || format!("{err:#}"),
            |code| format!("{code} ({err})"),
        );
        Self::CallTrap {
            entry: entry.to_owned(),
            message,
        }
    }
}
