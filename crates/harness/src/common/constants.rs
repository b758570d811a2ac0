//! Global harness constants.
//!
//! This module defines the fixed values shared between the harness and the simulation
//! module. It includes:
//! 1. **Controller Constants:** Button bit masks for the 16-bit button field.
//! 2. **Macro Constants:** Frame record width and the `.m64` file header size.
//! 3. **Module Constants:** Default export names and the wasm page size.

/// A button (main jump/action button).
pub const A_BUTTON: u16 = 0x8000;

/// B button.
pub const B_BUTTON: u16 = 0x4000;

/// Z trigger.
pub const Z_TRIG: u16 = 0x2000;

/// Start button.
pub const START_BUTTON: u16 = 0x1000;

/// D-pad up.
pub const U_JPAD: u16 = 0x0800;

/// D-pad down.
pub const D_JPAD: u16 = 0x0400;

/// D-pad left.
pub const L_JPAD: u16 = 0x0200;

/// D-pad right.
pub const R_JPAD: u16 = 0x0100;

/// L trigger.
pub const L_TRIG: u16 = 0x0020;

/// R trigger.
pub const R_TRIG: u16 = 0x0010;

/// C-up button.
pub const U_CBUTTONS: u16 = 0x0008;

/// C-down button.
pub const D_CBUTTONS: u16 = 0x0004;

/// C-left button.
pub const L_CBUTTONS: u16 = 0x0002;

/// C-right button.
pub const R_CBUTTONS: u16 = 0x0001;

/// Size of one frame record in the macro byte stream.
///
/// Layout: `buttons_hi | buttons_lo | stick_x | stick_y`.
pub const FRAME_RECORD_SIZE: usize = 4;

/// Size of the header that precedes input data in a `.m64` movie file.
pub const M64_HEADER_SIZE: usize = 0x400;

/// Size of one wasm linear-memory page in bytes.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Import namespace of WASI preview1, the only import surface the host links.
pub const WASI_PREVIEW1_MODULE: &str = "wasi_snapshot_preview1";
