//! Host abstraction.
//!
//! The recorder only ever needs the bound operations of a loaded module and its memory
//! size, so they are captured here as a trait. `ModuleHandle` is the production implementation;
//! tests substitute doubles to script traps and memory contents.

use crate::common::{GuestAddr, Result};
use crate::input::InputCommand;

/// The call surface of one instantiated simulation module.
///
/// Implementations must run each call to completion (or trap) before returning and
/// must never hand out references into module memory.
pub trait SimulationHost {
    /// Runs the module's one-time setup export.
    fn initialize(&mut self) -> Result<()>;

    /// Advances the simulation by one frame with the given input.
    fn step(&mut self, input: InputCommand) -> Result<()>;

    /// Returns the current address of the module's state record.
    fn state_pointer(&mut self) -> Result<GuestAddr>;

    /// Current size of linear memory in bytes.
    fn memory_size(&self) -> usize;

    /// Copies `length` bytes of linear memory starting at `address`.
    ///
    /// Fails with `OutOfBounds` if any byte of the window lies past the end of memory.
    fn read_memory(&self, address: GuestAddr, length: usize) -> Result<Vec<u8>>;
}

impl<H: SimulationHost + ?Sized> SimulationHost for &mut H {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn step(&mut self, input: InputCommand) -> Result<()> {
        (**self).step(input)
    }

    fn state_pointer(&mut self) -> Result<GuestAddr> {
        (**self).state_pointer()
    }

    fn memory_size(&self) -> usize {
        (**self).memory_size()
    }

    fn read_memory(&self, address: GuestAddr, length: usize) -> Result<Vec<u8>> {
        (**self).read_memory(address, length)
    }
}
