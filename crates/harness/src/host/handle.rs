//! Instantiated module handle.
//!
//! This module links a validated module image against the minimal system surface and
//! owns the resulting instance for the rest of the run. It provides:
//! 1. **Linking:** Rejects unsupported imports, then links WASI preview1 with a context
//!    that grants nothing but (optionally) inherited stdout.
//! 2. **Typed calls:** Setup, step, and state pointer exports bound once at link time.
//! 3. **Dynamic calls:** Invocation of any exported function by name.
//! 4. **Memory access:** Bounds-checked copy-out reads of linear memory.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use wasmtime::{Instance, Linker, Memory, Store, TypedFunc, Val, ValType};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};

use super::module::{ExportNames, ModuleImage};
use super::traits::SimulationHost;
use crate::common::constants::{WASI_PREVIEW1_MODULE, WASM_PAGE_SIZE};
use crate::common::{Error, GuestAddr, Result};
use crate::input::InputCommand;
use crate::state::GameState;

/// Signature of the step export: `(buttons, stick_x, stick_y) -> ()`.
type StepFn = TypedFunc<(i32, i32, i32), ()>;

/// One loaded, instantiated simulation module.
///
/// The handle is the only owner of the module's store and memory. Every call takes
/// `&mut self`, so at most one call is ever in flight; reads copy bytes out and never
/// expose references into linear memory.
pub struct ModuleHandle {
    store: Store<WasiP1Ctx>,
    instance: Instance,
    memory: Memory,
    entry: TypedFunc<(), ()>,
    step: StepFn,
    state: TypedFunc<(), i32>,
    exports: ExportNames,
    path: PathBuf,
    calls: u64,
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("path", &self.path)
            .field("exports", &self.exports)
            .field("memory_size", &self.memory_size())
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl ModuleImage {
    /// Resolves imports, instantiates the module, and binds its entry points.
    ///
    /// # Returns
    ///
    /// A runnable handle, or `UnsupportedImport` naming the first import outside the
    /// supported surface, or `Link` if instantiation itself fails.
    pub fn link_and_instantiate(self) -> Result<ModuleHandle> {
        let link_err = |e: wasmtime::Error| Error::Link {
            reason: format!("{e:#}"),
        };

        for import in self.module.imports() {
            if import.module() != WASI_PREVIEW1_MODULE {
                return Err(unsupported(import.module(), import.name()));
            }
        }

        let mut linker: Linker<WasiP1Ctx> = Linker::new(&self.engine);
        preview1::add_to_linker_sync(&mut linker, |cx| cx).map_err(link_err)?;

        let mut builder = WasiCtxBuilder::new();
        if self.inherit_stdout {
            let _ = builder.inherit_stdout();
        }
        let mut store = Store::new(&self.engine, builder.build_p1());

        // Names inside the WASI namespace that the linker does not provide.
        for import in self.module.imports() {
            if linker.get_by_import(&mut store, &import).is_none() {
                return Err(unsupported(import.module(), import.name()));
            }
        }

        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(link_err)?;

        let memory = instance
            .get_memory(&mut store, &self.exports.memory)
            .ok_or_else(|| Error::Link {
                reason: format!("memory export '{}' not found after instantiation", self.exports.memory),
            })?;
        let entry = instance
            .get_typed_func::<(), ()>(&mut store, &self.exports.entry)
            .map_err(link_err)?;
        let step = instance
            .get_typed_func::<(i32, i32, i32), ()>(&mut store, &self.exports.step)
            .map_err(link_err)?;
        let state = instance
            .get_typed_func::<(), i32>(&mut store, &self.exports.state)
            .map_err(link_err)?;

        let memory_size = memory.data_size(&store);
        debug!(
            path = %self.path.display(),
            memory_size,
            pages = memory_size / WASM_PAGE_SIZE,
            stdout = self.inherit_stdout,
            "module instantiated"
        );

        Ok(ModuleHandle {
            store,
            instance,
            memory,
            entry,
            step,
            state,
            exports: self.exports,
            path: self.path,
            calls: 0,
        })
    }
}

fn unsupported(module: &str, name: &str) -> Error {
    Error::UnsupportedImport {
        module: module.to_owned(),
        name: name.to_owned(),
    }
}

impl ModuleHandle {
    /// Invokes an exported function by name.
    ///
    /// # Arguments
    ///
    /// * `name` - Export name.
    /// * `args` - Arguments, which must match the export's parameter types.
    ///
    /// # Returns
    ///
    /// The function's results, `UnknownExport` if no such function exists,
    /// `BadArguments` if `args` don't match its parameters, or `CallTrap` if the call
    /// faults.
    pub fn call_entry(&mut self, name: &str, args: &[Val]) -> Result<Vec<Val>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| Error::UnknownExport {
                name: name.to_owned(),
            })?;
        let ty = func.ty(&self.store);
        check_args(name, ty.params(), args)?;
        let mut results = vec![Val::I32(0); ty.results().len()];
        self.calls += 1;
        func.call(&mut self.store, args, &mut results)
            .map_err(|e| Error::trap(name, &e))?;
        Ok(results)
    }

    /// Reads the module's full published state record at the current state pointer.
    pub fn game_state(&mut self) -> Result<GameState> {
        let base = self.state_pointer()?;
        GameState::extract(&*self, base)
    }

    /// Current size of linear memory in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Number of entry point calls made so far.
    pub const fn calls(&self) -> u64 {
        self.calls
    }

    /// Export names bound to each role.
    pub const fn exports(&self) -> &ExportNames {
        &self.exports
    }
}

/// Matches each argument against the export's parameter list.
fn check_args(
    entry: &str,
    params: impl ExactSizeIterator<Item = ValType>,
    args: &[Val],
) -> Result<()> {
    let bad = |reason: String| Error::BadArguments {
        entry: entry.to_owned(),
        reason,
    };
    if params.len() != args.len() {
        return Err(bad(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    for (i, (param, arg)) in params.zip(args).enumerate() {
        if !arg_fits(&param, arg) {
            return Err(bad(format!("argument {i} should be {param}")));
        }
    }
    Ok(())
}

const fn arg_fits(param: &ValType, arg: &Val) -> bool {
    match param {
        ValType::I32 => matches!(arg, Val::I32(_)),
        ValType::I64 => matches!(arg, Val::I64(_)),
        ValType::F32 => matches!(arg, Val::F32(_)),
        ValType::F64 => matches!(arg, Val::F64(_)),
        ValType::V128 => matches!(arg, Val::V128(_)),
        // Reference subtyping is left to the runtime.
        ValType::Ref(_) => !matches!(
            arg,
            Val::I32(_) | Val::I64(_) | Val::F32(_) | Val::F64(_) | Val::V128(_)
        ),
    }
}

impl SimulationHost for ModuleHandle {
    fn initialize(&mut self) -> Result<()> {
        self.calls += 1;
        self.entry
            .call(&mut self.store, ())
            .map_err(|e| Error::trap(&self.exports.entry, &e))
    }

    fn step(&mut self, input: InputCommand) -> Result<()> {
        self.calls += 1;
        self.step
            .call(&mut self.store, input.abi_args())
            .map_err(|e| Error::trap(&self.exports.step, &e))
    }

    fn state_pointer(&mut self) -> Result<GuestAddr> {
        self.calls += 1;
        self.state
            .call(&mut self.store, ())
            .map(GuestAddr::from_abi)
            .map_err(|e| Error::trap(&self.exports.state, &e))
    }

    fn memory_size(&self) -> usize {
        Self::memory_size(self)
    }

    fn read_memory(&self, address: GuestAddr, length: usize) -> Result<Vec<u8>> {
        let memory_size = Self::memory_size(self);
        let out_of_bounds = || Error::OutOfBounds {
            address,
            length,
            memory_size,
        };
        let end = address
            .as_usize()
            .checked_add(length)
            .ok_or_else(out_of_bounds)?;
        if end > memory_size {
            return Err(out_of_bounds());
        }
        let mut buf = vec![0u8; length];
        self.memory
            .read(&self.store, address.as_usize(), &mut buf)
            .map_err(|_| out_of_bounds())?;
        Ok(buf)
    }
}
