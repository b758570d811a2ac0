//! Module loading and export validation.
//!
//! This module compiles a simulation module and checks it against the published entry
//! point contract before anything is instantiated. It performs:
//! 1. **Compilation:** Reads and compiles the `.wasm` (or `.wat`) file with a fresh engine.
//! 2. **Export validation:** Checks every required export exists with the expected signature.
//! 3. **Naming:** Records which export plays which role, for calls and error messages.
//!
//! Validation happens once, here, so a module that cannot possibly run is rejected with
//! `Error::Load` instead of failing on its first call.

use std::path::{Path, PathBuf};

use tracing::debug;
use wasmtime::{Engine, ExternType, FuncType, Module, ValType};

use crate::common::{Error, Result};
use crate::config::ModuleConfig;

/// Display name used for modules compiled from in-memory bytes.
const IN_MEMORY_PATH: &str = "<memory>";

/// Export names for each role in the module contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportNames {
    /// One-time setup, `() -> ()`.
    pub entry: String,
    /// Per-frame step, `(i32, i32, i32) -> ()`.
    pub step: String,
    /// State pointer, `() -> i32`.
    pub state: String,
    /// Linear memory.
    pub memory: String,
}

impl From<&ModuleConfig> for ExportNames {
    fn from(config: &ModuleConfig) -> Self {
        Self {
            entry: config.entry_export.clone(),
            step: config.step_export.clone(),
            state: config.state_export.clone(),
            memory: config.memory_export.clone(),
        }
    }
}

/// A compiled, validated module that has not been instantiated yet.
pub struct ModuleImage {
    pub(crate) engine: Engine,
    pub(crate) module: Module,
    pub(crate) path: PathBuf,
    pub(crate) exports: ExportNames,
    pub(crate) inherit_stdout: bool,
}

impl std::fmt::Debug for ModuleImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleImage")
            .field("path", &self.path)
            .field("exports", &self.exports)
            .field("inherit_stdout", &self.inherit_stdout)
            .finish_non_exhaustive()
    }
}

impl ModuleImage {
    /// Path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Export names bound to each role.
    pub const fn exports(&self) -> &ExportNames {
        &self.exports
    }

    /// Compiles a module from in-memory bytes (binary or text format).
    pub fn from_bytes(bytes: &[u8], config: &ModuleConfig) -> Result<Self> {
        let path = PathBuf::from(IN_MEMORY_PATH);
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(|e| Error::Load {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;
        Self::validated(engine, module, path, config)
    }

    fn validated(engine: Engine, module: Module, path: PathBuf, config: &ModuleConfig) -> Result<Self> {
        let exports = ExportNames::from(config);
        if let Err(reason) = validate_exports(&module, &exports) {
            return Err(Error::Load { path, reason });
        }
        debug!(
            path = %path.display(),
            imports = module.imports().len(),
            exports = module.exports().len(),
            "module compiled and validated"
        );
        Ok(Self {
            engine,
            module,
            path,
            exports,
            inherit_stdout: config.inherit_stdout,
        })
    }
}

/// Compiles the module at `path` and validates its exports.
///
/// # Arguments
///
/// * `path` - Path to a `.wasm` binary (or `.wat` text).
/// * `config` - Export names and stdout policy.
///
/// # Returns
///
/// The validated image, or `Error::Load` if the file is missing, malformed, or does not
/// export the expected entry points.
pub fn load(path: impl AsRef<Path>, config: &ModuleConfig) -> Result<ModuleImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::Load {
            path: path.to_path_buf(),
            reason: "no such file".to_owned(),
        });
    }
    let engine = Engine::default();
    let module = Module::from_file(&engine, path).map_err(|e| Error::Load {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;
    ModuleImage::validated(engine, module, path.to_path_buf(), config)
}

/// Checks every role in `exports` against the module's export table.
fn validate_exports(module: &Module, exports: &ExportNames) -> std::result::Result<(), String> {
    expect_func(module, &exports.entry, 0, 0)?;
    expect_func(module, &exports.step, 3, 0)?;
    expect_func(module, &exports.state, 0, 1)?;
    match module.get_export(&exports.memory) {
        Some(ExternType::Memory(ty)) if ty.is_64() => {
            Err(format!("memory '{}' is 64-bit; only 32-bit memories are supported", exports.memory))
        }
        Some(ExternType::Memory(_)) => Ok(()),
        Some(_) => Err(format!("export '{}' is not a memory", exports.memory)),
        None => Err(format!("missing memory export '{}'", exports.memory)),
    }
}

/// Checks that `name` is a function taking `params` i32s and returning `results` i32s.
///
/// Every value crossing the module boundary is an `i32`: buttons and stick axes are
/// widened, and the state pointer is a 32-bit linear-memory offset.
fn expect_func(
    module: &Module,
    name: &str,
    params: usize,
    results: usize,
) -> std::result::Result<(), String> {
    let ty = match module.get_export(name) {
        Some(ExternType::Func(ty)) => ty,
        Some(_) => return Err(format!("export '{name}' is not a function")),
        None => return Err(format!("missing function export '{name}'")),
    };
    if signature_matches(&ty, params, results) {
        Ok(())
    } else {
        Err(format!(
            "export '{name}' has {} params and {} results; expected {params} i32 params and {} i32 results",
            ty.params().len(),
            ty.results().len(),
            results
        ))
    }
}

fn signature_matches(ty: &FuncType, params: usize, results: usize) -> bool {
    let is_i32 = |v: ValType| matches!(v, ValType::I32);
    ty.params().len() == params
        && ty.params().all(is_i32)
        && ty.results().len() == results
        && ty.results().all(is_i32)
}
