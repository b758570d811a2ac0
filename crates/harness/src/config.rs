//! Configuration system for the replay harness.
//!
//! This module defines all configuration structures and enums used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline export names, progress interval, and input format.
//! 2. **Structures:** Hierarchical config for general, module, and input settings.
//! 3. **Enums:** Macro source formats.
//!
//! Configuration is supplied as JSON (`Config::from_file`) or built from
//! `Config::default()` and overridden field by field from the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{Error, Result};

/// Default configuration constants for the harness.
///
/// These values describe the published module interface and the baseline run
/// behavior when not explicitly overridden in a configuration file.
mod defaults {
    /// Export called once before the frame loop.
    pub const ENTRY_EXPORT: &str = "main_func";

    /// Export that advances the simulation by one frame.
    pub const STEP_EXPORT: &str = "step_game";

    /// Export that returns the address of the state record.
    pub const STATE_EXPORT: &str = "get_game_state";

    /// Exported linear memory.
    pub const MEMORY_EXPORT: &str = "memory";

    /// Frames between progress log events.
    pub const PROGRESS_INTERVAL: usize = 1000;
}

/// On-disk representation of a recorded input macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MacroFormat {
    /// JSON object mapping decimal byte indices to byte values.
    #[default]
    #[serde(alias = "JSON", alias = "json")]
    Json,
    /// Raw `.m64` byte stream, four bytes per frame.
    #[serde(alias = "m64")]
    M64,
}

/// Root configuration for a harness run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General run settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Simulation module location and export names.
    #[serde(default)]
    pub module: ModuleConfig,

    /// Input macro location and format.
    #[serde(default)]
    pub input: InputConfig,
}

impl Config {
    /// Parses a configuration from a JSON string.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.general.progress_interval == 0 {
            return Err(Error::Config {
                reason: "general.progress_interval must be at least 1".to_owned(),
            });
        }
        let exports = [
            ("module.entry_export", &self.module.entry_export),
            ("module.step_export", &self.module.step_export),
            ("module.state_export", &self.module.state_export),
            ("module.memory_export", &self.module.memory_export),
        ];
        for (field, name) in exports {
            if name.is_empty() {
                return Err(Error::Config {
                    reason: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Returns the module path, or a configuration error if none was given.
    pub fn module_path(&self) -> Result<&Path> {
        self.module.path.as_deref().ok_or_else(|| Error::Config {
            reason: "no simulation module path given".to_owned(),
        })
    }

    /// Returns the macro path, or a configuration error if none was given.
    pub fn input_path(&self) -> Result<&Path> {
        self.input.path.as_deref().ok_or_else(|| Error::Config {
            reason: "no input macro path given".to_owned(),
        })
    }
}

/// General run settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Emit a trace event for every frame (input, address, position).
    #[serde(default)]
    pub trace_frames: bool,

    /// Frames between progress events at info level.
    #[serde(default = "GeneralConfig::default_progress_interval")]
    pub progress_interval: usize,

    /// Stop after this many frames even if the macro is longer.
    #[serde(default)]
    pub max_frames: Option<usize>,

    /// Read the full state record once after the last frame.
    #[serde(default)]
    pub report_final_state: bool,
}

impl GeneralConfig {
    /// Returns the default progress interval.
    fn default_progress_interval() -> usize {
        defaults::PROGRESS_INTERVAL
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace_frames: false,
            progress_interval: defaults::PROGRESS_INTERVAL,
            max_frames: None,
            report_final_state: false,
        }
    }
}

/// Simulation module location and the names of its published exports.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Path to the compiled `.wasm` module.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Setup export, called exactly once before the first frame.
    #[serde(default = "ModuleConfig::default_entry_export")]
    pub entry_export: String,

    /// Per-frame step export.
    #[serde(default = "ModuleConfig::default_step_export")]
    pub step_export: String,

    /// State pointer export.
    #[serde(default = "ModuleConfig::default_state_export")]
    pub state_export: String,

    /// Linear memory export.
    #[serde(default = "ModuleConfig::default_memory_export")]
    pub memory_export: String,

    /// Pass the module's stdout writes through to the host's stdout.
    #[serde(default = "ModuleConfig::default_inherit_stdout")]
    pub inherit_stdout: bool,
}

impl ModuleConfig {
    /// Returns the default setup export name.
    fn default_entry_export() -> String {
        defaults::ENTRY_EXPORT.to_owned()
    }

    /// Returns the default step export name.
    fn default_step_export() -> String {
        defaults::STEP_EXPORT.to_owned()
    }

    /// Returns the default state pointer export name.
    fn default_state_export() -> String {
        defaults::STATE_EXPORT.to_owned()
    }

    /// Returns the default memory export name.
    fn default_memory_export() -> String {
        defaults::MEMORY_EXPORT.to_owned()
    }

    /// Stdout passthrough is on unless explicitly disabled.
    fn default_inherit_stdout() -> bool {
        true
    }
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            path: None,
            entry_export: Self::default_entry_export(),
            step_export: Self::default_step_export(),
            state_export: Self::default_state_export(),
            memory_export: Self::default_memory_export(),
            inherit_stdout: true,
        }
    }
}

/// Input macro location and format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    /// Path to the macro file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// How the macro file is encoded.
    #[serde(default)]
    pub format: MacroFormat,

    /// Skip the 0x400-byte `.m64` header before the first frame record.
    #[serde(default)]
    pub skip_header: bool,
}
