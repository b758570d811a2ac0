//! Input-macro replay CLI.
//!
//! This binary provides a single entry point for the harness. It performs:
//! 1. **Run:** Replay a macro against a module and write the position trajectory as JSON.
//! 2. **Decode:** Print the decoded per-frame inputs of a macro without running anything.
//! 3. **Check:** Load and link a module to verify it satisfies the entry point contract.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use m64trace_core::config::{Config, MacroFormat};
use m64trace_core::host;
use m64trace_core::input::MacroSource;
use m64trace_core::sim::{self, Recording};

#[derive(Parser, Debug)]
#[command(
    name = "m64trace",
    author,
    version,
    about = "Replay recorded controller input against a WebAssembly game simulation",
    long_about = "Replay recorded controller input against a WebAssembly game simulation and extract the player trajectory.\n\nExamples:\n  m64trace run --module sm64_headless.us.wasm --macro gameplay.json -o trajectory.json\n  m64trace run --module sm64_headless.us.wasm --macro run.m64 --format m64 --skip-header\n  m64trace decode --macro gameplay.json --limit 20\n  m64trace check --module sm64_headless.us.wasm"
)]
struct Cli {
    /// Log filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Json,
    M64,
}

impl From<FormatArg> for MacroFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Self::Json,
            FormatArg::M64 => Self::M64,
        }
    }
}

#[derive(clap::Args, Debug)]
struct MacroArgs {
    /// Input macro file.
    #[arg(short = 'i', long = "macro")]
    path: Option<PathBuf>,

    /// Macro file encoding.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Skip the 0x400-byte m64 header.
    #[arg(long)]
    skip_header: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a macro and write the trajectory.
    Run {
        /// JSON configuration file; flags override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Simulation module (.wasm).
        #[arg(short, long)]
        module: Option<PathBuf>,

        #[command(flatten)]
        input: MacroArgs,

        /// Trajectory output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the full recording (trajectory, stats, final state) instead of just positions.
        #[arg(long)]
        full: bool,

        /// Stop after this many frames.
        #[arg(long)]
        max_frames: Option<usize>,

        /// Log every frame at trace level.
        #[arg(long)]
        trace: bool,

        /// Read the full state record after the last frame.
        #[arg(long)]
        final_state: bool,

        /// Don't pass the module's stdout through.
        #[arg(long)]
        quiet_module: bool,
    },

    /// Print the decoded inputs of a macro.
    Decode {
        #[command(flatten)]
        input: MacroArgs,

        /// Print at most this many frames.
        #[arg(long)]
        limit: Option<usize>,

        /// Emit one JSON object per line.
        #[arg(long)]
        json: bool,
    },

    /// Verify a module loads, links, and exports the expected entry points.
    Check {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Simulation module (.wasm).
        #[arg(short, long)]
        module: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log, matches!(cli.command, Commands::Run { trace: true, .. }));

    let result = match cli.command {
        Commands::Run {
            config,
            module,
            input,
            output,
            full,
            max_frames,
            trace,
            final_state,
            quiet_module,
        } => load_config(config).and_then(|mut cfg| {
            apply_module(&mut cfg, module);
            apply_macro(&mut cfg, input);
            if max_frames.is_some() {
                cfg.general.max_frames = max_frames;
            }
            cfg.general.trace_frames |= trace;
            cfg.general.report_final_state |= final_state;
            if quiet_module {
                cfg.module.inherit_stdout = false;
            }
            cmd_run(&cfg, output, full)
        }),
        Commands::Decode { input, limit, json } => cmd_decode(input, limit, json),
        Commands::Check { config, module } => load_config(config).and_then(|mut cfg| {
            apply_module(&mut cfg, module);
            cmd_check(&cfg)
        }),
    };

    if let Err(e) = result {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Installs the stderr subscriber; `RUST_LOG` wins over `--log`.
fn init_logging(default: &str, trace: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if trace {
            format!("{default},m64trace_core=trace")
        } else {
            default.to_owned()
        };
        EnvFilter::new(directive)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_config(path: Option<PathBuf>) -> CliResult<Config> {
    Ok(match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    })
}

fn apply_module(cfg: &mut Config, module: Option<PathBuf>) {
    if module.is_some() {
        cfg.module.path = module;
    }
}

fn apply_macro(cfg: &mut Config, args: MacroArgs) {
    if args.path.is_some() {
        cfg.input.path = args.path;
    }
    if let Some(format) = args.format {
        cfg.input.format = format.into();
    }
    cfg.input.skip_header |= args.skip_header;
}

/// Replays the configured macro; writes nothing unless the whole run succeeds.
fn cmd_run(cfg: &Config, output: Option<PathBuf>, full: bool) -> CliResult<()> {
    debug!(?cfg, "effective configuration");
    let recording = sim::record(cfg)?;
    report(&recording);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    if full {
        serde_json::to_writer(&mut writer, &recording)?;
    } else {
        recording.trajectory.write_json(&mut writer)?;
    }
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = output {
        eprintln!("[*] Wrote {} positions to {}", recording.trajectory.len(), path.display());
    }
    Ok(())
}

fn report(recording: &Recording) {
    eprintln!("{}", recording.stats.summary());
    if let Some((lo, hi)) = recording.trajectory.bounds() {
        eprintln!("bounds   min ({}, {}, {})", lo[0], lo[1], lo[2]);
        eprintln!("         max ({}, {}, {})", hi[0], hi[1], hi[2]);
        eprintln!("path     {:.2} units", recording.trajectory.path_length());
    }
    if let Some(state) = &recording.final_state {
        eprintln!("\nFinal state\n{state}");
        eprintln!("won: {}", state.has_won());
    }
}

#[derive(Serialize)]
struct FrameRow {
    frame: usize,
    buttons: u16,
    stick_x: i8,
    stick_y: i8,
}

fn cmd_decode(args: MacroArgs, limit: Option<usize>, json: bool) -> CliResult<()> {
    let mut cfg = Config::default();
    apply_macro(&mut cfg, args);
    let source = MacroSource::load(cfg.input_path()?, cfg.input.format, cfg.input.skip_header)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let frames = limit.map_or(source.frame_count(), |n| n.min(source.frame_count()));
    for frame in 0..frames {
        let cmd = source.decode_frame(frame)?;
        if json {
            let row = FrameRow {
                frame,
                buttons: cmd.buttons,
                stick_x: cmd.stick_x,
                stick_y: cmd.stick_y,
            };
            serde_json::to_writer(&mut out, &row)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{frame:>8}  {cmd}")?;
        }
    }
    out.flush()?;
    eprintln!("[*] {} of {} frames ({} bytes)", frames, source.frame_count(), source.len());
    Ok(())
}

fn cmd_check(cfg: &Config) -> CliResult<()> {
    let image = host::load(cfg.module_path()?, &cfg.module)?;
    let exports = image.exports().clone();
    let handle = image.link_and_instantiate()?;
    println!("[*] Module OK: {}", cfg.module_path()?.display());
    println!("    setup   {}", exports.entry);
    println!("    step    {}", exports.step);
    println!("    state   {}", exports.state);
    println!("    memory  {} ({} bytes)", exports.memory, handle.memory_size());
    Ok(())
}
