//! Trajectory recorder.
//!
//! This module drives the frame loop against a `SimulationHost`. It performs:
//! 1. **Setup:** One call to the module's setup export (`Uninitialized -> Running`).
//! 2. **Frame loop:** For each frame: decode input, step, fetch the state pointer,
//!    extract the snapshot, append the position.
//! 3. **Completion:** Hands the trajectory to the caller (`Running -> Completed`).
//! 4. **Abort:** On the first error the trajectory is dropped and the error is returned
//!    with the frame and stage that failed (`Running -> Aborted`).
//!
//! A run is all or nothing: module state after a fault can't be trusted, so nothing is
//! retried and no partial trajectory is ever returned.

use std::fmt;
use std::mem;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, trace};

use super::trajectory::Trajectory;
use crate::Config;
use crate::common::Error;
use crate::config::GeneralConfig;
use crate::host::{self, ModuleHandle, SimulationHost};
use crate::input::MacroSource;
use crate::state::game_state::GameState;
use crate::state::layout::SNAPSHOT_SIZE;
use crate::state::{StateSnapshot, extract};
use crate::stats::RunStats;

/// Lifecycle of a recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    /// Setup export not called yet.
    Uninitialized,
    /// Setup done; frames may be stepped.
    Running,
    /// Every frame stepped; the trajectory has been handed out.
    Completed,
    /// A call failed; the recorder can't be used again.
    Aborted,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Step of setup that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStage {
    /// Validating configuration.
    Config,
    /// Loading the input macro.
    Input,
    /// Compiling and validating the module.
    Load,
    /// Linking and instantiating the module.
    Link,
    /// Calling the setup export.
    Initialize,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "reading configuration",
            Self::Input => "loading input macro",
            Self::Load => "loading module",
            Self::Link => "linking module",
            Self::Initialize => "initializing module",
        };
        f.write_str(name)
    }
}

/// Step of a frame transition that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStage {
    /// Decoding the frame's input record.
    Decode,
    /// Calling the step export.
    Step,
    /// Calling the state pointer export.
    StatePointer,
    /// Reading the snapshot out of linear memory.
    Extract,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "decode",
            Self::Step => "step",
            Self::StatePointer => "state pointer",
            Self::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Why a run produced no trajectory.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed before the first frame.
    #[error("setup failed while {stage}: {source}")]
    Setup {
        /// What was being set up.
        stage: SetupStage,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// Failed during a frame.
    #[error("run aborted at frame {frame} during {stage}: {source}")]
    Aborted {
        /// Zero-based frame index.
        frame: usize,
        /// Which call within the frame failed.
        stage: FrameStage,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// Reading the final state record after a completed run failed.
    #[error("final state report failed after {frames} frames: {source}")]
    Report {
        /// Frames completed.
        frames: usize,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// The recorder was used out of order.
    #[error("recorder is {actual}, expected {expected}")]
    InvalidState {
        /// State the operation requires.
        expected: RecorderState,
        /// State the recorder is in.
        actual: RecorderState,
    },
}

impl RunError {
    /// Frame at which the run aborted, if it got that far.
    pub const fn frame(&self) -> Option<usize> {
        match self {
            Self::Aborted { frame, .. } => Some(*frame),
            _ => None,
        }
    }

    /// The underlying harness error, if any.
    pub const fn cause(&self) -> Option<&Error> {
        match self {
            Self::Setup { source, .. } | Self::Aborted { source, .. } | Self::Report { source, .. } => {
                Some(source)
            }
            Self::InvalidState { .. } => None,
        }
    }
}

/// Per-run behavior knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Emit a trace event for every frame.
    pub trace_frames: bool,
    /// Frames between progress events.
    pub progress_interval: usize,
    /// Stop after this many frames.
    pub max_frames: Option<usize>,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self::from(&GeneralConfig::default())
    }
}

impl From<&GeneralConfig> for RecorderOptions {
    fn from(general: &GeneralConfig) -> Self {
        Self {
            trace_frames: general.trace_frames,
            progress_interval: general.progress_interval.max(1),
            max_frames: general.max_frames,
        }
    }
}

/// Drives one host through one macro.
#[derive(Debug)]
pub struct TrajectoryRecorder<H> {
    host: H,
    state: RecorderState,
    trajectory: Trajectory,
    stats: RunStats,
    options: RecorderOptions,
}

impl<H: SimulationHost> TrajectoryRecorder<H> {
    /// Creates a recorder with default options.
    pub fn new(host: H) -> Self {
        Self::with_options(host, RecorderOptions::default())
    }

    /// Creates a recorder with explicit options.
    pub fn with_options(host: H, options: RecorderOptions) -> Self {
        Self {
            host,
            state: RecorderState::Uninitialized,
            trajectory: Trajectory::default(),
            stats: RunStats::new(),
            options,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> RecorderState {
        self.state
    }

    /// Statistics gathered so far.
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The driven host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// The driven host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn expect_state(&self, expected: RecorderState) -> Result<(), RunError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RunError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Calls the module's setup export exactly once.
    pub fn initialize(&mut self) -> Result<(), RunError> {
        self.expect_state(RecorderState::Uninitialized)?;
        self.stats.host_calls += 1;
        if let Err(source) = self.host.initialize() {
            self.state = RecorderState::Aborted;
            error!(%source, "module setup failed");
            return Err(RunError::Setup {
                stage: SetupStage::Initialize,
                source,
            });
        }
        self.state = RecorderState::Running;
        debug!("module initialized");
        Ok(())
    }

    /// Steps every frame of `source` and returns the finished trajectory.
    ///
    /// # Arguments
    ///
    /// * `source` - The input macro; its frame count (capped by `max_frames`) sets the
    ///   number of frames.
    ///
    /// # Returns
    ///
    /// One position per frame in order, or the first error with its frame and stage.
    /// On error the recorder is `Aborted` and everything recorded so far is discarded.
    pub fn run(&mut self, source: &MacroSource) -> Result<Trajectory, RunError> {
        self.expect_state(RecorderState::Running)?;

        let available = source.frame_count();
        let frames = self.options.max_frames.map_or(available, |cap| cap.min(available));
        info!(frames, available, "replaying input macro");
        self.trajectory = Trajectory::with_capacity(frames);

        for frame in 0..frames {
            match self.advance(source, frame) {
                Ok(snapshot) => {
                    self.trajectory.push(snapshot.position);
                    self.stats.frames += 1;
                    if self.options.trace_frames {
                        trace!(frame, %snapshot, "frame");
                    }
                    if (frame + 1) % self.options.progress_interval == 0 {
                        info!(frame = frame + 1, total = frames, "progress");
                    }
                }
                Err((stage, source)) => {
                    self.state = RecorderState::Aborted;
                    self.stats.finish();
                    drop(mem::take(&mut self.trajectory));
                    error!(frame, %stage, %source, "run aborted");
                    return Err(RunError::Aborted {
                        frame,
                        stage,
                        source,
                    });
                }
            }
        }

        self.state = RecorderState::Completed;
        self.stats.finish();
        info!(
            frames = self.stats.frames,
            seconds = self.stats.host_time().as_secs_f64(),
            "replay complete"
        );
        Ok(mem::take(&mut self.trajectory))
    }

    /// One frame transition.
    fn advance(
        &mut self,
        source: &MacroSource,
        frame: usize,
    ) -> Result<StateSnapshot, (FrameStage, Error)> {
        let input = source
            .decode_frame(frame)
            .map_err(|e| (FrameStage::Decode, e))?;

        self.stats.host_calls += 1;
        self.host.step(input).map_err(|e| (FrameStage::Step, e))?;

        self.stats.host_calls += 1;
        let base = self
            .host
            .state_pointer()
            .map_err(|e| (FrameStage::StatePointer, e))?;

        let snapshot = extract(&self.host, base).map_err(|e| (FrameStage::Extract, e))?;
        self.stats.bytes_read += SNAPSHOT_SIZE as u64;

        if self.options.trace_frames {
            trace!(frame, %input, %base, "stepped");
        }
        Ok(snapshot)
    }
}

/// Output of a completed run.
#[derive(Clone, Debug, Serialize)]
pub struct Recording {
    /// One position per frame.
    pub trajectory: Trajectory,
    /// Run statistics.
    pub stats: RunStats,
    /// Full state record after the last frame, when requested.
    pub final_state: Option<GameState>,
}

/// Loads, links, and initializes the configured module, then replays the configured macro.
///
/// # Arguments
///
/// * `config` - Module and macro locations plus run options.
///
/// # Returns
///
/// The recording, or the first failure; no trajectory is returned on any error.
pub fn record(config: &Config) -> Result<Recording, RunError> {
    config.validate().map_err(setup(SetupStage::Config))?;
    let module_path = config.module_path().map_err(setup(SetupStage::Config))?;
    let input_path = config.input_path().map_err(setup(SetupStage::Config))?;

    let source = MacroSource::load(input_path, config.input.format, config.input.skip_header)
        .map_err(setup(SetupStage::Input))?;
    let handle = host::load(module_path, &config.module)
        .map_err(setup(SetupStage::Load))?
        .link_and_instantiate()
        .map_err(setup(SetupStage::Link))?;

    replay(handle, &source, &config.general)
}

fn setup(stage: SetupStage) -> impl FnOnce(Error) -> RunError {
    move |source| RunError::Setup { stage, source }
}

/// Replays `source` on an already instantiated module.
pub fn replay(
    handle: ModuleHandle,
    source: &MacroSource,
    general: &GeneralConfig,
) -> Result<Recording, RunError> {
    let mut recorder = TrajectoryRecorder::with_options(handle, general.into());
    recorder.initialize()?;
    let trajectory = recorder.run(source)?;

    let final_state = if general.report_final_state {
        let state = recorder
            .host_mut()
            .game_state()
            .map_err(|source| RunError::Report {
                frames: trajectory.len(),
                source,
            })?;
        info!(stars = state.num_stars, won = state.has_won(), "final state");
        Some(state)
    } else {
        None
    };

    let mut stats = recorder.stats().clone();
    stats.host_calls = recorder.host().calls();
    Ok(Recording {
        trajectory,
        stats,
        final_state,
    })
}
