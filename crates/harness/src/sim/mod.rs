//! Trajectory recording.
//!
//! Runs a loaded module through an input macro and collects the resulting positions.

/// Recorder state machine and one-call entry points.
pub mod recorder;

/// The recorded position sequence.
pub mod trajectory;

pub use recorder::{
    FrameStage, RecorderOptions, RecorderState, Recording, RunError, SetupStage,
    TrajectoryRecorder, record, replay,
};
pub use trajectory::Trajectory;
