/// Complete runs against instantiated modules.
pub mod end_to_end;

/// Recorder state machine, ordering, and abort behavior.
pub mod recorder;
