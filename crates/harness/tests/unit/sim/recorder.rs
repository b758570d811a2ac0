//! # Recorder Tests
//!
//! State machine transitions, per-frame call order, and the all-or-nothing abort
//! behavior, driven through mock and flat-memory hosts.

use std::collections::HashMap;

use m64trace_core::common::{Error, GuestAddr};
use m64trace_core::input::{InputCommand, MacroSource};
use m64trace_core::sim::{
    FrameStage, RecorderOptions, RecorderState, RunError, SetupStage, TrajectoryRecorder,
};
use mockall::Sequence;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::fixtures::frames;
use crate::common::harness::{FlatMemoryHost, init_tracing};
use crate::common::mocks::MockHost;

fn trap(entry: &str) -> Error {
    Error::CallTrap {
        entry: entry.to_owned(),
        message: "unreachable".to_owned(),
    }
}

fn zeroed_macro(frames: usize) -> MacroSource {
    MacroSource::from_bytes(vec![0; frames * 4])
}

/// A mock whose state pointer resolves to a zeroed window.
fn quiet_mock() -> MockHost {
    let mut host = MockHost::new();
    host.expect_initialize().times(1).returning(|| Ok(()));
    host.expect_state_pointer()
        .returning(|| Ok(GuestAddr::new(0x100)));
    host.expect_read_memory()
        .returning(|_, len| Ok(vec![0; len]));
    host
}

#[test]
fn test_new_recorder_is_uninitialized() {
    let recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    assert_eq!(recorder.state(), RecorderState::Uninitialized);
    assert_eq!(recorder.stats().frames, 0);
}

#[test]
fn test_initialize_then_run() {
    init_tracing();
    // Exactly the 28 bytes the snapshot window reaches from a zero base.
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(28, 0));
    recorder.initialize().unwrap();
    assert_eq!(recorder.state(), RecorderState::Running);

    let trajectory = recorder.run(&zeroed_macro(10)).unwrap();
    assert_eq!(recorder.state(), RecorderState::Completed);
    assert_eq!(trajectory.len(), 10);
    assert!(trajectory.iter().all(|p| *p == [0.0, 0.0, 0.0]));
    assert_eq!(recorder.host().initialized, 1);
}

#[test]
fn test_setup_called_exactly_once_before_any_step() {
    let mut seq = Sequence::new();
    let mut host = MockHost::new();
    host.expect_initialize()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    host.expect_step()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    host.expect_state_pointer()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(GuestAddr::new(0)));
    host.expect_read_memory()
        .with(eq(GuestAddr::new(4)), eq(24))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, len| Ok(vec![0; len]));

    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    assert_eq!(recorder.run(&zeroed_macro(1)).unwrap().len(), 1);
}

#[test]
fn test_inputs_reach_host_in_frame_order() {
    let records = [[0x80, 0x00, 0x32, 0xCE], [0x00, 0x00, 0x00, 0x00], [0x40, 0x10, 0x7F, 0x80]];
    let source = MacroSource::from_bytes(frames(&records));
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    recorder.initialize().unwrap();
    let _ = recorder.run(&source).unwrap();

    let expected: Vec<InputCommand> = records.iter().copied().map(InputCommand::from_record).collect();
    assert_eq!(recorder.host().inputs, expected);
}

#[test]
fn test_positions_follow_module_state() {
    let host = FlatMemoryHost::new(64, 16).with_script(|frame, input, memory| {
        let x = frame as f32;
        let y = f32::from(input.stick_x);
        for (i, v) in [x, y, -x].iter().enumerate() {
            let at = 16 + 4 + i * 4;
            memory[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        Ok(())
    });
    let source = MacroSource::from_bytes(frames(&[[0, 0, 5, 0], [0, 0, 0xFB, 0], [0, 0, 1, 0]]));
    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let trajectory = recorder.run(&source).unwrap();
    assert_eq!(
        trajectory.positions(),
        &[[0.0, 5.0, -0.0], [1.0, -5.0, -1.0], [2.0, 1.0, -2.0]]
    );
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(9)]
fn test_trap_on_frame_k_aborts_without_trajectory(#[case] k: usize) {
    let mut host = quiet_mock();
    let mut step = 0usize;
    host.expect_step().times(k + 1).returning(move |_| {
        step += 1;
        if step == k + 1 { Err(trap("step_game")) } else { Ok(()) }
    });

    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let err = recorder.run(&zeroed_macro(10)).unwrap_err();

    assert_eq!(recorder.state(), RecorderState::Aborted);
    assert_eq!(err.frame(), Some(k));
    match err {
        RunError::Aborted {
            frame,
            stage,
            source,
        } => {
            assert_eq!(frame, k);
            assert_eq!(stage, FrameStage::Step);
            assert!(matches!(source, Error::CallTrap { .. }));
        }
        other => panic!("expected Aborted, got {other:?}"),
    }
}

#[test]
fn test_state_pointer_trap_aborts() {
    let mut host = MockHost::new();
    host.expect_initialize().returning(|| Ok(()));
    host.expect_step().returning(|_| Ok(()));
    host.expect_state_pointer()
        .times(1)
        .returning(|| Err(trap("get_game_state")));
    host.expect_read_memory().never();

    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let err = recorder.run(&zeroed_macro(4)).unwrap_err();
    assert!(matches!(
        err,
        RunError::Aborted {
            frame: 0,
            stage: FrameStage::StatePointer,
            ..
        }
    ));
}

#[test]
fn test_out_of_bounds_extract_aborts() {
    // 27 bytes: one short of the record prefix the snapshot needs.
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(27, 0));
    recorder.initialize().unwrap();
    let err = recorder.run(&zeroed_macro(2)).unwrap_err();
    match err {
        RunError::Aborted {
            frame: 0,
            stage: FrameStage::Extract,
            source: Error::OutOfBounds { .. },
        } => {}
        other => panic!("expected out-of-bounds abort, got {other:?}"),
    }
}

#[test]
fn test_sparse_tail_floors_to_complete_frames() {
    let entries: HashMap<usize, u8> = (0..8).filter(|i| *i != 5).map(|i| (i, 0)).collect();
    let mut host = quiet_mock();
    host.expect_step().times(1).returning(|_| Ok(()));

    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let source = MacroSource::from_entries(entries);
    assert_eq!(source.frame_count(), 1);

    // Seven entries floor to one frame, and frame 0 is complete.
    assert_eq!(recorder.run(&source).unwrap().len(), 1);
}

#[test]
fn test_missing_index_mid_macro() {
    // Twelve entries (three frames) with index 6 absent.
    let mut entries: HashMap<usize, u8> = (0..12).filter(|i| *i != 6).map(|i| (i, 0)).collect();
    let _ = entries.insert(12, 0);
    let mut host = quiet_mock();
    host.expect_step().times(1).returning(|_| Ok(()));

    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let err = recorder.run(&MacroSource::from_entries(entries)).unwrap_err();
    match err {
        RunError::Aborted {
            frame: 1,
            stage: FrameStage::Decode,
            source: Error::MissingIndex { index: 6, frame: 1 },
        } => {}
        other => panic!("expected missing index abort, got {other:?}"),
    }
}

#[test]
fn test_setup_trap() {
    let mut host = MockHost::new();
    host.expect_initialize()
        .times(1)
        .returning(|| Err(trap("main_func")));
    host.expect_step().never();

    let mut recorder = TrajectoryRecorder::new(host);
    let err = recorder.initialize().unwrap_err();
    assert_eq!(recorder.state(), RecorderState::Aborted);
    assert!(matches!(
        err,
        RunError::Setup {
            stage: SetupStage::Initialize,
            ..
        }
    ));
    assert!(err.cause().is_some());
    assert_eq!(err.frame(), None);
}

#[test]
fn test_run_before_initialize() {
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    let err = recorder.run(&zeroed_macro(1)).unwrap_err();
    assert!(matches!(
        err,
        RunError::InvalidState {
            expected: RecorderState::Running,
            actual: RecorderState::Uninitialized,
        }
    ));
    assert_eq!(recorder.host().inputs.len(), 0);
}

#[test]
fn test_initialize_twice() {
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    recorder.initialize().unwrap();
    assert!(matches!(
        recorder.initialize(),
        Err(RunError::InvalidState {
            expected: RecorderState::Uninitialized,
            actual: RecorderState::Running,
        })
    ));
    assert_eq!(recorder.host().initialized, 1);
}

#[test]
fn test_run_after_completion() {
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    recorder.initialize().unwrap();
    let _ = recorder.run(&zeroed_macro(2)).unwrap();
    assert!(matches!(
        recorder.run(&zeroed_macro(2)),
        Err(RunError::InvalidState {
            actual: RecorderState::Completed,
            ..
        })
    ));
}

#[test]
fn test_run_after_abort() {
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(8, 0));
    recorder.initialize().unwrap();
    let _ = recorder.run(&zeroed_macro(1)).unwrap_err();
    assert!(matches!(
        recorder.run(&zeroed_macro(1)),
        Err(RunError::InvalidState {
            actual: RecorderState::Aborted,
            ..
        })
    ));
}

#[test]
fn test_empty_macro_completes_with_empty_trajectory() {
    let mut host = quiet_mock();
    host.expect_step().never();
    let mut recorder = TrajectoryRecorder::new(host);
    recorder.initialize().unwrap();
    let trajectory = recorder.run(&MacroSource::from_bytes(vec![1, 2, 3])).unwrap();
    assert!(trajectory.is_empty());
    assert_eq!(recorder.state(), RecorderState::Completed);
}

#[test]
fn test_max_frames_caps_run() {
    let options = RecorderOptions {
        max_frames: Some(3),
        ..RecorderOptions::default()
    };
    let mut recorder = TrajectoryRecorder::with_options(FlatMemoryHost::new(64, 0), options);
    recorder.initialize().unwrap();
    let trajectory = recorder.run(&zeroed_macro(10)).unwrap();
    assert_eq!(trajectory.len(), 3);
    assert_eq!(recorder.host().inputs.len(), 3);
    assert_eq!(recorder.state(), RecorderState::Completed);
}

#[test]
fn test_max_frames_above_macro_length() {
    let options = RecorderOptions {
        max_frames: Some(100),
        ..RecorderOptions::default()
    };
    let mut recorder = TrajectoryRecorder::with_options(FlatMemoryHost::new(64, 0), options);
    recorder.initialize().unwrap();
    assert_eq!(recorder.run(&zeroed_macro(4)).unwrap().len(), 4);
}

#[test]
fn test_trace_and_progress_options() {
    init_tracing();
    let options = RecorderOptions {
        trace_frames: true,
        progress_interval: 1,
        max_frames: None,
    };
    let mut recorder = TrajectoryRecorder::with_options(FlatMemoryHost::new(64, 0), options);
    recorder.initialize().unwrap();
    assert_eq!(recorder.run(&zeroed_macro(5)).unwrap().len(), 5);
}

#[test]
fn test_stats_after_run() {
    let mut recorder = TrajectoryRecorder::new(FlatMemoryHost::new(64, 0));
    recorder.initialize().unwrap();
    let _ = recorder.run(&zeroed_macro(10)).unwrap();
    let stats = recorder.stats();
    assert_eq!(stats.frames, 10);
    assert_eq!(stats.host_calls, 21);
    assert_eq!(stats.bytes_read, 240);
    assert!(stats.elapsed.is_some());
}

#[test]
fn test_recorder_over_borrowed_host() {
    let mut host = FlatMemoryHost::new(64, 0);
    {
        let mut recorder = TrajectoryRecorder::new(&mut host);
        recorder.initialize().unwrap();
        let _ = recorder.run(&zeroed_macro(2)).unwrap();
    }
    assert_eq!(host.inputs.len(), 2);
}

#[test]
fn test_options_from_general_config() {
    let general = m64trace_core::config::GeneralConfig {
        progress_interval: 0,
        ..Default::default()
    };
    let options = RecorderOptions::from(&general);
    assert_eq!(options.progress_interval, 1);
}
