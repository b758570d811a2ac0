//! # End-to-End Tests
//!
//! Complete runs through real instantiated modules: one-call `record` from a config,
//! and `replay` on a prepared handle.

use std::path::PathBuf;

use m64trace_core::common::Error;
use m64trace_core::config::{Config, GeneralConfig, MacroFormat};
use m64trace_core::input::MacroSource;
use m64trace_core::sim::{FrameStage, RunError, SetupStage, record, replay};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use crate::common::fixtures::{
    ECHO_WAT, ENV_IMPORT_WAT, NOOP_WAT, POINTER_PAST_END_WAT, TRAP_IN_SETUP_WAT,
    TRAP_ON_THIRD_STEP_WAT, frames, handle, keyed_json, module_config, temp_file, temp_module,
};
use crate::common::harness::init_tracing;

fn config_for(module: &NamedTempFile, input: &NamedTempFile) -> Config {
    let mut config = Config::default();
    config.module = module_config();
    config.module.path = Some(module.path().to_path_buf());
    config.input.path = Some(input.path().to_path_buf());
    config
}

fn gameplay_bytes() -> Vec<u8> {
    frames(&[
        [0x00, 0x00, 0x00, 0x00],
        [0x80, 0x00, 0x32, 0xCE],
        [0x80, 0x00, 0x7F, 0x00],
        [0x00, 0x00, 0x81, 0x10],
        [0x40, 0x20, 0x00, 0x00],
        [0x80, 0x00, 0xFF, 0xFF],
    ])
}

#[test]
fn test_noop_module_forty_byte_macro() {
    init_tracing();
    let source = MacroSource::from_bytes(vec![0; 40]);
    let recording = replay(handle(NOOP_WAT), &source, &GeneralConfig::default()).unwrap();
    assert_eq!(recording.trajectory.positions(), &[[0.0f32, 0.0, 0.0]; 10]);
    assert_eq!(recording.stats.frames, 10);
    assert_eq!(recording.stats.host_calls, 21);
    assert!(recording.final_state.is_none());
}

#[test]
fn test_echo_positions() {
    let source = MacroSource::from_bytes(gameplay_bytes());
    let recording = replay(handle(ECHO_WAT), &source, &GeneralConfig::default()).unwrap();
    assert_eq!(
        recording.trajectory.positions(),
        &[
            [1.0, 0.0, 0.0],
            [2.0, 50.0, -50.0],
            [3.0, 127.0, 0.0],
            [4.0, -127.0, 16.0],
            [5.0, 0.0, 0.0],
            [6.0, -1.0, -1.0],
        ]
    );
}

#[test]
fn test_runs_are_bit_identical() {
    let module = temp_module(ECHO_WAT);
    let input = temp_file(keyed_json(&gameplay_bytes()).as_bytes());
    let config = config_for(&module, &input);

    let first = record(&config).unwrap().trajectory;
    let second = record(&config).unwrap().trajectory;

    let bits = |t: &m64trace_core::Trajectory| -> Vec<[u32; 3]> {
        t.iter().map(|p| p.map(f32::to_bits)).collect()
    };
    assert_eq!(first.len(), 6);
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn test_trap_on_frame_two() {
    let source = MacroSource::from_bytes(vec![0; 40]);
    let err = replay(handle(TRAP_ON_THIRD_STEP_WAT), &source, &GeneralConfig::default())
        .unwrap_err();
    match err {
        RunError::Aborted {
            frame,
            stage,
            source: Error::CallTrap { entry, .. },
        } => {
            assert_eq!(frame, 2);
            assert_eq!(stage, FrameStage::Step);
            assert_eq!(entry, "step_game");
        }
        other => panic!("expected trap abort, got {other:?}"),
    }
}

#[test]
fn test_pointer_past_end_aborts_first_frame() {
    let source = MacroSource::from_bytes(vec![0; 8]);
    let err = replay(handle(POINTER_PAST_END_WAT), &source, &GeneralConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Aborted {
            frame: 0,
            stage: FrameStage::Extract,
            source: Error::OutOfBounds { .. },
        }
    ));
}

#[test]
fn test_setup_trap() {
    let source = MacroSource::from_bytes(vec![0; 8]);
    let err = replay(handle(TRAP_IN_SETUP_WAT), &source, &GeneralConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RunError::Setup {
            stage: SetupStage::Initialize,
            source: Error::CallTrap { .. },
        }
    ));
}

#[test]
fn test_final_state_report() {
    let general = GeneralConfig {
        report_final_state: true,
        ..GeneralConfig::default()
    };
    let source = MacroSource::from_bytes(gameplay_bytes());
    let recording = replay(handle(ECHO_WAT), &source, &general).unwrap();

    let state = recording.final_state.unwrap();
    // Frames 1, 2, and 5 hold A.
    assert_eq!(state.num_stars, 3);
    assert_eq!(state.position, [6.0, -1.0, -1.0]);
    assert_eq!(state.area, 9);
    assert!(state.has_won());
    assert_eq!(recording.stats.host_calls, 1 + 2 * 6 + 1);
}

#[test]
fn test_final_state_report_out_of_bounds() {
    let general = GeneralConfig {
        report_final_state: true,
        ..GeneralConfig::default()
    };
    let source = MacroSource::from_bytes(Vec::new());
    let err = replay(handle(POINTER_PAST_END_WAT), &source, &general).unwrap_err();
    assert!(matches!(err, RunError::Report { frames: 0, .. }));
}

#[test]
fn test_record_m64_with_header() {
    let module = temp_module(NOOP_WAT);
    let mut bytes = vec![0xFF; 0x400];
    bytes.extend(vec![0; 12]);
    bytes.push(0x80);
    let input = temp_file(&bytes);

    let mut config = config_for(&module, &input);
    config.input.format = MacroFormat::M64;
    config.input.skip_header = true;
    let recording = record(&config).unwrap();
    assert_eq!(recording.trajectory.len(), 3);
}

#[test]
fn test_record_max_frames() {
    let module = temp_module(ECHO_WAT);
    let input = temp_file(keyed_json(&gameplay_bytes()).as_bytes());
    let mut config = config_for(&module, &input);
    config.general.max_frames = Some(2);
    let recording = record(&config).unwrap();
    assert_eq!(recording.trajectory.positions(), &[[1.0, 0.0, 0.0], [2.0, 50.0, -50.0]]);
}

#[test]
fn test_record_without_module_path() {
    let input = temp_file(b"{}");
    let mut config = Config::default();
    config.input.path = Some(input.path().to_path_buf());
    assert!(matches!(
        record(&config),
        Err(RunError::Setup {
            stage: SetupStage::Config,
            source: Error::Config { .. },
        })
    ));
}

#[test]
fn test_record_missing_macro_file() {
    let module = temp_module(NOOP_WAT);
    let input = temp_file(b"{}");
    let mut config = config_for(&module, &input);
    config.input.path = Some(PathBuf::from("/nonexistent/gameplay.json"));
    assert!(matches!(
        record(&config),
        Err(RunError::Setup {
            stage: SetupStage::Input,
            source: Error::Io { .. },
        })
    ));
}

#[test]
fn test_record_missing_module_file() {
    let module = temp_module(NOOP_WAT);
    let input = temp_file(b"{}");
    let mut config = config_for(&module, &input);
    config.module.path = Some(PathBuf::from("/nonexistent/sm64.wasm"));
    assert!(matches!(
        record(&config),
        Err(RunError::Setup {
            stage: SetupStage::Load,
            source: Error::Load { .. },
        })
    ));
}

#[test]
fn test_record_unsupported_import() {
    let module = temp_module(ENV_IMPORT_WAT);
    let input = temp_file(b"{}");
    let config = config_for(&module, &input);
    assert!(matches!(
        record(&config),
        Err(RunError::Setup {
            stage: SetupStage::Link,
            source: Error::UnsupportedImport { .. },
        })
    ));
}

#[test]
fn test_recording_serializes() {
    let source = MacroSource::from_bytes(vec![0; 8]);
    let recording = replay(handle(NOOP_WAT), &source, &GeneralConfig::default()).unwrap();
    let value = serde_json::to_value(&recording).unwrap();
    assert_eq!(value["trajectory"], serde_json::json!([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]));
    assert_eq!(value["stats"]["frames"], 2);
    assert!(value["final_state"].is_null());
}
