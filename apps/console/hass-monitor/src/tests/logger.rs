// Unit tests for logger setup
// Installing the global logger can only happen once per test binary

use crate::error::MonitorError;
use crate::logger::{DEFAULT_LOG_LEVEL, LOG_FILE_NAME, dispatch, initialize, level_from};

use std::path::PathBuf;

use log::LevelFilter;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: fern refuses to install a second global logger. Without the
/// guards a second call would error out.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    // WHEN: Calling initialize twice
    let first = initialize(temp_dir.path(), LevelFilter::Info);
    let second = initialize(temp_dir.path(), LevelFilter::Debug);

    // THEN: Both return Ok
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(second.is_ok(), "Second initialization should be a no-op");
}

#[test]
fn given_writable_dir_when_dispatch_built_then_log_file_created() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    let result = dispatch(temp_dir.path(), LevelFilter::Warn);

    assert!(result.is_ok());
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: An unwritable log directory is reported as an error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` is unwrapped.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_returns_error() {
    // GIVEN: A path under a file, which can never be a directory
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = dispatch(&invalid_dir, DEFAULT_LOG_LEVEL);

    // THEN: Monitor error naming the file
    match result {
        Err(MonitorError::Monitor { message, .. }) => {
            assert!(message.contains(LOG_FILE_NAME), "{message}");
        }
        Err(other) => panic!("Expected MonitorError::Monitor, got {other:?}"),
        Ok(_) => panic!("Expected an error for an invalid log directory"),
    }
}

#[test]
fn given_level_names_when_parsed_then_levels_or_default() {
    assert_eq!(level_from(None).expect("default"), DEFAULT_LOG_LEVEL);
    assert_eq!(level_from(Some("  ")).expect("default"), DEFAULT_LOG_LEVEL);
    assert_eq!(level_from(Some("trace")).expect("valid"), LevelFilter::Trace);
    assert_eq!(level_from(Some("WARN")).expect("valid"), LevelFilter::Warn);
    assert_eq!(level_from(Some("off")).expect("valid"), LevelFilter::Off);
}

#[test]
fn given_unknown_level_name_when_parsed_then_monitor_error() {
    match level_from(Some("loud")) {
        Err(MonitorError::Monitor { message, .. }) => {
            assert!(message.contains("HASS_MONITOR_LOG_LEVEL=loud"), "{message}");
        }
        other => panic!("Expected MonitorError::Monitor, got {other:?}"),
    }
}
