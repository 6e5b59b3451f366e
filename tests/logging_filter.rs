// tests/logging_filter.rs

use gridrun::cli::LogLevel;
use gridrun::logging::build_filter;

#[test]
fn cli_level_beats_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap();
    assert_eq!(filter.to_string(), "debug");
}

#[test]
fn environment_directives_are_used_verbatim() {
    let filter = build_filter(None, Some("warn,gridrun::exec=trace")).unwrap();
    let rendered = filter.to_string();
    assert!(rendered.contains("gridrun::exec=trace"), "{rendered}");
    assert!(rendered.contains("warn"), "{rendered}");
}

#[test]
fn blank_or_missing_environment_defaults_to_info() {
    assert_eq!(build_filter(None, None).unwrap().to_string(), "info");
    assert_eq!(build_filter(None, Some("  ")).unwrap().to_string(), "info");
}

#[test]
fn bad_environment_level_is_rejected() {
    let err = build_filter(None, Some("gridrun=loud")).unwrap_err();
    assert!(err.to_string().contains("GRIDRUN_LOG"), "{err}");
}
