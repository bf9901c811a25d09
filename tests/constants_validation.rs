//! Validates that compile-time constants are internally consistent.
#![allow(clippy::assertions_on_constants)]

use fieldlog::util::constants::*;

#[test]
fn page_length_is_positive() {
    assert!(DEFAULT_PAGE_LENGTH > 0, "DEFAULT_PAGE_LENGTH must be > 0");
}

#[test]
fn payload_limit_holds_a_default_page_of_short_lines() {
    // A typical sensor line is well under 100 bytes.
    assert!(
        MAX_PAYLOAD_BYTES >= DEFAULT_PAGE_LENGTH * 100,
        "MAX_PAYLOAD_BYTES too small for DEFAULT_PAGE_LENGTH"
    );
}

#[test]
fn separator_is_not_part_of_timestamps() {
    assert!(DEFAULT_SEPARATOR.is_ascii_punctuation());
    assert!(!matches!(DEFAULT_SEPARATOR, ':' | '-' | '+' | '.'));
    assert_ne!(DEFAULT_SEPARATOR, TIMESTAMP_MARKER);
}

#[test]
fn day_is_86400_seconds() {
    assert_eq!(SECS_PER_DAY, 24 * 60 * 60);
}

#[test]
fn read_buffer_is_reasonable() {
    assert!(READ_BUFFER_BYTES >= 64);
    assert!(READ_BUFFER_BYTES <= 64 * 1024);
}

#[test]
fn retry_constants_are_bounded() {
    assert!(MAX_RETRY_ATTEMPTS >= 1);
    assert!(MAX_RETRY_ATTEMPTS <= 10);
    assert!(RETRY_BASE_DELAY_MS <= 1_000);
}

#[test]
fn transport_queue_is_bounded() {
    assert!(TRANSPORT_QUEUE_BOUND > 0);
}

#[test]
fn default_names_are_flat() {
    for name in [DEFAULT_FILE_PREFIX, DEFAULT_FILETYPE, DEFAULT_DEVICE_ID] {
        assert!(!name.is_empty());
        assert!(!name.contains('/'), "{name} must not contain '/'");
    }
    assert!(!DEFAULT_FILETYPE.starts_with('.'));
}

#[test]
fn app_name_is_not_empty() {
    assert!(!APP_NAME.is_empty());
    assert!(!APP_VERSION.is_empty());
}

#[test]
fn log_file_size_limit_is_reasonable() {
    assert!(MAX_LOG_FILE_SIZE >= 1024 * 1024, "at least 1 MB");
    assert!(MAX_LOG_FILE_SIZE <= 100 * 1024 * 1024, "at most 100 MB");
}
