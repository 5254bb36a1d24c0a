use datamonitor::config::{validate_buffer_size, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use datamonitor::Error;

#[test]
fn test_error_display() {
    let err = Error::Config("test error".to_string());
    assert_eq!(format!("{}", err), "Configuration error: test error");

    let err = Error::Parse("bad payload".to_string());
    assert_eq!(format!("{}", err), "Parse error: bad payload");
}

#[test]
fn test_invalid_buffer_size_display() {
    let err = validate_buffer_size(MAX_BUFFER_SIZE + 1).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Invalid buffer size {}: must be between {} and {}",
            MAX_BUFFER_SIZE + 1,
            MIN_BUFFER_SIZE,
            MAX_BUFFER_SIZE
        )
    );
}
