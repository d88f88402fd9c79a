//! Tests for aws_secrets module.

use super::*;

#[test]
fn test_string_secret_is_trimmed() {
    let value = secret_value("signing", Some("  s3cret\n"), None).unwrap();

    assert_eq!(value, "s3cret");
}

#[test]
fn test_string_wins_over_binary() {
    let value = secret_value("signing", Some("text"), Some(b"bytes")).unwrap();

    assert_eq!(value, "text");
}

#[test]
fn test_binary_secret_is_decoded_as_utf8() {
    let value = secret_value("teams", None, Some(b"https://example.webhook.office.com/x")).unwrap();

    assert_eq!(value, "https://example.webhook.office.com/x");
}

#[test]
fn test_non_utf8_binary_secret_is_invalid() {
    let result = secret_value("teams", None, Some(&[0xff, 0xfe, 0xfd]));

    assert!(matches!(
        result,
        Err(SecretResolutionError::InvalidFormat { ref reference, .. }) if reference == "teams"
    ));
}

#[test]
fn test_empty_secret_is_invalid() {
    assert!(matches!(
        secret_value("signing", Some("   "), None),
        Err(SecretResolutionError::InvalidFormat { .. })
    ));
    assert!(matches!(
        secret_value("signing", None, None),
        Err(SecretResolutionError::InvalidFormat { .. })
    ));
}

#[test]
fn test_error_names_the_secret_reference() {
    let error = secret_value("signing", None, Some(&[0xff])).unwrap_err();

    assert!(error.to_string().contains("signing"));
}
