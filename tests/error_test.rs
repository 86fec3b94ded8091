use hotel_bid_modifiers::{ConfigError, Error, GoogleAdsException, GoogleAdsFailure, TokenError};

#[test]
fn test_google_ads_error_display_is_transparent() {
    let error = Error::GoogleAds(GoogleAdsException {
        request_id: "req-1".to_string(),
        code: "INVALID_ARGUMENT".to_string(),
        failure: GoogleAdsFailure::default(),
    });

    assert_eq!(
        error.to_string(),
        "Request with ID \"req-1\" failed with status \"INVALID_ARGUMENT\""
    );
    assert!(error.as_google_ads().is_some());
}

#[test]
fn test_wrapped_errors_keep_their_context() {
    let error = Error::from(ConfigError::MissingKey("refresh_token"));
    assert_eq!(
        error.to_string(),
        "Configuration error: Missing required configuration key: refresh_token"
    );
    assert!(error.as_google_ads().is_none());

    let error = Error::from(TokenError::Timeout { timeout_seconds: 5 });
    assert_eq!(
        error.to_string(),
        "Token management error: Request timeout after 5 seconds"
    );
}

#[test]
fn test_invalid_login_customer_id_message() {
    let error = ConfigError::InvalidLoginCustomerId("123-456-7890".to_string());
    let message = error.to_string();
    assert!(message.contains("\"123-456-7890\""));
    assert!(message.contains("10 digits"));
}
