use chargesync::error::ChargeSyncError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        ChargeSyncError::config("x"),
        ChargeSyncError::Config { .. }
    ));
    assert!(matches!(ChargeSyncError::io("x"), ChargeSyncError::Io { .. }));
    assert!(matches!(
        ChargeSyncError::auth("x"),
        ChargeSyncError::Auth { .. }
    ));
    assert!(matches!(
        ChargeSyncError::not_ready("x"),
        ChargeSyncError::NotReady { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(
        ChargeSyncError::update_failed("x"),
        ChargeSyncError::UpdateFailed { .. }
    ));
    assert!(matches!(ChargeSyncError::api("x"), ChargeSyncError::Api { .. }));
    assert!(matches!(
        ChargeSyncError::validation("f", "m"),
        ChargeSyncError::Validation { .. }
    ));
    assert!(matches!(
        ChargeSyncError::not_found("x"),
        ChargeSyncError::NotFound { .. }
    ));
    assert!(matches!(
        ChargeSyncError::generic("x"),
        ChargeSyncError::Generic { .. }
    ));
}

#[test]
fn only_auth_errors_require_reauth() {
    assert!(ChargeSyncError::auth("expired").requires_reauth());
    assert!(!ChargeSyncError::update_failed("timeout").requires_reauth());
    assert!(!ChargeSyncError::not_ready("offline").requires_reauth());
}

#[test]
fn display_messages() {
    let e = ChargeSyncError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
    assert!(s.contains("field"));

    let e: ChargeSyncError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(format!("{}", e).contains("Serialization error"));
}
