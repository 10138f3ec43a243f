use chargesync::config::{Config, ConfigEntry, EntryData, EntryOptions};
use chargesync::error::ChargeSyncError;
use chargesync::persistence::{
    ConfigFileStore, EntryStore, LEGACY_TOKEN_FILE_NAME, migrate_legacy_token,
};

#[test]
fn token_updates_are_written_back_to_yaml() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("chargesync.yaml");
    let entry = ConfigEntry::new("driver", "secret", "old-token");

    let store = ConfigFileStore::open(&path).unwrap();
    store.add_entry(entry.clone()).unwrap();
    store.update_session_token(&entry.entry_id, "new-token").unwrap();
    store
        .update_options(&entry.entry_id, EntryOptions { poll_interval: 300 })
        .unwrap();

    let reopened = ConfigFileStore::open(&path).unwrap();
    let stored = reopened.entry(&entry.entry_id).unwrap();
    assert_eq!(stored.data.session_token, "new-token");
    assert_eq!(stored.options.poll_interval, 300);
    assert_eq!(reopened.entries().len(), 1);
}

#[test]
fn failed_save_leaves_memory_unchanged() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("missing").join("chargesync.yaml");
    let entry = ConfigEntry::new("driver", "secret", "old-token");
    let config = Config {
        entries: vec![entry.clone()],
        ..Config::default()
    };
    let store = ConfigFileStore::new(&path, config);

    let err = store
        .update_options(&entry.entry_id, EntryOptions { poll_interval: 300 })
        .unwrap_err();
    assert!(matches!(err, ChargeSyncError::Io { .. }));
    assert!(store.update_session_token(&entry.entry_id, "new-token").is_err());
    assert!(store.add_entry(ConfigEntry::new("other", "pw", "")).is_err());

    let stored = store.entry(&entry.entry_id).unwrap();
    assert_eq!(stored.options.poll_interval, entry.options.poll_interval);
    assert_eq!(stored.data.session_token, "old-token");
    assert_eq!(store.entries().len(), 1);
    assert!(!path.exists());
}

#[test]
fn credentials_update_renames_entry() {
    let entry = ConfigEntry::new("driver", "secret", "tok");
    let store = ConfigFileStore::in_memory(Config::default());
    store.add_entry(entry.clone()).unwrap();

    store
        .update_credentials(
            &entry.entry_id,
            EntryData {
                username: "new-driver".to_string(),
                password: "better".to_string(),
                session_token: "tok-2".to_string(),
            },
        )
        .unwrap();

    let stored = store.entry(&entry.entry_id).unwrap();
    assert_eq!(stored.title, "new-driver");
    assert_eq!(stored.data.password, "better");
    assert_eq!(stored.options, entry.options);
}

#[test]
fn duplicate_entries_are_rejected() {
    let entry = ConfigEntry::new("driver", "secret", "tok");
    let store = ConfigFileStore::in_memory(Config::default());
    store.add_entry(entry.clone()).unwrap();

    let err = store.add_entry(entry).unwrap_err();
    assert!(matches!(err, ChargeSyncError::Validation { .. }));
}

#[test]
fn legacy_token_in_object_form_is_adopted() {
    let tmp = tempfile::tempdir().unwrap();
    let legacy = tmp.path().join(LEGACY_TOKEN_FILE_NAME);
    std::fs::write(&legacy, r#"{"session_token": "from-file"}"#).unwrap();
    let mut entry = ConfigEntry::new("driver", "secret", "");

    assert!(migrate_legacy_token(tmp.path(), &mut entry).unwrap());
    assert_eq!(entry.data.session_token, "from-file");
    assert!(!legacy.exists());
}

#[test]
fn unreadable_legacy_file_is_still_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let legacy = tmp.path().join(LEGACY_TOKEN_FILE_NAME);
    std::fs::write(&legacy, b"not json at all").unwrap();
    let mut entry = ConfigEntry::new("driver", "secret", "");

    assert!(!migrate_legacy_token(tmp.path(), &mut entry).unwrap());
    assert!(entry.data.session_token.is_empty());
    assert!(!legacy.exists());
}

#[test]
fn missing_legacy_file_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let mut entry = ConfigEntry::new("driver", "secret", "tok");

    assert!(!migrate_legacy_token(tmp.path(), &mut entry).unwrap());
    assert_eq!(entry.data.session_token, "tok");
}
