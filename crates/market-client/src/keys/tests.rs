//! Unit tests for keys module.

use super::*;

fn rotator_with(keys: &[&str]) -> (Arc<MemoryKeyStore>, KeyRotator) {
    let store = Arc::new(MemoryKeyStore::with_keys(keys));
    let rotator = KeyRotator::new(store.clone());
    (store, rotator)
}

fn usage(store: &MemoryKeyStore) -> Vec<u64> {
    store.snapshot().keys.iter().map(|c| c.used).collect()
}

// ============================================================================
// Masking
// ============================================================================

#[test]
fn test_mask_key_long() {
    assert_eq!(mask_key("abcdefghijklmnopqrstuvwxyz"), "abcde...vwxyz");
}

#[test]
fn test_mask_key_short() {
    assert_eq!(mask_key("abc"), "...");
    assert_eq!(mask_key("abcdefgh"), "ab...gh");
    assert_eq!(mask_key("0123456789"), "01...89");
    assert_eq!(mask_key("0123456789a"), "01234...6789a");
    assert_eq!(mask_key(""), "...");
}

#[test]
fn test_list_keys_masks_secrets() {
    let (_, rotator) = rotator_with(&["0123456789-secret-abcdef"]);

    let keys = rotator.list_keys();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key, "01234...bcdef");
    assert_eq!(keys[0].rate_limit, DEFAULT_RATE_LIMIT);
    assert_eq!(keys[0].used, 0);
}

#[test]
fn test_masked_credential_serialization() {
    let masked = MaskedCredential::from(&Credential::new("abcdefghijklmnop", 45));
    let json = serde_json::to_string(&masked).unwrap();
    assert!(json.contains("\"key\":\"abcde...lmnop\""));
    assert!(json.contains("\"rateLimit\":45"));
    assert!(json.contains("\"used\":0"));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_key_empty_fails() {
    let (_, rotator) = rotator_with(&[]);
    assert!(matches!(rotator.select_key(), Err(KeyError::NoCredentials)));
}

#[test]
fn test_select_key_picks_least_used() {
    let store = Arc::new(MemoryKeyStore::new(CredentialSet {
        keys: vec![
            Credential {
                key: "key-a".to_string(),
                rate_limit: 30,
                used: 4,
            },
            Credential {
                key: "key-b".to_string(),
                rate_limit: 30,
                used: 1,
            },
            Credential {
                key: "key-c".to_string(),
                rate_limit: 30,
                used: 2,
            },
        ],
        last_rotation: Utc::now(),
    }));
    let rotator = KeyRotator::new(store.clone());

    assert_eq!(rotator.select_key().unwrap(), "key-b");
    assert_eq!(usage(&store), vec![4, 2, 2]);
    // Tie between key-b and key-c goes to the earlier entry.
    assert_eq!(rotator.select_key().unwrap(), "key-b");
    assert_eq!(usage(&store), vec![4, 3, 2]);
    assert_eq!(rotator.select_key().unwrap(), "key-c");
}

#[test]
fn test_select_key_ties_follow_input_order() {
    let (_, rotator) = rotator_with(&["first", "second", "third"]);

    let picked: Vec<String> = (0..6).map(|_| rotator.select_key().unwrap()).collect();
    assert_eq!(
        picked,
        vec!["first", "second", "third", "first", "second", "third"]
    );
}

#[test]
fn test_select_key_spreads_usage_evenly() {
    let (store, rotator) = rotator_with(&["a", "b", "c", "d"]);

    for _ in 0..23 {
        rotator.select_key().unwrap();
    }

    let counts = usage(&store);
    let max = counts.iter().max().unwrap();
    let min = counts.iter().min().unwrap();
    assert!(max - min <= 1, "usage not balanced: {counts:?}");
    assert_eq!(counts.iter().sum::<u64>(), 23);
}

#[test]
fn test_select_key_past_rate_limit_still_returned() {
    let store = Arc::new(MemoryKeyStore::new(CredentialSet {
        keys: vec![Credential {
            key: "only".to_string(),
            rate_limit: 1,
            used: 1,
        }],
        last_rotation: Utc::now(),
    }));
    let rotator = KeyRotator::new(store.clone());

    assert_eq!(rotator.select_key().unwrap(), "only");
    assert_eq!(usage(&store), vec![2]);
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_usage_zeroes_counts_and_restamps() {
    let (store, rotator) = rotator_with(&["a", "b"]);
    let before = rotator.last_rotation();

    for _ in 0..5 {
        rotator.select_key().unwrap();
    }
    std::thread::sleep(std::time::Duration::from_millis(5));
    rotator.reset_usage().unwrap();

    assert_eq!(usage(&store), vec![0, 0]);
    assert!(rotator.last_rotation() > before);
    // Selection order starts over from the first key.
    assert_eq!(rotator.select_key().unwrap(), "a");
    assert_eq!(rotator.select_key().unwrap(), "b");
}

// ============================================================================
// Add / remove
// ============================================================================

#[test]
fn test_add_key_appends_unused() {
    let (store, rotator) = rotator_with(&["a"]);

    rotator.add_key("b", 60).unwrap();

    let set = store.snapshot();
    assert_eq!(set.keys.len(), 2);
    assert_eq!(set.keys[1], Credential::new("b", 60));
}

#[test]
fn test_add_key_duplicate_rejected() {
    let (store, rotator) = rotator_with(&["a"]);
    rotator.select_key().unwrap();
    let before = store.snapshot();

    let result = rotator.add_key("a", 99);

    assert!(matches!(result, Err(KeyError::Duplicate(_))));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_add_key_empty_rejected() {
    let (store, rotator) = rotator_with(&[]);
    assert!(matches!(rotator.add_key("  ", 30), Err(KeyError::EmptyKey)));
    assert!(store.snapshot().keys.is_empty());
}

#[test]
fn test_remove_key_unknown_rejected() {
    let (store, rotator) = rotator_with(&["a", "b"]);
    let before = store.snapshot();

    assert!(matches!(
        rotator.remove_key("zzz"),
        Err(KeyError::NotFound(_))
    ));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_remove_key_removes_exactly_one() {
    let (store, rotator) = rotator_with(&["a", "b", "c"]);

    rotator.remove_key("b").unwrap();

    let keys: Vec<String> = store.snapshot().keys.into_iter().map(|c| c.key).collect();
    assert_eq!(keys, vec!["a", "c"]);
}

#[tokio::test]
async fn test_spawn_blocking_runs_operations() {
    let (store, rotator) = rotator_with(&["key-one-0123456789", "key-two-0123456789"]);
    let rotator = Arc::new(rotator);

    let first = rotator.spawn_blocking(KeyRotator::select_key).await.unwrap();
    assert_eq!(first, "key-one-0123456789");
    assert_eq!(usage(&store), vec![1, 0]);

    let result = rotator
        .spawn_blocking(|r| r.add_key("key-one-0123456789", 10))
        .await;
    assert!(matches!(result, Err(KeyError::Duplicate(_))));

    let listed = rotator
        .spawn_blocking(|r| Ok(r.list_keys()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_spawn_blocking_reports_panics() {
    let (_, rotator) = rotator_with(&["a"]);
    let rotator = Arc::new(rotator);

    let result: Result<(), KeyError> = rotator
        .spawn_blocking(|_| panic!("key store exploded"))
        .await;

    assert!(matches!(result, Err(KeyError::Task(_))));
}

// ============================================================================
// FileKeyStore
// ============================================================================

#[test]
fn test_file_store_bootstraps_from_default_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apiKeys").join("coinmarketcap.json");
    let store = FileKeyStore::new(&path, Some("default-secret-key".to_string()));

    let set = store.load();

    assert_eq!(set.keys, vec![Credential::new("default-secret-key", 30)]);
    assert!(path.exists());
}

#[test]
fn test_file_store_bootstraps_empty_without_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    let store = FileKeyStore::new(&path, Some(String::new()));

    assert!(store.load().keys.is_empty());
}

#[test]
fn test_file_store_persists_usage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    let store = Arc::new(FileKeyStore::new(&path, Some("k1".to_string())));
    let rotator = KeyRotator::new(store.clone());

    rotator.add_key("k2", 10).unwrap();
    rotator.select_key().unwrap();
    rotator.select_key().unwrap();
    rotator.select_key().unwrap();

    let reopened = FileKeyStore::new(&path, None).load();
    let counts: Vec<u64> = reopened.keys.iter().map(|c| c.used).collect();
    assert_eq!(counts, vec![2, 1]);
}

#[test]
fn test_file_store_uses_camel_case_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(
        &path,
        r#"{
  "keys": [{ "key": "abc", "rateLimit": 12, "used": 3 }],
  "lastRotation": "2024-05-01T00:00:00.000Z"
}"#,
    )
    .unwrap();

    let set = FileKeyStore::new(&path, None).load();
    assert_eq!(
        set.keys,
        vec![Credential {
            key: "abc".to_string(),
            rate_limit: 12,
            used: 3,
        }]
    );

    FileKeyStore::new(&path, None).save(&set).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"rateLimit\": 12"));
    assert!(written.contains("\"lastRotation\""));
}

#[test]
fn test_file_store_corrupt_file_fails_soft() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.json");
    std::fs::write(&path, "not json").unwrap();
    let store = Arc::new(FileKeyStore::new(&path, Some("ignored".to_string())));

    assert!(store.load().keys.is_empty());
    let rotator = KeyRotator::new(store);
    assert!(matches!(rotator.select_key(), Err(KeyError::NoCredentials)));
}
