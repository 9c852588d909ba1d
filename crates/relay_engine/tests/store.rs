use std::fs;

use pretty_assertions::assert_eq;
use relay_core::Range;
use relay_engine::{SnapshotStore, StoreError};
use tempfile::TempDir;

fn sample() -> Vec<Range> {
    vec![
        Range {
            range_name: "UK 4470 A".to_string(),
            range_id: "UK 4470 A".to_string(),
            count: 12,
            paid: 10,
            unpaid: 2,
            revenue: 0.35,
        },
        Range::with_count("IVORY COAST 21", 4),
    ]
}

#[test]
fn saved_snapshot_loads_back_equal() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("sms_statistics.json"));

    store.save(&sample()).expect("save");

    assert_eq!(store.load().expect("load"), sample());
}

#[test]
fn missing_file_is_an_empty_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("absent.json"));

    assert_eq!(store.load().expect("load"), Vec::<Range>::new());
}

#[test]
fn corrupt_file_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sms_statistics.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SnapshotStore::new(&path).load().unwrap_err();

    assert!(matches!(err, StoreError::Format { .. }), "{err}");
}

#[test]
fn save_replaces_previous_snapshot_without_leftovers() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("sms_statistics.json"));

    store.save(&sample()).expect("first save");
    store.save(&[Range::with_count("RangeA", 1)]).expect("second save");

    assert_eq!(store.load().unwrap(), vec![Range::with_count("RangeA", 1)]);
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("state/nested/sms_statistics.json"));

    store.save(&sample()).expect("save");

    assert!(store.path().exists());
}

#[test]
fn legacy_file_without_optional_fields_still_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sms_statistics.json");
    fs::write(&path, r#"[{"range_name":"RangeA","range_id":"RangeA","count":3}]"#).unwrap();

    let ranges = SnapshotStore::new(&path).load().expect("load");

    assert_eq!(ranges, vec![Range::with_count("RangeA", 3)]);
}
