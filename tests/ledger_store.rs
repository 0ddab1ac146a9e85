use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use time::macros::datetime;
use voxpense::{Category, LedgerEntry, LedgerStore};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn scratch_ledger() -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "voxpense-ledger-{}-{}.csv",
        std::process::id(),
        n
    ))
}

fn entry_at(ts: time::PrimitiveDateTime, amount: f64, description: &str) -> LedgerEntry {
    LedgerEntry::new(ts, Category::Other, amount, description.to_string())
}

#[test]
fn creates_header_only_file_when_missing() {
    let path = scratch_ledger();
    let store = LedgerStore::new(path.clone());

    assert!(store.ensure_exists().expect("create"));
    assert!(!store.ensure_exists().expect("second call is a no-op"));

    let raw = fs::read_to_string(&path).expect("read file");
    assert_eq!(raw.lines().next(), Some("Date,Category,Amount,Description"));
    assert_eq!(raw.lines().count(), 1);
    assert!(store.load().expect("load empty").is_empty());
}

#[test]
fn append_is_monotonic_and_ordered() {
    let path = scratch_ledger();
    let store = LedgerStore::new(path.clone());

    let entries = [
        entry_at(datetime!(2024-03-07 18:00:01), 10.0, "10 Rs for Sabzi"),
        entry_at(datetime!(2024-03-07 18:00:02), 50.0, "50 for transport"),
        entry_at(datetime!(2024-03-07 18:00:03), 900.0, "900 rent share"),
    ];
    for entry in &entries {
        store.append(entry).expect("append");
    }

    let loaded = store.load().expect("load");
    assert_eq!(loaded.len(), entries.len());
    for (loaded, expected) in loaded.iter().zip(&entries) {
        assert_eq!(loaded.timestamp, expected.timestamp);
        assert_eq!(loaded.description, expected.description);
    }

    // N data rows plus the header, nothing else.
    let raw = fs::read_to_string(&path).expect("read file");
    assert_eq!(raw.lines().count(), entries.len() + 1);
}

#[test]
fn descriptions_with_commas_survive_the_rewrite() {
    let store = LedgerStore::new(scratch_ledger());
    let entry = entry_at(
        datetime!(2024-03-07 18:00:00),
        25.0,
        "25 for food, drinks, and a snack",
    );
    store.append(&entry).expect("append");

    let loaded = store.load().expect("load");
    assert_eq!(loaded[0].description, "25 for food, drinks, and a snack");
}

#[test]
fn recent_window_excludes_older_rows() {
    let store = LedgerStore::new(scratch_ledger());
    let now = datetime!(2024-03-07 18:10:00);

    store
        .append(&entry_at(datetime!(2024-03-07 18:00:00), 1.0, "old row"))
        .expect("append old");
    store
        .append(&entry_at(datetime!(2024-03-07 18:07:30), 2.0, "fresh row"))
        .expect("append fresh");

    let recent = store
        .recent_within(time::Duration::minutes(5), now)
        .expect("scan");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].description, "fresh row");
}

#[test]
fn recent_window_on_missing_file_is_empty() {
    let store = LedgerStore::new(scratch_ledger());
    let recent = store
        .recent_within(time::Duration::minutes(5), datetime!(2024-03-07 18:10:00))
        .expect("scan");
    assert!(recent.is_empty());
}
