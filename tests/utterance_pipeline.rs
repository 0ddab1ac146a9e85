//! End-to-end checks of the utterance path: parse, duplicate guard, ledger.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use time::macros::datetime;
use voxpense::dedup;
use voxpense::parse;
use voxpense::{Category, LedgerEntry, LedgerStore};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn scratch_ledger() -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "voxpense-pipeline-{}-{}.csv",
        std::process::id(),
        n
    ))
}

/// The logging path minus audio: parse the utterance, append when an amount
/// is present. Returns whether a row was written.
fn log_utterance(store: &LedgerStore, text: &str, ts: time::PrimitiveDateTime) -> bool {
    let Some(amount) = parse::extract_amount(text) else {
        return false;
    };
    let category = parse::extract_category(text);
    let entry = LedgerEntry::new(ts, category, amount, text.to_string());
    store.append(&entry).expect("append");
    true
}

#[test]
fn sabzi_utterance_lands_verbatim() {
    let store = LedgerStore::new(scratch_ledger());

    assert!(log_utterance(
        &store,
        "10 Rs for Sabzi",
        datetime!(2024-03-07 18:00:00)
    ));

    let rows = store.load().expect("load");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount, 10.0);
    assert_eq!(rows[0].category, Category::Vegetables);
    assert_eq!(rows[0].description, "10 Rs for Sabzi");
}

#[test]
fn utterance_without_numeral_is_skipped() {
    let store = LedgerStore::new(scratch_ledger());

    assert!(!log_utterance(
        &store,
        "no numbers here",
        datetime!(2024-03-07 18:00:00)
    ));

    store.ensure_exists().expect("create");
    assert!(store.load().expect("load").is_empty());
}

#[test]
fn repeated_utterance_is_flagged_inside_the_window() {
    let store = LedgerStore::new(scratch_ledger());
    let now = datetime!(2024-03-07 18:04:00);

    log_utterance(&store, "10 Rs for Sabzi", datetime!(2024-03-07 18:00:00));

    let recent = store
        .recent_within(time::Duration::minutes(5), now)
        .expect("scan");
    let found = dedup::find_duplicate("10 rs for sabzi!", &recent, 0.7).expect("flagged");
    assert!((found.score - 1.0).abs() < f32::EPSILON);
    assert_eq!(found.entry.description, "10 Rs for Sabzi");
}

#[test]
fn stale_rows_cannot_trigger_the_guard() {
    let store = LedgerStore::new(scratch_ledger());
    let now = datetime!(2024-03-07 18:10:00);

    // Same text, but logged ten minutes ago - outside the 5-minute window.
    log_utterance(&store, "10 Rs for Sabzi", datetime!(2024-03-07 18:00:00));

    let recent = store
        .recent_within(time::Duration::minutes(5), now)
        .expect("scan");
    assert!(dedup::find_duplicate("10 Rs for Sabzi", &recent, 0.7).is_none());
}

#[test]
fn unrelated_utterance_is_not_flagged() {
    let store = LedgerStore::new(scratch_ledger());
    let now = datetime!(2024-03-07 18:01:00);

    log_utterance(&store, "10 Rs for Sabzi", datetime!(2024-03-07 18:00:00));

    let recent = store
        .recent_within(time::Duration::minutes(5), now)
        .expect("scan");
    assert!(dedup::find_duplicate("640 electricity utilities bill", &recent, 0.7).is_none());
}
