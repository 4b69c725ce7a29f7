use super::saved_index::SavedDateIndex;
use super::store::RecordStore;
use chrono::NaiveDate;

/// Saved dates after `today` whose per-student statuses match today's
/// exactly. This is an equality heuristic: a future date intentionally set
/// to the same pattern as today is indistinguishable from a sticky copy.
pub fn find_auto_applied(
    today: NaiveDate,
    store: &RecordStore,
    saved: &SavedDateIndex,
) -> Vec<NaiveDate> {
    let today_day = store.get(today);
    saved
        .saved_after(today)
        .into_iter()
        .filter(|future| {
            let future_day = store.get(*future);
            future_day.len() == today_day.len()
                && today_day.iter().all(|(student_id, rec)| {
                    future_day
                        .get(student_id)
                        .map(|f| f.status == rec.status)
                        .unwrap_or(false)
                })
        })
        .collect()
}

/// Removes auto-applied future dates from the store and the index. The
/// caller persists the reduced store when anything was removed.
pub fn cleanup_auto_applied(
    today: NaiveDate,
    store: &mut RecordStore,
    saved: &mut SavedDateIndex,
) -> Vec<NaiveDate> {
    let removed = find_auto_applied(today, store, saved);
    for date in &removed {
        store.remove_date(*date);
        saved.unmark(*date);
    }
    removed
}
