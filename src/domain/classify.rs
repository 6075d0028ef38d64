// src/domain/classify.rs
//
// Row-level business rules deciding what happens to an existing record this
// pass: refresh it, leave it alone, or stage it for deletion.

use crate::config::STALE_AFTER_DAYS;
use crate::domain::normalize::{parse_auction_date, parse_fixed_date};
use crate::domain::record::AuctionRecord;
use chrono::NaiveDate;

/// A record is eligible for a refresh scrape when its Completed cell is an
/// explicit 0 (a blank or malformed cell does not qualify), it was not added
/// today, and its auction date is blank (or unparseable, which counts as
/// blank) or within one day of today.
pub fn is_candidate_for_update(record: &AuctionRecord, today: NaiveDate) -> bool {
    if record.completed != Some(false) {
        return false;
    }

    // Rows stamped today were just inserted; skip them until tomorrow.
    // A malformed Added Date is treated as not-today.
    if let Some(added) = parse_fixed_date(&record.added_date) {
        if added == today {
            return false;
        }
    }

    let auct_raw = record.auction_start_date.trim();
    if auct_raw.is_empty() {
        return true;
    }
    match parse_auction_date(auct_raw) {
        None => true, // unparseable qualifies, same as blank
        Some(auct) => (auct - today).num_days().abs() <= 1,
    }
}

/// A record is stale once its auction date is 15 or more days in the past.
/// Kept deliberately separate from the ±1 day candidate window.
pub fn is_stale_for_deletion(record: &AuctionRecord, today: NaiveDate) -> bool {
    match parse_auction_date(&record.auction_start_date) {
        Some(auct) => (today - auct).num_days() >= STALE_AFTER_DAYS,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record() -> AuctionRecord {
        AuctionRecord {
            link: "https://www.auction.com/details/1".into(),
            completed: Some(false),
            added_date: "Oct 20, 2025".into(),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 27).unwrap()
    }

    #[test]
    fn added_today_is_excluded_yesterday_included() {
        let mut r = base_record();
        r.added_date = "Oct 27, 2025".into();
        assert!(!is_candidate_for_update(&r, today()));

        r.added_date = "Oct 26, 2025".into();
        assert!(is_candidate_for_update(&r, today()));
    }

    #[test]
    fn completed_rows_are_never_candidates() {
        let mut r = base_record();
        r.completed = Some(true);
        assert!(!is_candidate_for_update(&r, today()));
    }

    #[test]
    fn blank_completed_cell_is_not_a_candidate() {
        let mut r = base_record();
        r.completed = None;
        assert!(!is_candidate_for_update(&r, today()));
    }

    #[test]
    fn auction_date_window_is_plus_minus_one_day() {
        let mut r = base_record();
        for (date, expect) in [
            ("Oct 26, 2025", true),
            ("Oct 27, 2025", true),
            ("Oct 28, 2025", true),
            ("Oct 29, 2025", false),
            ("Oct 25, 2025", false),
        ] {
            r.auction_start_date = date.into();
            assert_eq!(is_candidate_for_update(&r, today()), expect, "{date}");
        }
    }

    #[test]
    fn blank_or_garbled_auction_date_qualifies() {
        let mut r = base_record();
        r.auction_start_date = "".into();
        assert!(is_candidate_for_update(&r, today()));
        r.auction_start_date = "sometime soon".into();
        assert!(is_candidate_for_update(&r, today()));
    }

    #[test]
    fn stale_cutoff_is_fifteen_days() {
        let mut r = base_record();
        r.auction_start_date = "Oct 12, 2025".into(); // exactly 15 days back
        assert!(is_stale_for_deletion(&r, today()));
        r.auction_start_date = "Oct 13, 2025".into(); // 14 days back
        assert!(!is_stale_for_deletion(&r, today()));
        r.auction_start_date = "".into();
        assert!(!is_stale_for_deletion(&r, today()));
    }
}
