// src/domain/record.rs
//
// The canonical row shapes for the two table schemas, plus the header-driven
// column mapping. Rows coming back from the store are loose `Vec<String>`s;
// everything downstream works against `AuctionRecord`.

use crate::domain::normalize::parse_auction_date;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

/// Fixed 10-column schema of a zone listing table (order matters).
pub const LISTING_HEADER: [&str; 10] = [
    "Link",
    "Address",
    "State",
    "Opening Bid",
    "Est. Market Value",
    "Auction Start Date",
    "Auction Start Time",
    "Status",
    "Completed",
    "Added Date",
];

/// Fixed 8-column schema of the archived-sale table.
pub const SALES_HEADER: [&str; 8] = [
    "Link",
    "Address",
    "State",
    "Opening Bid",
    "Est. Market Value",
    "Auction Start Date",
    "Final Bid",
    "Surplus Amount",
];

/// Column positions derived once from the observed header row. Beyond the
/// documented default order nothing is assumed positionally.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    index: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn from_header(header: &[String]) -> Self {
        let index = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self { index }
    }

    pub fn listing_default() -> Self {
        let index = LISTING_HEADER
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        Self { index }
    }

    fn get<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.index
            .get(column)
            .and_then(|i| row.get(*i))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// One listing row. Blank strings mean "not observed yet"; `link` is the
/// natural key within a zone table. The Completed cell is tri-state: an
/// explicit 1 or 0, or `None` for a blank/malformed cell — only an explicit
/// 0 marks a row as open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionRecord {
    pub link: String,
    pub address: String,
    pub state: String,
    pub opening_bid: String,
    pub est_market_value: String,
    pub auction_start_date: String,
    pub auction_start_time: String,
    pub status: String,
    pub completed: Option<bool>,
    pub added_date: String,
}

impl AuctionRecord {
    pub fn from_row(columns: &ColumnMap, row: &[String]) -> Self {
        AuctionRecord {
            link: columns.get(row, "Link").to_string(),
            address: columns.get(row, "Address").to_string(),
            state: columns.get(row, "State").to_string(),
            opening_bid: columns.get(row, "Opening Bid").to_string(),
            est_market_value: columns.get(row, "Est. Market Value").to_string(),
            auction_start_date: columns.get(row, "Auction Start Date").to_string(),
            auction_start_time: columns.get(row, "Auction Start Time").to_string(),
            status: columns.get(row, "Status").to_string(),
            completed: match columns.get(row, "Completed") {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            },
            added_date: columns.get(row, "Added Date").to_string(),
        }
    }

    /// Serialize in the documented column order ("Completed" stored as 1/0,
    /// an unobserved cell stays blank).
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.link.clone(),
            self.address.clone(),
            self.state.clone(),
            self.opening_bid.clone(),
            self.est_market_value.clone(),
            self.auction_start_date.clone(),
            self.auction_start_time.clone(),
            self.status.clone(),
            match self.completed {
                Some(true) => "1",
                Some(false) => "0",
                None => "",
            }
            .to_string(),
            self.added_date.clone(),
        ]
    }

    /// A row is completed when both bid fields carry real values, or when the
    /// auction started exactly yesterday — a hard close that wins regardless
    /// of the bid fields.
    pub fn compute_completed(&self, today: NaiveDate) -> bool {
        if let Some(auct) = parse_auction_date(&self.auction_start_date) {
            if auct == today - Duration::days(1) {
                return true;
            }
        }
        let ob = self.opening_bid.trim().to_ascii_lowercase();
        let ob_real = !ob.is_empty() && ob != "tbd";
        let emv_present = !self.est_market_value.trim().is_empty();
        ob_real && emv_present
    }
}

/// A sold listing promoted to the archive table. Only materialized when the
/// surplus clears the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedSale {
    pub link: String,
    pub address: String,
    pub state: String,
    pub opening_bid: String,
    pub est_market_value: String,
    pub auction_start_date: String,
    pub final_bid: String,
    pub surplus: i64,
}

impl ArchivedSale {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.link.clone(),
            self.address.clone(),
            self.state.clone(),
            self.opening_bid.clone(),
            self.est_market_value.clone(),
            self.auction_start_date.clone(),
            self.final_bid.clone(),
            self.surplus.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(opening: &str, emv: &str, auction: &str) -> AuctionRecord {
        AuctionRecord {
            link: "https://www.auction.com/details/1".into(),
            opening_bid: opening.into(),
            est_market_value: emv.into(),
            auction_start_date: auction.into(),
            ..Default::default()
        }
    }

    #[test]
    fn completed_when_both_bid_fields_real() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 27).unwrap();
        let r = record("$200,000", "$250,000", "Oct 27, 2025");
        assert!(r.compute_completed(today));
    }

    #[test]
    fn hard_close_overrides_blank_bids() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 27).unwrap();
        let r = record("", "", "Oct 26, 2025");
        assert!(r.compute_completed(today));
    }

    #[test]
    fn not_completed_when_blank_and_not_yesterday() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 27).unwrap();
        assert!(!record("", "", "Oct 27, 2025").compute_completed(today));
        assert!(!record("TBD", "$250,000", "").compute_completed(today));
    }

    #[test]
    fn column_map_survives_reordered_header() {
        let header: Vec<String> = vec!["Address".into(), "Link".into(), "Completed".into()];
        let columns = ColumnMap::from_header(&header);
        let row: Vec<String> = vec!["1 Elm St".into(), "https://x/1".into(), "1".into()];
        let rec = AuctionRecord::from_row(&columns, &row);
        assert_eq!(rec.link, "https://x/1");
        assert_eq!(rec.address, "1 Elm St");
        assert_eq!(rec.completed, Some(true));
        assert_eq!(rec.opening_bid, "");
    }

    #[test]
    fn completed_cell_keeps_its_three_states() {
        let columns = ColumnMap::listing_default();
        for (cell, expect) in [
            ("1", Some(true)),
            ("0", Some(false)),
            ("", None),
            ("maybe", None),
        ] {
            let mut row = vec![String::new(); LISTING_HEADER.len()];
            row[8] = cell.into();
            let rec = AuctionRecord::from_row(&columns, &row);
            assert_eq!(rec.completed, expect, "{cell:?}");
        }
        // a blank cell stays blank through a rewrite instead of becoming 0
        assert_eq!(AuctionRecord::default().to_row()[8], "");
    }

    #[test]
    fn row_round_trip_in_default_order() {
        let rec = AuctionRecord {
            link: "https://x/9".into(),
            address: "9 Oak Ave, Selma, AL 36701".into(),
            state: "AL".into(),
            opening_bid: "$50,000".into(),
            completed: Some(true),
            added_date: "Oct 1, 2025".into(),
            ..Default::default()
        };
        let row = rec.to_row();
        assert_eq!(row.len(), LISTING_HEADER.len());
        let back = AuctionRecord::from_row(&ColumnMap::listing_default(), &row);
        assert_eq!(back, rec);
    }
}
