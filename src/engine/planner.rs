// src/engine/planner.rs
//
// Per-zone mutation staging and application. Deletions are applied in
// strictly descending row order: deleting ascending would shift every row
// below the cut and invalidate the remaining staged row numbers.

use crate::config::{ARCHIVE_BATCH_ROWS, SURPLUS_THRESHOLD};
use crate::domain::normalize::money_to_integer;
use crate::domain::record::ArchivedSale;
use crate::engine::matcher::MatchedEvent;
use crate::mail::ChangeKind;
use crate::retry::with_backoff_soft;
use crate::sheets::store::{RowStore, ValueMode};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct MutationPlan {
    to_delete: BTreeSet<u32>,
    to_archive: Vec<ArchivedSale>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ApplyStats {
    pub archived: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_archive.is_empty()
    }

    pub fn deletions(&self) -> usize {
        self.to_delete.len()
    }

    pub fn archives(&self) -> usize {
        self.to_archive.len()
    }

    /// Stage a bare deletion (stale row, duplicate link).
    pub fn stage_deletion(&mut self, row: u32) {
        self.to_delete.insert(row);
    }

    /// Consume a matched change event. The source row is always deleted;
    /// a sold event additionally becomes an archived sale when both amounts
    /// parse and the surplus clears the threshold.
    pub fn stage_match(&mut self, matched: &MatchedEvent) {
        self.to_delete.insert(matched.row_number);

        if matched.event.kind != ChangeKind::SoldTo3rdParty {
            return;
        }
        let final_bid = match money_to_integer(&matched.event.final_bid) {
            Some(v) => v,
            None => return,
        };
        let opening_bid = match money_to_integer(&matched.record.opening_bid) {
            Some(v) => v,
            None => return,
        };
        let surplus = final_bid - opening_bid;
        if surplus < SURPLUS_THRESHOLD {
            return;
        }

        self.to_archive.push(ArchivedSale {
            link: matched.record.link.clone(),
            address: matched.record.address.clone(),
            state: matched.record.state.clone(),
            opening_bid: matched.record.opening_bid.clone(),
            est_market_value: matched.record.est_market_value.clone(),
            auction_start_date: matched.record.auction_start_date.clone(),
            final_bid: matched.event.final_bid.clone(),
            surplus,
        });
    }

    /// Row numbers in application order (descending).
    pub fn deletions_descending(&self) -> Vec<u32> {
        self.to_delete.iter().rev().copied().collect()
    }

    /// Apply the plan: archive insertions first (they target a different
    /// table, so they must not wait behind deletions), then deletions in
    /// descending row order. Individual failures are soft.
    pub fn apply(&self, listings: &dyn RowStore, sales: &dyn RowStore) -> ApplyStats {
        let mut stats = ApplyStats::default();

        for batch in self.to_archive.chunks(ARCHIVE_BATCH_ROWS) {
            let rows: Vec<Vec<String>> = batch.iter().map(|s| s.to_row()).collect();
            match with_backoff_soft("archive append", || {
                sales.append_rows(&rows, ValueMode::UserEntered)
            }) {
                Some(()) => stats.archived += batch.len(),
                None => stats.failed += batch.len(),
            }
        }

        for row in self.deletions_descending() {
            match with_backoff_soft("row delete", || listings.delete_row(row)) {
                Some(()) => stats.deleted += 1,
                None => stats.failed += 1,
            }
        }

        stats
    }
}
