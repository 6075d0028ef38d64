// src/engine/matcher.rs
//
// Cross-source matching: mail-derived change events against sheet rows.
// Matching is chunk-scoped; a matched row is consumed immediately so it can
// never satisfy two events in the same pass.

use crate::domain::normalize::normalize_address;
use crate::domain::record::{AuctionRecord, ColumnMap};
use crate::mail::ChangeEvent;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ChunkRow {
    pub record: AuctionRecord,
    pub raw_address: String,
    pub norm_address: String,
}

/// A change event consumed into a concrete sheet row.
#[derive(Debug, Clone)]
pub struct MatchedEvent {
    pub row_number: u32,
    pub record: AuctionRecord,
    pub event: ChangeEvent,
}

/// Index one chunk of sheet rows by row number, with addresses normalized
/// once up front.
pub fn build_chunk_index(
    start_row: u32,
    rows: &[Vec<String>],
    columns: &ColumnMap,
) -> BTreeMap<u32, ChunkRow> {
    let mut index = BTreeMap::new();
    for (offset, row) in rows.iter().enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let record = AuctionRecord::from_row(columns, row);
        let raw_address = record.address.clone();
        let norm_address = normalize_address(&raw_address);
        index.insert(
            start_row + offset as u32,
            ChunkRow {
                record,
                raw_address,
                norm_address,
            },
        );
    }
    index
}

/// Match pending events against one chunk. Events that match are drained
/// from `pending` and returned; the matched rows are removed from the chunk
/// index (at-most-one consumption per row per pass). Events left in
/// `pending` may still match a later chunk.
pub fn match_events_in_chunk(
    index: &mut BTreeMap<u32, ChunkRow>,
    pending: &mut Vec<ChangeEvent>,
) -> Vec<MatchedEvent> {
    let mut matched = Vec::new();

    pending.retain(|event| {
        let needle = normalize_address(&event.address);
        if needle.is_empty() {
            // nothing to match on; drop silently at end of pass
            return true;
        }

        // First row whose normalized address contains the event's, with the
        // raw state code present as a cross-state guard.
        let hit = index.iter().find_map(|(row_number, row)| {
            let contains = row.norm_address.contains(&needle);
            let state_ok = event.state.is_empty() || row.raw_address.contains(&event.state);
            (contains && state_ok).then_some(*row_number)
        });

        match hit {
            Some(row_number) => {
                let row = index.remove(&row_number).expect("row just found");
                matched.push(MatchedEvent {
                    row_number,
                    record: row.record,
                    event: event.clone(),
                });
                false // consumed
            }
            None => true, // keep for the next chunk
        }
    });

    matched
}
