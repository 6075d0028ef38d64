// src/sheets/scan.rs
//
// Chunked full-table scanning. The table is read in fixed windows so a
// 20k-row sheet never has to fit in one response, and a failed window read
// skips that window rather than aborting the pass.

use crate::config::{CHUNK_ROWS, EMPTY_TAIL_ROW};
use crate::retry::with_backoff_soft;
use crate::sheets::store::{a1_range, RowStore};

#[derive(Debug, Default, PartialEq)]
pub struct ScanStats {
    pub chunks_scanned: usize,
    pub rows_seen: usize,
    pub failed_windows: usize,
}

/// Visit the populated data rows (row 2 onward) chunk by chunk. `visit`
/// receives the first row number of the chunk and the raw row values; row
/// `start + i` holds `rows[i]`. At most `max_chunks` windows are read per
/// invocation; re-invoking later re-scans idempotently, so no cursor is kept.
pub fn scan_chunks<F>(
    store: &dyn RowStore,
    ncols: usize,
    max_chunks: Option<usize>,
    mut visit: F,
) -> ScanStats
where
    F: FnMut(u32, &[Vec<String>]),
{
    let mut stats = ScanStats::default();

    let last_row = match with_backoff_soft("row count", || store.row_count()) {
        Some(n) => n,
        None => return stats,
    };
    if last_row <= 1 {
        return stats;
    }

    let mut start: u32 = 2;
    while start <= last_row {
        if let Some(cap) = max_chunks {
            if stats.chunks_scanned >= cap {
                break;
            }
        }
        let end = std::cmp::min(start + CHUNK_ROWS - 1, last_row);
        let range = a1_range(start, end, ncols);

        match with_backoff_soft("chunk read", || store.get_range(&range)) {
            Some(rows) => {
                stats.chunks_scanned += 1;
                let populated = rows
                    .iter()
                    .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
                    .count();
                stats.rows_seen += populated;
                // A fully empty window deep in the sheet means we have run
                // off the end of the data into blank formatting rows.
                if populated == 0 && start > EMPTY_TAIL_ROW {
                    eprintln!("🏁 Empty window at row {start}, stopping scan.");
                    break;
                }
                visit(start, &rows);
            }
            None => {
                stats.chunks_scanned += 1;
                stats.failed_windows += 1;
            }
        }

        start = end + 1;
    }

    stats
}

/// Predicate form of the scan: yields `(row_number, row)` for each populated
/// row the predicate accepts.
pub fn scan_matching<P, F>(
    store: &dyn RowStore,
    ncols: usize,
    max_chunks: Option<usize>,
    mut predicate: P,
    mut visit: F,
) -> ScanStats
where
    P: FnMut(&[String]) -> bool,
    F: FnMut(u32, &[String]),
{
    scan_chunks(store, ncols, max_chunks, |start, rows| {
        for (offset, row) in rows.iter().enumerate() {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            if predicate(row) {
                visit(start + offset as u32, row);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RemoteError;
    use crate::sheets::store::ValueMode;
    use std::cell::RefCell;

    /// Windowed reads over a synthetic table: populated single-cell rows up
    /// to `populated_through`, optionally refusing one window outright.
    struct ScriptedStore {
        last_row: u32,
        populated_through: u32,
        refuse_window_at: Option<u32>,
        reads: RefCell<Vec<u32>>,
    }

    fn bounds(range: &str) -> (u32, u32) {
        let (left, right) = range.split_once(':').unwrap();
        (left[1..].parse().unwrap(), right[1..].parse().unwrap())
    }

    impl RowStore for ScriptedStore {
        fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, RemoteError> {
            let (start, end) = bounds(range);
            self.reads.borrow_mut().push(start);
            if self.refuse_window_at == Some(start) {
                return Err(RemoteError::fatal("window read refused"));
            }
            let mut rows = Vec::new();
            for _ in start..=end.min(self.populated_through) {
                rows.push(vec!["x".to_string()]);
            }
            Ok(rows)
        }

        fn update_range(&self, _: &str, _: &[Vec<String>]) -> Result<(), RemoteError> {
            unreachable!()
        }

        fn insert_row(&self, _: &[String], _: u32, _: ValueMode) -> Result<(), RemoteError> {
            unreachable!()
        }

        fn append_rows(&self, _: &[Vec<String>], _: ValueMode) -> Result<(), RemoteError> {
            unreachable!()
        }

        fn delete_row(&self, _: u32) -> Result<(), RemoteError> {
            unreachable!()
        }

        fn batch_get(&self, _: &[String]) -> Result<Vec<Vec<Vec<String>>>, RemoteError> {
            unreachable!()
        }

        fn row_count(&self) -> Result<u32, RemoteError> {
            Ok(self.last_row)
        }
    }

    #[test]
    fn failed_window_is_skipped_not_fatal() {
        let store = ScriptedStore {
            last_row: 1001,
            populated_through: 1001,
            refuse_window_at: Some(502),
            reads: RefCell::new(Vec::new()),
        };
        let mut seen = Vec::new();
        let stats = scan_chunks(&store, 10, None, |start, rows| {
            seen.push((start, rows.len()));
        });

        assert_eq!(stats.chunks_scanned, 2);
        assert_eq!(stats.failed_windows, 1);
        assert_eq!(stats.rows_seen, 500);
        // the healthy window is still visited; the refused one is skipped
        assert_eq!(seen, vec![(2, 500)]);
    }

    #[test]
    fn empty_window_past_safety_row_stops_the_scan() {
        let store = ScriptedStore {
            last_row: 20_000,
            populated_through: 700,
            refuse_window_at: None,
            reads: RefCell::new(Vec::new()),
        };
        let stats = scan_chunks(&store, 10, None, |_, _| {});

        // windows start at 2, 502, ..., 5002; the first all-empty window
        // past row 5000 ends the pass instead of walking to row 20000
        assert_eq!(stats.rows_seen, 699);
        assert_eq!(stats.chunks_scanned, 11);
        assert_eq!(*store.reads.borrow().last().unwrap(), 5002);
        assert_eq!(store.reads.borrow().len(), 11);
    }
}
