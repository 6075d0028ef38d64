// src/pipeline.rs
//
// The three passes over a zone table: insert freshly collected listings,
// refresh existing rows, and reconcile mail-derived change events. Every
// remote failure inside a pass is soft; a pass reports counters instead of
// bailing out.

use crate::config::{MAX_UPDATE_CHUNKS, STACK_NEW_ROWS_AT_TOP};
use crate::domain::classify::{is_candidate_for_update, is_stale_for_deletion};
use crate::domain::record::{AuctionRecord, ColumnMap, LISTING_HEADER, SALES_HEADER};
use crate::domain::zone::Zone;
use crate::engine::matcher::{build_chunk_index, match_events_in_chunk};
use crate::engine::planner::MutationPlan;
use crate::mail::{extract_final_bid, parse_subject, ChangeEvent, ChangeKind, MessageSource};
use crate::retry::{with_backoff, with_backoff_soft};
use crate::scraper::{DetailScraper, ScrapeOutcome, SessionPool};
use crate::sheets::scan::scan_chunks;
use crate::sheets::store::{a1_range, ensure_header, RowStore, ValueMode};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, PartialEq)]
pub struct InsertStats {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
    pub captchas: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct UpdateStats {
    pub candidates: usize,
    pub updated: usize,
    pub failed: usize,
    pub captchas: usize,
    pub stale_deleted: usize,
    pub duplicates_deleted: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct MailStats {
    pub messages: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub unrouted: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct ReconcileStats {
    pub matched: usize,
    pub unmatched: usize,
    pub archived: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Scrape one link through the pool. A block evicts the session and retries
/// once with the next one; a second block gives up on this link.
fn scrape_with_pool<S: DetailScraper>(
    pool: &mut SessionPool<S>,
    link: &str,
    state: &str,
    previous: Option<&AuctionRecord>,
    captchas: &mut usize,
) -> Option<AuctionRecord> {
    for _ in 0..2 {
        if pool.is_empty() {
            pool.tick();
        }
        let idx = pool.pick()?;
        match pool.session_mut(idx).scrape_detail(link, state, previous) {
            ScrapeOutcome::Fields(record) => return Some(*record),
            ScrapeOutcome::Blocked => {
                *captchas += 1;
                eprintln!("🛑 {} blocked on {link}", pool.profile_name(idx));
                pool.evict(idx);
            }
            ScrapeOutcome::Empty => return None,
        }
    }
    None
}

fn existing_links(store: &dyn RowStore) -> HashSet<String> {
    let last = with_backoff_soft("row count", || store.row_count()).unwrap_or(0);
    if last <= 1 {
        return HashSet::new();
    }
    let range = format!("A2:A{last}");
    let rows = with_backoff_soft("link column read", || store.get_range(&range)).unwrap_or_default();
    rows.into_iter()
        .filter_map(|r| r.into_iter().next())
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Scrape each new link and insert the resulting row. New rows go in at row
/// 2 so the freshest listings sit at the top of the table; links already in
/// the table are skipped up front.
pub fn insert_new_records<S: DetailScraper>(
    store: &dyn RowStore,
    pool: &mut SessionPool<S>,
    state: &str,
    links: &[String],
) -> InsertStats {
    let mut stats = InsertStats::default();
    if let Err(e) = ensure_header(store, &LISTING_HEADER) {
        eprintln!("⚠️ Header check failed, skipping insert pass: {e}");
        return stats;
    }

    let known = existing_links(store);
    for link in links {
        if known.contains(link.trim()) {
            continue;
        }
        stats.attempted += 1;

        match scrape_with_pool(pool, link, state, None, &mut stats.captchas) {
            Some(record) => {
                let row = record.to_row();
                let wrote = if STACK_NEW_ROWS_AT_TOP {
                    with_backoff_soft("row insert", || {
                        store.insert_row(&row, 2, ValueMode::UserEntered)
                    })
                } else {
                    with_backoff_soft("row append", || {
                        store.append_rows(&[row.clone()], ValueMode::UserEntered)
                    })
                };
                match wrote {
                    Some(()) => stats.inserted += 1,
                    None => stats.failed += 1,
                }
            }
            None => stats.failed += 1,
        }
        pool.tick();
    }

    println!(
        "📥 {state}: {} new, {} failed, {} captcha(s) out of {} attempted",
        stats.inserted, stats.failed, stats.captchas, stats.attempted
    );
    stats
}

/// Refresh pass over an existing table: re-scrape candidate rows in place,
/// prune duplicate links (first occurrence wins) and rows whose auction is
/// long past. Deletions are staged during the scan and applied afterwards
/// in descending row order.
pub fn update_previous_records<S: DetailScraper>(
    store: &dyn RowStore,
    pool: &mut SessionPool<S>,
    today: NaiveDate,
) -> UpdateStats {
    let mut stats = UpdateStats::default();
    if let Err(e) = ensure_header(store, &LISTING_HEADER) {
        eprintln!("⚠️ Header check failed, skipping update pass: {e}");
        return stats;
    }
    let columns = observed_columns(store, &LISTING_HEADER);

    let mut seen_links: HashSet<String> = HashSet::new();
    let mut plan = MutationPlan::new();

    let scan = scan_chunks(
        store,
        LISTING_HEADER.len(),
        Some(MAX_UPDATE_CHUNKS),
        |start, rows| {
            for (offset, row) in rows.iter().enumerate() {
                if row.iter().all(|c| c.trim().is_empty()) {
                    continue;
                }
                let row_number = start + offset as u32;
                let record = AuctionRecord::from_row(&columns, row);

                if !record.link.is_empty() && !seen_links.insert(record.link.clone()) {
                    plan.stage_deletion(row_number);
                    stats.duplicates_deleted += 1;
                    continue;
                }
                if is_stale_for_deletion(&record, today) {
                    plan.stage_deletion(row_number);
                    stats.stale_deleted += 1;
                    continue;
                }
                if !is_candidate_for_update(&record, today) {
                    continue;
                }
                stats.candidates += 1;

                match scrape_with_pool(
                    pool,
                    &record.link,
                    &record.state,
                    Some(&record),
                    &mut stats.captchas,
                ) {
                    Some(mut updated) => {
                        // a refresh keeps the original insertion stamp
                        updated.added_date = record.added_date.clone();
                        updated.completed = Some(updated.compute_completed(today));
                        let range = a1_range(row_number, row_number, LISTING_HEADER.len());
                        match with_backoff_soft("row update", || {
                            store.update_range(&range, &[updated.to_row()])
                        }) {
                            Some(()) => stats.updated += 1,
                            None => stats.failed += 1,
                        }
                    }
                    None => stats.failed += 1,
                }
                pool.tick();
            }
        },
    );

    let applied = plan.apply(store, store);
    println!(
        "🔄 Update pass: {} chunk(s), {} candidate(s), {} updated, {} failed, {} stale + {} duplicate row(s) deleted",
        scan.chunks_scanned,
        stats.candidates,
        stats.updated,
        stats.failed + applied.failed,
        stats.stale_deleted,
        stats.duplicates_deleted,
    );
    stats.failed += applied.failed;
    stats
}

fn observed_columns(store: &dyn RowStore, header: &[&str]) -> ColumnMap {
    match with_backoff_soft("header map read", || store.get_range(&a1_range(1, 1, header.len()))) {
        Some(rows) => match rows.first() {
            Some(row) => ColumnMap::from_header(row),
            None => ColumnMap::listing_default(),
        },
        None => ColumnMap::listing_default(),
    }
}

/// Drain the unread mailbox into per-zone change events. Every message that
/// was successfully read gets marked read, parseable or not, so the next
/// pass never sees it again.
pub fn collect_change_events(
    source: &dyn MessageSource,
) -> (HashMap<Zone, Vec<ChangeEvent>>, MailStats) {
    let mut stats = MailStats::default();
    let mut by_zone: HashMap<Zone, Vec<ChangeEvent>> = HashMap::new();

    let ids = match with_backoff("unread list", || source.list_unread()) {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("⚠️ Could not list unread messages: {e}");
            return (by_zone, stats);
        }
    };
    stats.messages = ids.len();
    println!("📧 {} unread message(s)", ids.len());

    for id in &ids {
        // leave the message unread if we never managed to look at it
        let subject = match with_backoff_soft("subject fetch", || source.fetch_subject(id)) {
            Some(s) => s,
            None => continue,
        };

        let lower = subject.trim().to_lowercase();
        let relevant =
            lower.starts_with("transaction update:") || lower.starts_with("property removed:");
        let event = if relevant { parse_subject(&subject) } else { None };

        match event {
            Some(mut event) => {
                if event.kind == ChangeKind::SoldTo3rdParty {
                    if let Some(body) =
                        with_backoff_soft("body fetch", || source.fetch_body_text(id))
                    {
                        event.final_bid = extract_final_bid(&body);
                    }
                }
                let _ = with_backoff_soft("mark read", || source.mark_read(id));
                stats.parsed += 1;
                match event.zone() {
                    Some(zone) => by_zone.entry(zone).or_default().push(event),
                    None => stats.unrouted += 1,
                }
            }
            None => {
                let _ = with_backoff_soft("mark read", || source.mark_read(id));
                stats.skipped += 1;
            }
        }
    }

    (by_zone, stats)
}

/// Consume a zone's change events against its listing table: matched rows
/// are deleted, and qualifying sold events land in the archive table first.
pub fn reconcile_zone(
    listings: &dyn RowStore,
    sales: &dyn RowStore,
    mut events: Vec<ChangeEvent>,
) -> ReconcileStats {
    let mut stats = ReconcileStats::default();
    if events.is_empty() {
        return stats;
    }
    if let Err(e) = ensure_header(listings, &LISTING_HEADER) {
        eprintln!("⚠️ Listing header check failed, skipping reconcile: {e}");
        return stats;
    }
    if let Err(e) = ensure_header(sales, &SALES_HEADER) {
        eprintln!("⚠️ Archive header check failed, skipping reconcile: {e}");
        return stats;
    }
    let columns = observed_columns(listings, &LISTING_HEADER);

    let mut plan = MutationPlan::new();
    scan_chunks(listings, LISTING_HEADER.len(), None, |start, rows| {
        if events.is_empty() {
            return;
        }
        let mut index = build_chunk_index(start, rows, &columns);
        for matched in match_events_in_chunk(&mut index, &mut events) {
            plan.stage_match(&matched);
            stats.matched += 1;
        }
    });
    stats.unmatched = events.len();

    let applied = plan.apply(listings, sales);
    stats.archived = applied.archived;
    stats.deleted = applied.deleted;
    stats.failed = applied.failed;

    println!(
        "🧾 Reconcile: {} matched, {} unmatched, {} archived, {} deleted, {} failed",
        stats.matched, stats.unmatched, stats.archived, stats.deleted, stats.failed
    );
    stats
}
