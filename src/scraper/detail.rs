// src/scraper/detail.rs
//
// Detail-page scraping collaborator. Given a listing link it returns the
// field mapping for the row, an empty result, or a block signal the session
// pool reacts to. HTML extraction is a pure function over the page text so
// it can be exercised without a live session.

use crate::domain::normalize::strip_weekday_prefix;
use crate::domain::record::AuctionRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::time::Duration;

pub enum ScrapeOutcome {
    Fields(Box<AuctionRecord>),
    Blocked,
    Empty,
}

pub trait DetailScraper {
    fn scrape_detail(
        &mut self,
        link: &str,
        state: &str,
        previous: Option<&AuctionRecord>,
    ) -> ScrapeOutcome;
}

/// Per-profile browser fingerprints; one session per detail account.
const PROFILE_AGENTS: &[(&str, &str)] = &[
    (
        "profile_4",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    ),
    (
        "profile_5",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    ),
    (
        "profile_6",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    ),
];

const DEFAULT_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

pub struct SiteSession {
    client: Client,
}

impl SiteSession {
    pub fn new(profile: &str) -> Option<Self> {
        let agent = PROFILE_AGENTS
            .iter()
            .find(|(name, _)| *name == profile)
            .map(|(_, ua)| *ua)
            .unwrap_or(DEFAULT_AGENT);
        let client = Client::builder()
            .user_agent(agent)
            .timeout(Duration::from_secs(60))
            .build()
            .ok()?;
        Some(Self { client })
    }
}

impl DetailScraper for SiteSession {
    fn scrape_detail(
        &mut self,
        link: &str,
        state: &str,
        previous: Option<&AuctionRecord>,
    ) -> ScrapeOutcome {
        let resp = match self.client.get(link).send() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("⚠️ Detail fetch failed for {link}: {e}");
                return ScrapeOutcome::Empty;
            }
        };
        if resp.status().as_u16() == 403 {
            return ScrapeOutcome::Blocked;
        }
        let html = match resp.text() {
            Ok(t) => t,
            Err(_) => return ScrapeOutcome::Empty,
        };
        parse_detail_page(&html, link, state, previous, chrono::Local::now().date_naive())
    }
}

const CAPTCHA_PHRASES: &[&str] = &[
    "why am i seeing this page",
    "i'm not a robot",
    "i am human",
    "additional security check is required",
    "additional security check required",
];

fn page_looks_blocked(doc: &Html, html: &str) -> bool {
    if let Ok(sel) = Selector::parse("title") {
        if let Some(title) = doc.select(&sel).next() {
            let t = title.text().collect::<String>().to_lowercase();
            if t.contains("captcha") || t.contains("i am human") || t.contains("i'm not a robot") {
                return true;
            }
        }
    }
    if let Ok(sel) =
        Selector::parse("iframe[src*='captcha'], .g-recaptcha, #challenge-running, #challenge-stage")
    {
        if doc.select(&sel).next().is_some() {
            return true;
        }
    }
    let lower = html.to_lowercase();
    CAPTCHA_PHRASES.iter().any(|p| lower.contains(p))
}

fn elm_text(doc: &Html, elm_id: &str) -> String {
    let css = format!("[data-elm-id='{elm_id}']");
    let sel = match Selector::parse(&css) {
        Ok(sel) => sel,
        Err(_) => return String::new(),
    };
    doc.select(&sel)
        .next()
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn first_line(s: &str) -> String {
    let s = s.replace('\r', "");
    let s = s.split('\n').next().unwrap_or("");
    s.split("Add to calendar").next().unwrap_or("").trim().to_string()
}

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})(?:\s+(\d{1,2}:\d{2}\s*[APap][Mm]))?$")
        .expect("date-time regex")
});

/// Split "Oct 27, 2025 7:00 AM" into ("Oct 27, 2025", "7:00 AM"); a missing
/// time leaves the second half empty. Retries once with the weekday removed.
fn parse_date_time_from_text(s: &str) -> (String, String) {
    let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = strip_weekday_prefix(&normalized);
    let caps = DATE_TIME_RE
        .captures(&normalized)
        .or_else(|| DATE_TIME_RE.captures(stripped));
    match caps {
        Some(c) => {
            let date = format!("{} {}, {}", &c[1], &c[2], &c[3]);
            let time = c
                .get(4)
                .map(|m| m.as_str().to_uppercase().split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            (date, time)
        }
        None => (String::new(), String::new()),
    }
}

fn keep_prev_if_blank(new_val: &str, prev_val: &str) -> String {
    let nv = new_val.trim();
    if nv.is_empty() {
        prev_val.trim().to_string()
    } else {
        nv.to_string()
    }
}

/// Extract and merge a detail page into a full row. Newly scraped values win;
/// blanks keep the previous observation so a flaky page never erases data.
pub fn parse_detail_page(
    html: &str,
    link: &str,
    state: &str,
    previous: Option<&AuctionRecord>,
    today: chrono::NaiveDate,
) -> ScrapeOutcome {
    let doc = Html::parse_document(html);

    if page_looks_blocked(&doc, html) {
        return ScrapeOutcome::Blocked;
    }
    // The status box is the anchor element of a rendered detail page.
    if elm_text(&doc, "auction-detail-box-status").is_empty()
        && elm_text(&doc, "property_header_address").is_empty()
    {
        return ScrapeOutcome::Empty;
    }

    let opening_bid = elm_text(&doc, "opening_bid_value");
    let address = elm_text(&doc, "property_header_address").replace(" ,", ",");
    let est_mv = elm_text(&doc, "arv_value");
    let date_raw = first_line(&elm_text(&doc, "date_value"));
    let mut auction_time = elm_text(&doc, "auction_start_time_value");
    let status_text = elm_text(&doc, "property_gallery_status_label");

    let mut auction_date = strip_weekday_prefix(&date_raw).to_string();

    // Fallback: derive both from the left side of the duration range,
    // "Oct 27, 2025 7:00 AM - Oct 29, 2025".
    if auction_date.is_empty() && auction_time.is_empty() {
        let range_text = elm_text(&doc, "auction_duration_date_range");
        if !range_text.is_empty() {
            let left = range_text.split(" - ").next().unwrap_or("").trim();
            let (d, t) = parse_date_time_from_text(left);
            if !d.is_empty() {
                auction_date = d;
            }
            if !t.is_empty() {
                auction_time = t;
            }
        }
    }

    let blank = AuctionRecord::default();
    let prev = previous.unwrap_or(&blank);

    let mut merged = AuctionRecord {
        link: link.to_string(),
        address: keep_prev_if_blank(&address, &prev.address),
        state: if state.trim().is_empty() {
            prev.state.clone()
        } else {
            state.trim().to_string()
        },
        opening_bid: keep_prev_if_blank(&opening_bid, &prev.opening_bid),
        est_market_value: keep_prev_if_blank(&est_mv, &prev.est_market_value),
        auction_start_date: keep_prev_if_blank(&auction_date, &prev.auction_start_date),
        auction_start_time: keep_prev_if_blank(&auction_time, &prev.auction_start_time),
        status: keep_prev_if_blank(&status_text, &prev.status),
        completed: None,
        added_date: today.format("%b %-d, %Y").to_string(),
    };
    merged.completed = Some(merged.compute_completed(today));

    ScrapeOutcome::Fields(Box::new(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 27).unwrap()
    }

    fn detail_html(opening: &str, emv: &str, date: &str) -> String {
        format!(
            r#"<html><head><title>Listing</title></head><body>
            <div data-elm-id="auction-detail-box-status">Live</div>
            <div data-elm-id="opening_bid_value">{opening}</div>
            <div data-elm-id="property_header_address">123 Main St, Austin, TX 78701</div>
            <div data-elm-id="arv_value">{emv}</div>
            <div data-elm-id="date_value">{date}</div>
            <div data-elm-id="auction_start_time_value">9:00 AM</div>
            <div data-elm-id="property_gallery_status_label">Coming Soon</div>
            </body></html>"#
        )
    }

    #[test]
    fn parses_a_rendered_detail_page() {
        let html = detail_html("$200,000", "$250,000", "Monday, Oct 27, 2025");
        let out = parse_detail_page(&html, "https://x/1", "TX", None, today());
        let rec = match out {
            ScrapeOutcome::Fields(r) => r,
            _ => panic!("expected fields"),
        };
        assert_eq!(rec.opening_bid, "$200,000");
        assert_eq!(rec.auction_start_date, "Oct 27, 2025");
        assert_eq!(rec.auction_start_time, "9:00 AM");
        assert_eq!(rec.state, "TX");
        assert_eq!(rec.completed, Some(true));
        assert_eq!(rec.added_date, "Oct 27, 2025");
    }

    #[test]
    fn blank_fields_keep_previous_observation() {
        let html = detail_html("", "", "");
        let prev = AuctionRecord {
            opening_bid: "$150,000".into(),
            est_market_value: "Not available".into(),
            auction_start_date: "Nov 2, 2025".into(),
            ..Default::default()
        };
        let out = parse_detail_page(&html, "https://x/1", "TX", Some(&prev), today());
        let rec = match out {
            ScrapeOutcome::Fields(r) => r,
            _ => panic!("expected fields"),
        };
        assert_eq!(rec.opening_bid, "$150,000");
        assert_eq!(rec.est_market_value, "Not available");
        assert_eq!(rec.auction_start_date, "Nov 2, 2025");
    }

    #[test]
    fn captcha_page_signals_blocked() {
        let html = r#"<html><head><title>Captcha check</title></head>
            <body>Why am I seeing this page</body></html>"#;
        assert!(matches!(
            parse_detail_page(html, "https://x/1", "TX", None, today()),
            ScrapeOutcome::Blocked
        ));
    }

    #[test]
    fn unrendered_page_is_empty() {
        let html = "<html><body><p>loading…</p></body></html>";
        assert!(matches!(
            parse_detail_page(html, "https://x/1", "TX", None, today()),
            ScrapeOutcome::Empty
        ));
    }

    #[test]
    fn duration_range_fallback_fills_date_and_time() {
        let html = r#"<html><body>
            <div data-elm-id="auction-detail-box-status">Live</div>
            <div data-elm-id="property_header_address">5 Pine Ct, Toledo, OH</div>
            <div data-elm-id="auction_duration_date_range">Oct 27, 2025 7:00 AM - Oct 29, 2025</div>
            </body></html>"#;
        let out = parse_detail_page(html, "https://x/2", "OH", None, today());
        let rec = match out {
            ScrapeOutcome::Fields(r) => r,
            _ => panic!("expected fields"),
        };
        assert_eq!(rec.auction_start_date, "Oct 27, 2025");
        assert_eq!(rec.auction_start_time, "7:00 AM");
    }

    #[test]
    fn date_time_split_handles_missing_time() {
        assert_eq!(
            parse_date_time_from_text("October 27, 2025"),
            ("October 27, 2025".to_string(), String::new())
        );
        assert_eq!(
            parse_date_time_from_text("Mon, Oct 27, 2025 10:30 pm"),
            ("Oct 27, 2025".to_string(), "10:30 PM".to_string())
        );
        assert_eq!(parse_date_time_from_text("tbd"), (String::new(), String::new()));
    }
}
