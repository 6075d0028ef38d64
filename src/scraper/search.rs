// src/scraper/search.rs
//
// Per-state search crawl that yields candidate detail links. Pagination
// stops on the first empty page or after three consecutive fetch failures.

use crate::retry::{RemoteError, RemoteErrorKind};
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

const SEARCH_BASE: &str = "https://www.auction.com";
const MAX_SEARCH_PAGES: u32 = 25;
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

pub trait LinkSource {
    fn new_links(&mut self, state: &str) -> Result<Vec<String>, RemoteError>;
}

pub struct SiteSearch {
    client: Client,
}

impl SiteSearch {
    pub fn new() -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            )
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(RemoteError::from_reqwest)?;
        Ok(Self { client })
    }

    fn fetch_page(&self, state: &str, page: u32) -> Result<String, RemoteError> {
        let url = format!("{SEARCH_BASE}/residential/{state}/active_lt/resi_sort_v2_st/?page={page}");
        let resp = self.client.get(&url).send().map_err(RemoteError::from_reqwest)?;
        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().unwrap_or_default();
            return Err(RemoteError::from_status(status, &body));
        }
        resp.text().map_err(RemoteError::from_reqwest)
    }
}

/// Pull every `/details/` href off one search page, absolutized against the
/// site base. Order of first appearance is preserved.
pub fn extract_detail_links(html: &str, base: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let sel = match Selector::parse("a[href^='/details/']") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let base_url = match Url::parse(base) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(abs) = base_url.join(href) else {
            continue;
        };
        let link = abs.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

impl LinkSource for SiteSearch {
    fn new_links(&mut self, state: &str) -> Result<Vec<String>, RemoteError> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut failures = 0u32;

        for page in 1..=MAX_SEARCH_PAGES {
            let html = match self.fetch_page(state, page) {
                Ok(h) => {
                    failures = 0;
                    h
                }
                Err(e) if e.kind == RemoteErrorKind::Fatal => return Err(e),
                Err(e) => {
                    failures += 1;
                    eprintln!("⚠️ Search page {page} for {state} failed: {e}");
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        break;
                    }
                    continue;
                }
            };

            let page_links = extract_detail_links(&html, SEARCH_BASE);
            if page_links.is_empty() {
                break;
            }
            let mut added = 0;
            for link in page_links {
                if seen.insert(link.clone()) {
                    links.push(link);
                    added += 1;
                }
            }
            // a page of pure repeats means pagination wrapped around
            if added == 0 {
                break;
            }
        }

        println!("🔎 {state}: {} candidate link(s)", links.len());
        Ok(links)
    }
}
