// src/mail/subject.rs
//
// Subject-line and body grammars for the notification feed. The subject
// rules are an ordered cascade: each later pattern is a strictly more
// permissive superset of the one before it, so priority order is load
// bearing and must not be rearranged.

use crate::domain::zone::{extract_state, Zone};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Removed,
    SoldTo3rdParty,
}

/// One externally-fed change record, derived from a single message and
/// consumed into either a row deletion or an archived sale.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub address: String,
    pub state: String,
    /// Final sale amount with thousands separators kept, e.g. "$150,500".
    /// Empty for removals and for sold messages whose body had no amount.
    pub final_bid: String,
}

impl ChangeEvent {
    pub fn zone(&self) -> Option<Zone> {
        Zone::for_state(&self.state)
    }
}

static SUBJECT_RULES: Lazy<Vec<(Regex, ChangeKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^\s*Property\s+Removed:\s*(.*?)\s*has\s+been\s+removed").unwrap(),
            ChangeKind::Removed,
        ),
        (
            Regex::new(r"(?i)^\s*Transaction\s+Update:\s*(.*?)\s*-\s*Sold\s+To\s+3rd\s+Party")
                .unwrap(),
            ChangeKind::SoldTo3rdParty,
        ),
        // Catch-all Transaction Update (including "Sold To Beneficiary"):
        // treated as a removal, address still captured before any dash suffix.
        (
            Regex::new(r"(?i)^\s*Transaction\s+Update:\s*(.*?)(?:\s*-\s*.*)?\s*$").unwrap(),
            ChangeKind::Removed,
        ),
    ]
});

static FINAL_BID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)was\s+sold\s+at\s+auction\s+today\s+for\s*(?:USD|US\$)?\s*\$?\s*([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?)\.?",
    )
    .unwrap()
});

/// Parse a subject line into a change event. Unrecognized subjects yield
/// `None`; the caller still marks the message read so it is never reprocessed.
pub fn parse_subject(subject: &str) -> Option<ChangeEvent> {
    let s = subject.trim();
    for (pattern, kind) in SUBJECT_RULES.iter() {
        if let Some(caps) = pattern.captures(s) {
            let address = caps
                .get(1)
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default();
            if address.is_empty() {
                return None;
            }
            let state = extract_state(&address).unwrap_or_default();
            return Some(ChangeEvent {
                kind: *kind,
                address,
                state,
                final_bid: String::new(),
            });
        }
    }
    None
}

/// Extract the anchored final-bid phrase from a sold message body. Absence
/// of the phrase is not an error; the bid is simply unknown.
pub fn extract_final_bid(body: &str) -> String {
    FINAL_BID_RE
        .captures(body)
        .map(|caps| format!("${}", &caps[1]))
        .unwrap_or_default()
}
