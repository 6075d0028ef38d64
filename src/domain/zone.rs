// src/domain/zone.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

const WEST: &[&str] = &["CA", "AZ", "NV", "WA", "OR", "UT", "ID", "CO"];
const CENTRAL: &[&str] = &["TX", "OK", "LA", "MS", "OH", "MI", "MN"];
const EAST: &[&str] = &["FL", "GA", "NC", "VA", "TN", "AL"];

/// Geographic partition each listing table belongs to. The worksheet tab
/// name is the zone name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    West,
    Central,
    East,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::West, Zone::Central, Zone::East];

    /// Zone is fully determined by the state code; a state outside the
    /// partition table is unrouted.
    pub fn for_state(state: &str) -> Option<Zone> {
        let s = state.trim().to_ascii_uppercase();
        if WEST.contains(&s.as_str()) {
            Some(Zone::West)
        } else if CENTRAL.contains(&s.as_str()) {
            Some(Zone::Central)
        } else if EAST.contains(&s.as_str()) {
            Some(Zone::East)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Zone::West => "WEST",
            Zone::Central => "CENTRAL",
            Zone::East => "EAST",
        }
    }

    pub fn from_name(name: &str) -> Option<Zone> {
        match name.trim().to_ascii_uppercase().as_str() {
            "WEST" => Some(Zone::West),
            "CENTRAL" => Some(Zone::Central),
            "EAST" => Some(Zone::East),
            _ => None,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Standalone 2-letter state near comma/space boundaries, to avoid matching
// "LA" inside "LANE" or a street abbreviation mid-token.
static STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:,\s*|\s+)\b(AL|AK|AZ|AR|CA|CO|CT|DE|FL|GA|HI|IA|ID|IL|IN|KS|KY|LA|MA|MD|ME|MI|MN|MO|MS|MT|NC|ND|NE|NH|NJ|NM|NV|NY|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VA|VT|WA|WI|WV|WY)\b(?:\s*,|\s+|$)",
    )
    .expect("state regex")
});

/// Pull the 2-letter state code out of a free-text address, if present.
pub fn extract_state(address: &str) -> Option<String> {
    STATE_RE
        .captures(address)
        .map(|c| c[1].to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_table_routes_states() {
        assert_eq!(Zone::for_state("CA"), Some(Zone::West));
        assert_eq!(Zone::for_state("tx"), Some(Zone::Central));
        assert_eq!(Zone::for_state("AL"), Some(Zone::East));
        assert_eq!(Zone::for_state("NY"), None);
        assert_eq!(Zone::for_state(""), None);
    }

    #[test]
    fn state_extraction_respects_boundaries() {
        assert_eq!(
            extract_state("816 Bahia Lane, Bessemer, AL 35023"),
            Some("AL".to_string())
        );
        assert_eq!(
            extract_state("123 Main St, Austin, TX"),
            Some("TX".to_string())
        );
        // "LA" embedded in a word must not match
        assert_eq!(extract_state("99 LANEWAY"), None);
        assert_eq!(extract_state(""), None);
    }
}
