pub mod detail;
pub mod pool;
pub mod search;

pub use detail::{DetailScraper, ScrapeOutcome, SiteSession};
pub use pool::SessionPool;
pub use search::{LinkSource, SiteSearch};
