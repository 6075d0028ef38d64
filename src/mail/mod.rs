mod gmail;
mod subject;

pub use gmail::{GmailSource, MessageSource};
pub use subject::{extract_final_bid, parse_subject, ChangeEvent, ChangeKind};
