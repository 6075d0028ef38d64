mod client;
pub mod scan;
pub mod store;

pub use client::SheetsClient;
