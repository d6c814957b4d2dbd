//! Discovery of exported scrape jobs from PuppetDB.
pub mod client;
pub mod query;

pub use client::PuppetDbClient;
