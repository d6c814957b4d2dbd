pub mod alertmanager;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod puppetdb;
pub mod scrape_config;
pub mod version;

pub use error::{GlueError, Result};
