use reqwest::StatusCode;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlueError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to read certificate material at {path:?}: {source}")]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PuppetDB query failed with status {status}. Body: {body}")]
    Query { status: StatusCode, body: String },
    #[error("Failed to create silence for target '{target}': status {status}. Body: {body}")]
    SilenceCreate {
        target: String,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to list silences: status {status}. Body: {body}")]
    SilenceList { status: StatusCode, body: String },
    #[error("Failed to delete silence {id}: status {status}. Body: {body}")]
    SilenceDelete {
        id: String,
        status: StatusCode,
        body: String,
    },
    #[error("{operation} failed for {} item(s): {}", .failures.len(), FailureList(.failures))]
    SilenceBatch {
        operation: &'static str,
        /// IDs of the silences the batch did manage to create or delete.
        succeeded: Vec<String>,
        failures: Vec<BatchFailure>,
    },
    #[error("Malformed resource record {record}: missing '{field}'")]
    MalformedRecord { record: String, field: &'static str },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode scrape config: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// One failed item of a best-effort batch: the target or silence ID, and why it failed.
#[derive(Debug)]
pub struct BatchFailure {
    pub item: String,
    pub error: GlueError,
}

struct FailureList<'a>(&'a [BatchFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.item, failure.error)?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, GlueError>;
