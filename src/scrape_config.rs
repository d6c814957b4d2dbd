//! Turns exported scrape-job resources into Prometheus file-based service
//! discovery target groups.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GlueError, Result};

/// One exported resource as returned by a PuppetDB `resources` query.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ResourceRecord {
    #[serde(default)]
    pub certname: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub parameters: ResourceParameters,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ResourceParameters {
    pub targets: Option<Vec<String>>,
    pub job_name: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
}

impl ResourceRecord {
    fn describe(&self, index: usize) -> String {
        format!(
            "#{index} ({} on {})",
            self.title.as_deref().unwrap_or("untitled"),
            self.certname.as_deref().unwrap_or("unknown node"),
        )
    }
}

/// A target group of the file_sd format. `labels` is a sorted map, which makes
/// it usable directly as an order-independent grouping key.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScrapeGroup {
    pub labels: BTreeMap<String, String>,
    pub targets: Vec<String>,
}

/// Groups records by their label set (their labels plus `job`) and
/// concatenates the targets of each group in input order.
///
/// Groups come out in the order their label set was first seen. Duplicate
/// targets are kept. A group that ends up with no targets at all is dropped,
/// since Prometheus has nothing to scrape for it.
pub fn aggregate(records: Vec<ResourceRecord>) -> Result<Vec<ScrapeGroup>> {
    let mut groups: Vec<ScrapeGroup> = Vec::new();
    let mut index_by_labels: HashMap<BTreeMap<String, String>, usize> = HashMap::new();

    for (index, record) in records.into_iter().enumerate() {
        let describe = || record.describe(index);
        let job_name = record.parameters.job_name.clone().ok_or_else(|| GlueError::MalformedRecord {
            record: describe(),
            field: "job_name",
        })?;
        let targets = record.parameters.targets.clone().ok_or_else(|| GlueError::MalformedRecord {
            record: describe(),
            field: "targets",
        })?;

        let mut labels = record.parameters.labels.clone().unwrap_or_default();
        labels.insert("job".to_string(), job_name);

        match index_by_labels.get(&labels) {
            Some(&existing) => groups[existing].targets.extend(targets),
            None => {
                index_by_labels.insert(labels.clone(), groups.len());
                groups.push(ScrapeGroup { labels, targets });
            }
        }
    }

    groups.retain(|group| {
        if group.targets.is_empty() {
            debug!(labels = ?group.labels, "Dropping scrape group without targets.");
        }
        !group.targets.is_empty()
    });

    info!(groups = groups.len(), "Aggregated scrape groups.");
    Ok(groups)
}

/// Pretty-prints the groups with sorted keys and four-space indentation.
pub fn render(groups: &[ScrapeGroup]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    groups.serialize(&mut serializer).map_err(GlueError::Encode)?;
    buf.push(b'\n');
    // serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Replaces `path` with `document` via a temp file in the same directory, so a
/// file_sd watcher never reads a half-written file.
pub fn write_atomically(path: &Path, document: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(document.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| GlueError::Output(e.error))?;
    info!(path = ?path, "Wrote scrape config.");
    Ok(())
}
