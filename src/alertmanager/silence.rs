use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{error, info, warn};

use super::window::{end_timestamp, format_timestamp};
use crate::config::AlertmanagerConfig;
use crate::error::{BatchFailure, GlueError, Result};
use crate::http::{build_client, failure_parts};

const ACTIVE_STATE: &str = "active";
const ALIAS_LABEL: &str = "alias";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Matcher {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_regex: bool,
}

/// Body of `POST /api/v2/silences`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostableSilence {
    pub matchers: Vec<Matcher>,
    pub starts_at: String,
    pub ends_at: String,
    pub comment: String,
    pub created_by: String,
}

impl PostableSilence {
    pub fn for_target(
        target: &str,
        created_by: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            matchers: vec![Matcher {
                name: ALIAS_LABEL.to_string(),
                value: target.to_string(),
                is_regex: false,
            }],
            starts_at: format_timestamp(starts_at),
            ends_at: format_timestamp(ends_at),
            comment: format!("Silencing alerts on {target} for {created_by}"),
            created_by: created_by.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct PostSilenceResponse {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SilenceStatus {
    pub state: String,
}

/// One entry of `GET /api/v2/silences`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GettableSilence {
    pub id: String,
    pub status: SilenceStatus,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
}

impl GettableSilence {
    fn is_active(&self) -> bool {
        self.status.state == ACTIVE_STATE
    }

    /// Silences created here carry exactly one `alias` matcher.
    fn silenced_alias(&self) -> Option<&str> {
        match self.matchers.as_slice() {
            [m] if m.name == ALIAS_LABEL && !m.is_regex => Some(m.value.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Silence alerts for the targets.
    Disable,
    /// Lift the silences this tool created.
    Enable,
}

impl FromStr for Action {
    type Err = GlueError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "disable" => Ok(Action::Disable),
            "enable" => Ok(Action::Enable),
            other => Err(GlueError::Configuration(format!(
                "Unknown action '{other}', expected 'disable' or 'enable'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SilenceRequest {
    pub action: Action,
    pub targets: Vec<String>,
    pub duration: Option<i64>,
    pub units: String,
    /// On `Enable`, only lift silences whose alias is one of `targets`.
    pub only_listed_targets: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilenceOutcome {
    Created(Vec<String>),
    Removed(Vec<String>),
}

/// Creates and removes Alertmanager silences owned by one `createdBy` marker.
pub struct SilenceManager {
    client: Client,
    base_url: String,
    created_by: String,
}

impl SilenceManager {
    pub fn new(config: &AlertmanagerConfig) -> Result<Self> {
        let client = build_client(config.request_timeout, None)?;
        Ok(Self::with_client(client, &config.base_url(), &config.created_by))
    }

    pub fn with_client(client: Client, base_url: &str, created_by: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            created_by: created_by.to_string(),
        }
    }

    pub async fn execute(&self, request: &SilenceRequest) -> Result<SilenceOutcome> {
        match request.action {
            Action::Disable => {
                if request.targets.is_empty() {
                    return Err(GlueError::Configuration(
                        "At least one target is required to disable alerts".to_string(),
                    ));
                }
                let duration = request.duration.ok_or_else(|| {
                    GlueError::Configuration("SILENCE_DURATION is required to disable alerts".to_string())
                })?;
                if duration <= 0 {
                    return Err(GlueError::Configuration(format!(
                        "Silence duration must be positive, got {duration}"
                    )));
                }
                let ids = self.create_silences(&request.targets, duration, &request.units).await?;
                Ok(SilenceOutcome::Created(ids))
            }
            Action::Enable => {
                let only = request.only_listed_targets.then_some(request.targets.as_slice());
                let ids = self.remove_silences(only).await?;
                Ok(SilenceOutcome::Removed(ids))
            }
        }
    }

    /// Silences one target from now until `duration` `units` from now.
    pub async fn create_silence(&self, target: &str, duration: i64, units: &str) -> Result<String> {
        let starts_at = Utc::now();
        let ends_at = end_timestamp(starts_at, duration, units)?;
        let payload = PostableSilence::for_target(target, &self.created_by, starts_at, ends_at);

        let response = self
            .client
            .post(format!("{}/api/v2/silences", self.base_url))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(GlueError::SilenceCreate {
                target: target.to_string(),
                status,
                body,
            });
        }

        let bytes = response.bytes().await?;
        let created: PostSilenceResponse =
            serde_json::from_slice(&bytes).map_err(|e| GlueError::Decode {
                context: "silence creation response",
                source: e,
            })?;
        info!(target = %target, silence_id = %created.silence_id, ends_at = %payload.ends_at, "Created silence.");
        Ok(created.silence_id)
    }

    /// Creates one silence per target, in order, without deduplicating.
    ///
    /// Every target is attempted. Silences that were created stay in place when
    /// others fail; the returned error then lists both.
    pub async fn create_silences(
        &self,
        targets: &[String],
        duration: i64,
        units: &str,
    ) -> Result<Vec<String>> {
        let mut created = Vec::with_capacity(targets.len());
        let mut failures = Vec::new();

        for target in targets {
            match self.create_silence(target, duration, units).await {
                Ok(id) => created.push(id),
                Err(e) => {
                    error!(target = %target, error = %e, "Failed to create silence.");
                    failures.push(BatchFailure {
                        item: target.clone(),
                        error: e,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            Err(GlueError::SilenceBatch {
                operation: "Silence creation",
                succeeded: created,
                failures,
            })
        }
    }

    pub async fn list_silences(&self) -> Result<Vec<GettableSilence>> {
        let response = self
            .client
            .get(format!("{}/api/v2/silences", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(GlueError::SilenceList { status, body });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GlueError::Decode {
            context: "silence list",
            source: e,
        })
    }

    pub async fn delete_silence(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/api/v2/silence/{id}", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(GlueError::SilenceDelete {
                id: id.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    /// Deletes every active silence carrying our `createdBy` marker, optionally
    /// only those whose alias is in `only_targets`. Returns the deleted IDs.
    ///
    /// Deletion is attempted for every eligible silence before failures are reported.
    pub async fn remove_silences(&self, only_targets: Option<&[String]>) -> Result<Vec<String>> {
        let silences = self.list_silences().await?;

        let eligible: Vec<&GettableSilence> = silences
            .iter()
            .filter(|s| s.is_active() && s.created_by == self.created_by)
            .filter(|s| match only_targets {
                Some(targets) => s
                    .silenced_alias()
                    .is_some_and(|alias| targets.iter().any(|t| t == alias)),
                None => true,
            })
            .collect();
        info!(total = silences.len(), eligible = eligible.len(), "Listed silences.");

        let mut removed = Vec::with_capacity(eligible.len());
        let mut failures = Vec::new();
        for silence in eligible {
            match self.delete_silence(&silence.id).await {
                Ok(()) => {
                    info!(silence_id = %silence.id, "Removed silence.");
                    removed.push(silence.id.clone());
                }
                Err(e) => {
                    warn!(silence_id = %silence.id, error = %e, "Failed to remove silence.");
                    failures.push(BatchFailure {
                        item: silence.id.clone(),
                        error: e,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(removed)
        } else {
            Err(GlueError::SilenceBatch {
                operation: "Silence removal",
                succeeded: removed,
                failures,
            })
        }
    }
}
