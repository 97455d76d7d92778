//! Collection store adapter: commits a captured creature into the
//! player's durable collection, forwarding the caller's credential.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DependencyError;

/// Creation payload for a collection entry. Field names follow the
/// collection collaborator's wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct CommitPayload {
    #[serde(rename = "pokemonID")]
    pub pokemon_id: u32,
    pub level: u8,
    pub nickname: Option<String>,
    #[serde(rename = "isShiny")]
    pub is_shiny: bool,
    pub experience: u32,
    pub gender: String,
    pub ability: Option<String>,
    #[serde(rename = "heldItem")]
    pub held_item: Option<String>,
}

/// Identifier of the created collection entry.
#[derive(Debug, Clone)]
pub struct CommittedInstance {
    pub id: String,
}

/// Commit call into the collection store. Failures leave encounter
/// state untouched; the engine does not retry.
#[async_trait]
pub trait CollectionClient: Send + Sync {
    async fn commit(
        &self,
        owner_id: &str,
        payload: CommitPayload,
        bearer: Option<&str>,
    ) -> Result<CommittedInstance, DependencyError>;
}

#[derive(Debug, Deserialize)]
struct WireCreated {
    id: serde_json::Value,
}

/// HTTP implementation against the collection collaborator.
pub struct HttpCollectionClient {
    base_url: String,
}

impl HttpCollectionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, owner_id: &str) -> String {
        format!(
            "{}/pokemon/user/{}",
            self.base_url.trim_end_matches('/'),
            owner_id
        )
    }
}

#[async_trait]
impl CollectionClient for HttpCollectionClient {
    async fn commit(
        &self,
        owner_id: &str,
        payload: CommitPayload,
        bearer: Option<&str>,
    ) -> Result<CommittedInstance, DependencyError> {
        let url = self.url_for(owner_id);
        let bearer = bearer.map(|b| b.to_string());

        let created = tokio::task::spawn_blocking(move || commit_blocking(&url, &payload, bearer))
            .await
            .map_err(|e| DependencyError::new(format!("task join error: {e}")))??;

        // Mongo-style backends return string ids, relational ones
        // return numbers; keep the caller-facing id as a string.
        let id = match created.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(CommittedInstance { id })
    }
}

fn commit_blocking(
    url: &str,
    payload: &CommitPayload,
    bearer: Option<String>,
) -> Result<WireCreated, DependencyError> {
    let agent = ureq::Agent::new_with_defaults();
    let mut request = agent.post(url).header("content-type", "application/json");
    if let Some(token) = &bearer {
        request = request.header("authorization", &format!("Bearer {token}"));
    }

    let response = request.send_json(payload).map_err(|e| match e {
        ureq::Error::StatusCode(code) => {
            DependencyError::with_status(code, format!("collection commit returned {code}"))
        }
        other => DependencyError::new(format!("collection commit failed: {other}")),
    })?;

    response
        .into_body()
        .read_json()
        .map_err(|e| DependencyError::new(format!("collection response not parseable: {e}")))
}
