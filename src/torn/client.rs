use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

use super::types::{AttackEvent, AttackPage, MemberSnapshot, RawAttack, RawMember};
use crate::error::FeedError;

const FEED: &str = "torn";

/// Source of the home faction's incoming attacks.
pub trait AttackFeed: Send + Sync {
    /// Attacks currently in the feed, in the feed's own order.
    fn fetch_attacks<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<AttackPage, FeedError>> + Send + 'a>>;
}

/// Source of an enemy faction's member statuses.
pub trait RosterFeed: Send + Sync {
    fn fetch_roster<'a>(
        &'a self,
        faction_id: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MemberSnapshot>, FeedError>> + Send + 'a>>;
}

pub struct TornClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TornClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build Torn HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get(&self, path: &str, selections: &str) -> Result<Value, FeedError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("selections", selections), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::Request {
                feed: FEED,
                // reqwest includes the URL, which includes the key.
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
            return Err(FeedError::Status {
                feed: FEED,
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await.map_err(|e| FeedError::Decode {
            feed: FEED,
            message: e.without_url().to_string(),
        })?;
        check_api_error(&payload)?;
        Ok(payload)
    }
}

/// Torn reports key and rate-limit problems as HTTP 200 with an `error` body.
fn check_api_error(payload: &Value) -> Result<(), FeedError> {
    let Some(error) = payload.get("error") else {
        return Ok(());
    };
    Err(FeedError::Api {
        feed: FEED,
        code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
        message: error
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    })
}

/// A keyed collection in payload order, split into decoded records and the
/// keys of records that did not decode. An empty collection may arrive as
/// `[]`.
struct Keyed<T> {
    records: Vec<(String, T)>,
    unreadable: Vec<String>,
}

fn keyed_records<T>(payload: &Value, field: &str) -> Result<Keyed<T>, FeedError>
where
    T: serde::de::DeserializeOwned,
{
    let mut keyed = Keyed {
        records: Vec::new(),
        unreadable: Vec::new(),
    };
    let records = match payload.get(field) {
        None | Some(Value::Null) => return Ok(keyed),
        Some(Value::Array(items)) if items.is_empty() => return Ok(keyed),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(FeedError::Decode {
                feed: FEED,
                message: format!("`{field}` is not an object: {other}"),
            });
        }
    };

    for (key, value) in records {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => keyed.records.push((key.clone(), record)),
            Err(error) => {
                tracing::debug!(%error, key = %key, field, "undecodable Torn record");
                keyed.unreadable.push(key.clone());
            }
        }
    }
    Ok(keyed)
}

pub(crate) fn parse_attacks(payload: &Value) -> Result<AttackPage, FeedError> {
    let keyed = keyed_records::<RawAttack>(payload, "attacks")?;
    Ok(AttackPage {
        attacks: keyed
            .records
            .into_iter()
            .map(|(id, raw)| AttackEvent::from_raw(id, raw))
            .collect(),
        unreadable: keyed.unreadable,
    })
}

pub(crate) fn parse_roster(payload: &Value) -> Result<Vec<MemberSnapshot>, FeedError> {
    let keyed = keyed_records::<RawMember>(payload, "members")?;
    for key in &keyed.unreadable {
        tracing::warn!(key = %key, "skipping malformed Torn member");
    }
    Ok(keyed
        .records
        .into_iter()
        .filter_map(|(key, raw)| match key.parse::<u64>() {
            Ok(id) => Some(MemberSnapshot::from_raw(id, raw)),
            Err(_) => {
                tracing::warn!(key = %key, "skipping Torn member with non-numeric id");
                None
            }
        })
        .collect())
}

impl AttackFeed for TornClient {
    fn fetch_attacks<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<AttackPage, FeedError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.get("/faction/", "attacks").await?;
            parse_attacks(&payload)
        })
    }
}

impl RosterFeed for TornClient {
    fn fetch_roster<'a>(
        &'a self,
        faction_id: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<MemberSnapshot>, FeedError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.get(&format!("/faction/{faction_id}"), "basic").await?;
            parse_roster(&payload)
        })
    }
}
