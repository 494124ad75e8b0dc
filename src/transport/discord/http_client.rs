use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use reqwest::{Method, Response, StatusCode, header::HeaderMap};
use serde_json::json;
use tokio::{sync::Mutex, time::sleep};

use super::types::{API_BASE, GuildRole};
use crate::error::TransportError;

const MAX_RATE_LIMIT_RETRIES: u8 = 3;

/// Seconds since the epoch at which a route may be used again.
#[derive(Debug, Clone, Copy)]
struct RouteWindow {
    remaining: u32,
    reset_at: f64,
}

/// Minimal Discord REST client: post, delete, gateway lookup and guild roles.
/// Honors per-route and global rate limits and retries 429s a few times.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    routes: Mutex<HashMap<String, RouteWindow>>,
    global_reset_at: Mutex<Option<f64>>,
}

/// `allowed_mentions` body for a post. Only the `everyone` category (which
/// also covers `@here`) is ever enabled.
pub fn allowed_mentions(allow_everyone: bool) -> serde_json::Value {
    if allow_everyone {
        json!({ "parse": ["everyone"] })
    } else {
        json!({ "parse": [] })
    }
}

impl DiscordHttpClient {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(API_BASE, bot_token, timeout)
    }

    /// `timeout` bounds each HTTP exchange, rate-limit waits excluded.
    pub fn with_base_url(
        base_url: impl Into<String>,
        bot_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build Discord HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            routes: Mutex::new(HashMap::new()),
            global_reset_at: Mutex::new(None),
        })
    }

    /// Posts `content` and returns the new message id.
    pub async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
        allow_everyone: bool,
    ) -> Result<String> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        let body = json!({
            "content": content,
            "allowed_mentions": allowed_mentions(allow_everyone),
        });
        let response = self
            .request(Method::POST, &url, Some(body))
            .await
            .context("send Discord message")?;
        let created: serde_json::Value = response
            .json()
            .await
            .context("parse Discord send message response JSON")?;
        created
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TransportError::Send("response carried no message id".into()).into())
    }

    pub async fn delete_message(&self, channel_id: u64, message_id: &str) -> Result<()> {
        let url = format!(
            "{}/channels/{channel_id}/messages/{message_id}",
            self.base_url
        );
        let _response = self
            .request(Method::DELETE, &url, None)
            .await
            .context("delete Discord message")?;
        Ok(())
    }

    pub async fn get_gateway_bot(&self) -> Result<serde_json::Value> {
        let url = format!("{}/gateway/bot", self.base_url);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord gateway bot data")?;
        response
            .json()
            .await
            .context("parse Discord gateway bot JSON")
    }

    pub async fn get_guild_roles(&self, guild_id: &str) -> Result<Vec<GuildRole>> {
        let url = format!("{}/guilds/{guild_id}/roles", self.base_url);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord guild roles")?;
        response
            .json()
            .await
            .context("parse Discord guild roles JSON")
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let route = route_key(url);
        self.wait_for_window(&route).await;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let mut builder = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bot {}", self.bot_token));
            if let Some(payload) = &body {
                builder = builder.json(payload);
            }

            let response = builder
                .send()
                .await
                .with_context(|| format!("send Discord request {method} {route}"))?;

            self.record_window(&route, response.headers()).await;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    break;
                }
                let headers = response.headers();
                let retry_after = retry_after(headers).unwrap_or(Duration::from_secs(1));
                tracing::debug!(%route, ?retry_after, "Discord rate limited");
                self.back_off(&route, is_global_limit(headers), retry_after)
                    .await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
                anyhow::bail!("Discord request {method} {route} failed ({status}): {body_text}");
            }

            return Ok(response);
        }

        anyhow::bail!(
            "Discord request {method} {route} exceeded rate limit after {MAX_RATE_LIMIT_RETRIES} retries"
        )
    }

    async fn wait_for_window(&self, route: &str) {
        let now = unix_now();
        let global_wait = self
            .global_reset_at
            .lock()
            .await
            .and_then(|reset_at| (reset_at > now).then_some(reset_at - now));
        if let Some(secs) = global_wait {
            sleep(Duration::from_secs_f64(secs)).await;
        }

        let route_wait = self.routes.lock().await.get(route).and_then(|window| {
            (window.remaining == 0 && window.reset_at > now).then_some(window.reset_at - now)
        });
        if let Some(secs) = route_wait {
            sleep(Duration::from_secs_f64(secs)).await;
        }
    }

    async fn back_off(&self, route: &str, global: bool, retry_after: Duration) {
        let reset_at = unix_now() + retry_after.as_secs_f64();
        if global {
            *self.global_reset_at.lock().await = Some(reset_at);
        } else {
            self.routes.lock().await.insert(
                route.to_string(),
                RouteWindow {
                    remaining: 0,
                    reset_at,
                },
            );
        }
        sleep(retry_after).await;
    }

    async fn record_window(&self, route: &str, headers: &HeaderMap) {
        let remaining = header_value::<u32>(headers, "X-RateLimit-Remaining");
        let reset_at = header_value::<f64>(headers, "X-RateLimit-Reset");
        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            self.routes.lock().await.insert(
                route.to_string(),
                RouteWindow {
                    remaining,
                    reset_at,
                },
            );
        }
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<T>().ok())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let seconds = header_value::<f64>(headers, "Retry-After")?;
    Some(Duration::from_secs_f64(seconds.max(0.0)))
}

fn is_global_limit(headers: &HeaderMap) -> bool {
    headers
        .get("X-RateLimit-Global")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Rate-limit key: the URL path after the API version with numeric
/// snowflakes collapsed, e.g. `/channels/{id}/messages/{id}`.
fn route_key(url: &str) -> String {
    let path = reqwest::Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    let versioned = path.find("/v10").map_or(path.as_str(), |at| &path[at + 4..]);

    let segments = versioned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>();
    format!("/{}", segments.join("/"))
}
