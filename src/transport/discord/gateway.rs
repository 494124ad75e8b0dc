use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::{self, Message};

use super::http_client::DiscordHttpClient;
use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};
use crate::error::TransportError;

const FALLBACK_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// A guild text message, reduced to what command routing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: String,
    pub channel_id: u64,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    /// Role ids of the author in this guild; empty for direct messages.
    pub member_roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready {
        session_id: String,
        resume_gateway_url: String,
        user_id: String,
    },
    MessageCreate(IncomingMessage),
}

/// Resume bookkeeping carried across reconnects.
#[derive(Debug, Default)]
struct SessionState {
    session_id: Option<String>,
    sequence: Option<i64>,
    resume_gateway_url: Option<String>,
}

struct Heartbeat {
    interval_ms: u64,
    acked: bool,
    deadline: Option<Instant>,
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    session: SessionState,
}

impl DiscordGateway {
    pub fn new(bot_token: String, intents: u64) -> Self {
        Self {
            bot_token,
            intents,
            session: SessionState::default(),
        }
    }

    /// Runs one websocket session. `Ok(())` means the session ended in a way
    /// that calls for a reconnect; the caller loops.
    pub async fn connect_and_listen(
        &mut self,
        http: &DiscordHttpClient,
        tx: &Sender<GatewayEvent>,
    ) -> Result<()> {
        let gateway_url = self.resolve_gateway_url(http).await?;
        let ws_url = build_gateway_ws_url(&gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let interval_ms = read_hello_heartbeat_interval(&mut read).await?;
        self.send_identify_or_resume(&mut write).await?;

        let mut ticker = interval(Duration::from_millis(interval_ms));
        let mut heartbeat = Heartbeat {
            interval_ms,
            acked: true,
            deadline: None,
        };

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.send_heartbeat(&mut write, &mut heartbeat).await? {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                }
                () = wait_until(heartbeat.deadline) => {
                    if !heartbeat.acked {
                        tracing::warn!("Discord gateway heartbeat ACK timeout; reconnecting");
                        return Ok(());
                    }
                    heartbeat.deadline = None;
                }
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };
                    let message = message.context("read Discord gateway message")?;
                    if !self.handle_message(message, tx, &mut write, &mut heartbeat).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn resolve_gateway_url(&self, http: &DiscordHttpClient) -> Result<String> {
        if let Some(url) = &self.session.resume_gateway_url
            && !url.is_empty()
        {
            return Ok(url.clone());
        }

        let gateway = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?;
        Ok(gateway
            .get("url")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(FALLBACK_GATEWAY_URL)
            .to_string())
    }

    async fn send_identify_or_resume<W>(&self, write: &mut W) -> Result<()>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let payload = if let Some(session_id) = &self.session.session_id {
            tracing::info!("Resuming Discord gateway session");
            json!({
                "op": GatewayOpcode::Resume as u8,
                "d": {
                    "token": self.bot_token,
                    "session_id": session_id,
                    "seq": self.session.sequence,
                }
            })
        } else {
            json!({
                "op": GatewayOpcode::Identify as u8,
                "d": {
                    "token": self.bot_token,
                    "intents": self.intents,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": "retalwatch",
                        "device": "retalwatch"
                    }
                }
            })
        };

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway identify/resume")
    }

    /// `Ok(false)` when the previous heartbeat was never acknowledged.
    async fn send_heartbeat<W>(&self, write: &mut W, heartbeat: &mut Heartbeat) -> Result<bool>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        if !heartbeat.acked {
            return Ok(false);
        }

        let payload = json!({
            "op": GatewayOpcode::Heartbeat as u8,
            "d": self.session.sequence,
        });
        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")?;

        heartbeat.acked = false;
        heartbeat.deadline = Some(Instant::now() + Duration::from_millis(heartbeat.interval_ms));
        Ok(true)
    }

    /// `Ok(false)` asks the caller to drop the connection and reconnect.
    async fn handle_message<W>(
        &mut self,
        message: Message,
        tx: &Sender<GatewayEvent>,
        write: &mut W,
        heartbeat: &mut Heartbeat,
    ) -> Result<bool>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let Some(raw) = websocket_message_to_text(message) else {
            return Ok(true);
        };
        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(serde_json::Value::as_i64) {
            self.session.sequence = Some(sequence);
        }

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match op {
            Some(GatewayOpcode::Heartbeat) => self.send_heartbeat(write, heartbeat).await,
            Some(GatewayOpcode::HeartbeatAck) => {
                heartbeat.acked = true;
                heartbeat.deadline = None;
                Ok(true)
            }
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                Ok(false)
            }
            Some(GatewayOpcode::InvalidSession) => {
                let resumable = payload
                    .get("d")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                self.invalidate_session(resumable).await;
                Ok(false)
            }
            Some(GatewayOpcode::Dispatch) => {
                self.dispatch(&payload, tx).await?;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn dispatch(&mut self, payload: &serde_json::Value, tx: &Sender<GatewayEvent>) -> Result<()> {
        let event_type = payload
            .get("t")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let Some(data) = payload.get("d") else {
            return Ok(());
        };
        let Some(event) = parse_dispatch_event(event_type, data) else {
            return Ok(());
        };

        if let GatewayEvent::Ready {
            session_id,
            resume_gateway_url,
            ..
        } = &event
        {
            self.session.session_id = Some(session_id.clone());
            self.session.resume_gateway_url = Some(resume_gateway_url.clone());
        }

        tx.send(event)
            .await
            .context("dispatch parsed Discord gateway event")
    }

    async fn invalidate_session(&mut self, resumable: bool) {
        self.session.sequence = None;
        self.session.session_id = None;

        if resumable {
            let wait_secs = invalid_session_backoff_secs();
            tracing::warn!(
                "Discord gateway invalid session (resume allowed), waiting {wait_secs}s before reconnect"
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        } else {
            tracing::warn!("Discord gateway invalid session (resume denied), identifying afresh");
            self.session.resume_gateway_url = None;
        }
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &serde_json::Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => parse_ready_event(d),
        "MESSAGE_CREATE" => parse_message_create_event(d).map(GatewayEvent::MessageCreate),
        "RESUMED" => {
            tracing::info!("Discord gateway session resumed");
            None
        }
        _ => None,
    }
}

fn parse_ready_event(d: &serde_json::Value) -> Option<GatewayEvent> {
    Some(GatewayEvent::Ready {
        session_id: d.get("session_id")?.as_str()?.to_string(),
        resume_gateway_url: d.get("resume_gateway_url")?.as_str()?.to_string(),
        user_id: d.get("user")?.get("id")?.as_str()?.to_string(),
    })
}

fn str_field(d: &serde_json::Value, key: &str) -> Option<String> {
    d.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

fn parse_message_create_event(d: &serde_json::Value) -> Option<IncomingMessage> {
    let author = d.get("author")?;
    let member_roles = d
        .get("member")
        .and_then(|member| member.get("roles"))
        .and_then(serde_json::Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(IncomingMessage {
        message_id: str_field(d, "id")?,
        channel_id: d.get("channel_id")?.as_str()?.parse().ok()?,
        guild_id: str_field(d, "guild_id"),
        author_id: str_field(author, "id")?,
        author_is_bot: author
            .get("bot")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
        content: str_field(d, "content").unwrap_or_default(),
        member_roles,
    })
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures_util::future::pending::<()>().await,
    }
}

async fn read_hello_heartbeat_interval<R>(read: &mut R) -> Result<u64>
where
    R: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.context("read Discord gateway hello payload")?;
        let Some(raw) = websocket_message_to_text(message) else {
            continue;
        };
        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello JSON")?;

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);
        if op == Some(GatewayOpcode::Hello) {
            return Ok(payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS));
        }
    }

    Err(TransportError::Gateway("closed before Hello".into()).into())
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn build_gateway_ws_url(base_url: &str) -> String {
    format!("{}/?v=10&encoding=json", base_url.trim_end_matches('/'))
}

/// Discord asks for a random 1-5 s pause before re-identifying.
fn invalid_session_backoff_secs() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or(0);
    1 + u64::from(nanos % 5)
}
