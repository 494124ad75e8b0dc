pub mod gateway;
pub mod http_client;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;

use self::gateway::{DiscordGateway, GatewayEvent, IncomingMessage};
use self::http_client::DiscordHttpClient;
use self::types::WATCH_INTENTS;
use crate::commands::handlers::{redirect_notice, refusal};
use crate::commands::{CommandReply, CommandRouter, Route, handle_command, is_authorized};
use crate::notify::{NotificationSink, OutgoingMessage};
use crate::toggles::Toggles;

/// Command messages and their replies are cleaned up after this long.
pub const COMMAND_CLEANUP: Duration = Duration::from_secs(5 * 60);
/// Wrong-channel notices are cleaned up after this long.
pub const REDIRECT_CLEANUP: Duration = Duration::from_secs(20);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Deletes a message later without holding up the caller. Failures (already
/// deleted, missing permission) are only logged.
pub fn schedule_delete(
    http: Arc<DiscordHttpClient>,
    channel_id: u64,
    message_id: String,
    after: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if let Err(error) = http.delete_message(channel_id, &message_id).await {
            tracing::debug!(channel_id, %message_id, "Discord: auto-delete failed: {error:#}");
        }
    });
}

/// Posts alerts into the configured channel.
pub struct DiscordSink {
    http: Arc<DiscordHttpClient>,
    channel_id: u64,
}

impl DiscordSink {
    pub fn new(http: Arc<DiscordHttpClient>, channel_id: u64) -> Self {
        Self { http, channel_id }
    }
}

impl NotificationSink for DiscordSink {
    fn send<'a>(
        &'a self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let message_id = self
                .http
                .send_message(self.channel_id, &message.content, message.allow_everyone)
                .await?;
            schedule_delete(
                Arc::clone(&self.http),
                self.channel_id,
                message_id,
                message.delete_after,
            );
            Ok(())
        })
    }
}

/// Turns gateway messages into toggle changes and replies.
pub struct CommandDesk {
    http: Arc<DiscordHttpClient>,
    toggles: Arc<Toggles>,
    router: CommandRouter,
}

impl CommandDesk {
    pub fn new(http: Arc<DiscordHttpClient>, toggles: Arc<Toggles>, channel_id: u64) -> Self {
        Self {
            http,
            toggles,
            router: CommandRouter::new(channel_id),
        }
    }

    pub async fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { user_id, .. } => {
                tracing::info!("Discord: connected as user {user_id}");
            }
            GatewayEvent::MessageCreate(message) => self.handle_message(&message).await,
        }
    }

    async fn handle_message(&mut self, message: &IncomingMessage) {
        match self.router.route(message, Instant::now()) {
            Route::Ignore => {}
            Route::Redirect => {
                let notice = redirect_notice(self.router.channel_id());
                self.post(message.channel_id, &notice, REDIRECT_CLEANUP)
                    .await;
            }
            Route::Execute(command) => {
                schedule_delete(
                    Arc::clone(&self.http),
                    message.channel_id,
                    message.message_id.clone(),
                    COMMAND_CLEANUP,
                );
                let reply = if self.authorize(message).await {
                    tracing::info!(author = %message.author_id, ?command, "command accepted");
                    handle_command(command, &self.toggles)
                } else {
                    tracing::info!(author = %message.author_id, ?command, "command refused");
                    refusal()
                };
                self.reply(message.channel_id, reply).await;
            }
        }
    }

    async fn authorize(&self, message: &IncomingMessage) -> bool {
        let Some(guild_id) = message.guild_id.as_deref() else {
            return false;
        };
        match self.http.get_guild_roles(guild_id).await {
            Ok(roles) => is_authorized(guild_id, &message.member_roles, &roles),
            Err(error) => {
                tracing::warn!("Discord: could not load guild roles: {error:#}");
                false
            }
        }
    }

    async fn reply(&self, channel_id: u64, reply: CommandReply) {
        self.post(channel_id, &reply.text, COMMAND_CLEANUP).await;
    }

    async fn post(&self, channel_id: u64, text: &str, cleanup: Duration) {
        match self.http.send_message(channel_id, text, false).await {
            Ok(message_id) => {
                schedule_delete(Arc::clone(&self.http), channel_id, message_id, cleanup);
            }
            Err(error) => tracing::warn!("Discord: failed to reply: {error:#}"),
        }
    }
}

/// Keeps a gateway session open and feeds its events to a [`CommandDesk`].
pub struct DiscordListener {
    http: Arc<DiscordHttpClient>,
    gateway: DiscordGateway,
    desk: CommandDesk,
}

impl DiscordListener {
    pub fn new(
        http: Arc<DiscordHttpClient>,
        bot_token: String,
        toggles: Arc<Toggles>,
        channel_id: u64,
    ) -> Self {
        Self {
            gateway: DiscordGateway::new(bot_token, WATCH_INTENTS),
            desk: CommandDesk::new(Arc::clone(&http), toggles, channel_id),
            http,
        }
    }

    /// Reconnects after clean session ends; returns on hard errors so the
    /// supervisor can back off.
    pub async fn run(self) -> Result<()> {
        let Self {
            http,
            mut gateway,
            mut desk,
        } = self;
        let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(100);

        loop {
            {
                let session = gateway.connect_and_listen(&http, &event_tx);
                tokio::pin!(session);
                loop {
                    tokio::select! {
                        result = &mut session => {
                            result?;
                            break;
                        }
                        Some(event) = event_rx.recv() => desk.handle_event(event).await,
                    }
                }
            }
            while let Ok(event) = event_rx.try_recv() {
                desk.handle_event(event).await;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Emitter, Notification};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ALERTS: u64 = 500;

    fn command(content: &str, roles: &[&str]) -> GatewayEvent {
        GatewayEvent::MessageCreate(IncomingMessage {
            message_id: "900".into(),
            channel_id: ALERTS,
            guild_id: Some("42".into()),
            author_id: "u1".into(),
            author_is_bot: false,
            content: content.into(),
            member_roles: roles.iter().map(|r| (*r).to_string()).collect(),
        })
    }

    fn http_client(server: &MockServer) -> Arc<DiscordHttpClient> {
        Arc::new(
            DiscordHttpClient::with_base_url(server.uri(), "tkn", Duration::from_secs(2)).unwrap(),
        )
    }

    async fn mount_roles(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/guilds/42/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "42", "permissions": "0" },
                { "id": "7", "permissions": "32" }
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sink_posts_with_mention_policy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/500/messages"))
            .and(body_partial_json(json!({
                "content": "quiet alert",
                "allowed_mentions": { "parse": [] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
            .expect(1)
            .mount(&server)
            .await;

        let http = http_client(&server);
        let sink = DiscordSink::new(http, ALERTS);
        sink.send(OutgoingMessage {
            content: "quiet alert".into(),
            allow_everyone: false,
            delete_after: Duration::from_secs(60),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn authorized_command_flips_toggle_and_replies() {
        let server = MockServer::start().await;
        mount_roles(&server).await;
        Mock::given(method("POST"))
            .and(path("/channels/500/messages"))
            .and(body_partial_json(json!({ "content": "🔕 Quiet mode enabled." })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "2" })))
            .expect(1)
            .mount(&server)
            .await;

        let http = http_client(&server);
        let toggles = Arc::new(Toggles::new());
        let mut desk = CommandDesk::new(http, Arc::clone(&toggles), ALERTS);

        desk.handle_event(command("!quiet on", &["7"])).await;
        assert!(toggles.is_quiet());
    }

    #[tokio::test]
    async fn unauthorized_command_is_refused() {
        let server = MockServer::start().await;
        mount_roles(&server).await;
        Mock::given(method("POST"))
            .and(path("/channels/500/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "3" })))
            .expect(1)
            .mount(&server)
            .await;

        let http = http_client(&server);
        let toggles = Arc::new(Toggles::new());
        let mut desk = CommandDesk::new(http, Arc::clone(&toggles), ALERTS);

        desk.handle_event(command("!travel pause", &[])).await;
        assert!(!toggles.is_travel_paused());

        let posts = server.received_requests().await.unwrap();
        let reply = posts
            .iter()
            .find(|r| r.method.as_str() == "POST")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert!(body["content"].as_str().unwrap().contains("Manage Server"));
    }

    #[tokio::test]
    async fn stalled_post_does_not_hold_up_the_emitter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/500/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "4" }))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let http = Arc::new(
            DiscordHttpClient::with_base_url(server.uri(), "tkn", Duration::from_millis(200))
                .unwrap(),
        );
        let sink: Arc<dyn NotificationSink> = Arc::new(DiscordSink::new(http, ALERTS));
        let emitter = Emitter::new(sink, Arc::new(Toggles::new()));

        let started = std::time::Instant::now();
        emitter
            .emit(Notification {
                text: "late alert".into(),
                lifetime: Duration::from_secs(60),
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
