use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use super::parser::parse_command;
use super::types::{Command, CommandReply, ToggleAction};
use crate::toggles::Toggles;
use crate::transport::discord::gateway::IncomingMessage;
use crate::transport::discord::types::{
    GuildRole, PERMISSION_ADMINISTRATOR, PERMISSION_MANAGE_GUILD,
};

/// One redirect notice per (channel, author) within this window.
pub const WRONG_CHANNEL_COOLDOWN: Duration = Duration::from_secs(30);

/// What the listener should do with an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ignore,
    /// A command posted outside the alert channel.
    Redirect,
    Execute(Command),
}

/// Decides where each message goes. Owns the wrong-channel cooldown table.
pub struct CommandRouter {
    channel_id: u64,
    cooldown: Duration,
    last_notice: HashMap<(u64, String), Instant>,
}

impl CommandRouter {
    pub fn new(channel_id: u64) -> Self {
        Self {
            channel_id,
            cooldown: WRONG_CHANNEL_COOLDOWN,
            last_notice: HashMap::new(),
        }
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn route(&mut self, message: &IncomingMessage, now: Instant) -> Route {
        if message.author_is_bot {
            return Route::Ignore;
        }
        let Some(command) = parse_command(&message.content) else {
            return Route::Ignore;
        };
        if message.channel_id == self.channel_id {
            return Route::Execute(command);
        }

        let key = (message.channel_id, message.author_id.clone());
        if let Some(last) = self.last_notice.get(&key)
            && now.duration_since(*last) < self.cooldown
        {
            return Route::Ignore;
        }
        self.last_notice.insert(key, now);
        Route::Redirect
    }
}

pub fn redirect_notice(channel_id: u64) -> String {
    format!("⚠️ Bot commands belong in <#{channel_id}>.")
}

pub fn refusal() -> CommandReply {
    CommandReply::new("⛔ You need the **Manage Server** permission to use this command.")
}

/// True when the author's roles, plus the guild's `@everyone` role (whose id
/// equals the guild id), grant `ADMINISTRATOR` or `MANAGE_GUILD`.
pub fn is_authorized(guild_id: &str, member_roles: &[String], roles: &[GuildRole]) -> bool {
    let granted = roles
        .iter()
        .filter(|role| role.id == guild_id || member_roles.contains(&role.id))
        .fold(0_u64, |bits, role| bits | role.permissions);
    granted & (PERMISSION_ADMINISTRATOR | PERMISSION_MANAGE_GUILD) != 0
}

pub fn handle_command(command: Command, toggles: &Toggles) -> CommandReply {
    match command {
        Command::Quiet(action) => handle_quiet(action, toggles),
        Command::Travel(action) => handle_travel(action, toggles),
    }
}

fn handle_quiet(action: ToggleAction, toggles: &Toggles) -> CommandReply {
    match action {
        ToggleAction::Status if toggles.is_quiet() => {
            CommandReply::new("🔕 Quiet mode is **ON**. Alerts post without @here.")
        }
        ToggleAction::Status => {
            CommandReply::new("🔔 Quiet mode is **OFF**. Alerts ping @here.")
        }
        ToggleAction::Set(quiet) => {
            toggles.set_quiet(quiet);
            tracing::info!(quiet, "quiet mode changed");
            if quiet {
                CommandReply::new("🔕 Quiet mode enabled.")
            } else {
                CommandReply::new("🔔 Quiet mode disabled.")
            }
        }
        ToggleAction::Usage => CommandReply::new("Usage: `!quiet [on|off|status]`"),
    }
}

fn handle_travel(action: ToggleAction, toggles: &Toggles) -> CommandReply {
    match action {
        ToggleAction::Status if toggles.is_travel_paused() => {
            CommandReply::new("⏸️ Enemy travel tracking is **PAUSED**.")
        }
        ToggleAction::Status => CommandReply::new("✈️ Enemy travel tracking is **ACTIVE**."),
        ToggleAction::Set(paused) => {
            toggles.set_travel_paused(paused);
            tracing::info!(paused, "travel tracking changed");
            if paused {
                CommandReply::new("⏸️ Enemy travel tracking paused.")
            } else {
                CommandReply::new("▶️ Enemy travel tracking resumed.")
            }
        }
        ToggleAction::Usage => CommandReply::new("Usage: `!travel [pause|resume|status]`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERTS: u64 = 500;

    fn message(channel_id: u64, author: &str, content: &str) -> IncomingMessage {
        IncomingMessage {
            message_id: "m1".into(),
            channel_id,
            guild_id: Some("42".into()),
            author_id: author.into(),
            author_is_bot: false,
            content: content.into(),
            member_roles: Vec::new(),
        }
    }

    fn role(id: &str, permissions: u64) -> GuildRole {
        GuildRole {
            id: id.into(),
            permissions,
        }
    }

    #[test]
    fn commands_in_alert_channel_execute() {
        let mut router = CommandRouter::new(ALERTS);
        assert_eq!(
            router.route(&message(ALERTS, "u1", "!quiet on"), Instant::now()),
            Route::Execute(Command::Quiet(ToggleAction::Set(true)))
        );
    }

    #[test]
    fn bots_and_chatter_are_ignored() {
        let mut router = CommandRouter::new(ALERTS);
        let mut from_bot = message(ALERTS, "bot", "!quiet on");
        from_bot.author_is_bot = true;
        assert_eq!(router.route(&from_bot, Instant::now()), Route::Ignore);
        assert_eq!(
            router.route(&message(ALERTS, "u1", "hello"), Instant::now()),
            Route::Ignore
        );
        assert_eq!(
            router.route(&message(9, "u1", "hello"), Instant::now()),
            Route::Ignore
        );
    }

    #[test]
    fn wrong_channel_notice_is_rate_limited_per_author() {
        let mut router = CommandRouter::new(ALERTS);
        let start = Instant::now();
        let elsewhere = message(9, "u1", "!travel");

        assert_eq!(router.route(&elsewhere, start), Route::Redirect);
        assert_eq!(
            router.route(&elsewhere, start + Duration::from_secs(10)),
            Route::Ignore
        );
        assert_eq!(
            router.route(&message(9, "u2", "!travel"), start + Duration::from_secs(10)),
            Route::Redirect
        );
        assert_eq!(
            router.route(&elsewhere, start + Duration::from_secs(31)),
            Route::Redirect
        );
    }

    #[test]
    fn authorization_uses_member_and_everyone_roles() {
        let roles = vec![role("42", 0), role("7", PERMISSION_MANAGE_GUILD), role("8", 0x400)];
        assert!(is_authorized("42", &["7".into()], &roles));
        assert!(!is_authorized("42", &["8".into()], &roles));
        assert!(!is_authorized("42", &[], &roles));

        let open_guild = vec![role("42", PERMISSION_ADMINISTRATOR)];
        assert!(is_authorized("42", &[], &open_guild));
    }

    #[test]
    fn quiet_commands_flip_toggle() {
        let toggles = Toggles::new();
        let reply = handle_command(Command::Quiet(ToggleAction::Set(true)), &toggles);
        assert!(toggles.is_quiet());
        assert!(reply.text.contains("enabled"));

        let status = handle_command(Command::Quiet(ToggleAction::Status), &toggles);
        assert!(status.text.contains("**ON**"));

        handle_command(Command::Quiet(ToggleAction::Set(false)), &toggles);
        assert!(!toggles.is_quiet());
    }

    #[test]
    fn travel_commands_flip_pause() {
        let toggles = Toggles::new();
        handle_command(Command::Travel(ToggleAction::Set(true)), &toggles);
        assert!(toggles.is_travel_paused());
        let status = handle_command(Command::Travel(ToggleAction::Status), &toggles);
        assert!(status.text.contains("PAUSED"));
        handle_command(Command::Travel(ToggleAction::Set(false)), &toggles);
        assert!(!toggles.is_travel_paused());
    }

    #[test]
    fn usage_leaves_toggles_alone() {
        let toggles = Toggles::new();
        let reply = handle_command(Command::Quiet(ToggleAction::Usage), &toggles);
        assert!(reply.text.starts_with("Usage:"));
        assert!(!toggles.is_quiet());
    }

    #[test]
    fn redirect_mentions_alert_channel() {
        assert!(redirect_notice(ALERTS).contains("<#500>"));
    }
}
