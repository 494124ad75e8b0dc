//! Discord API constants and type definitions.

use serde::Deserialize;

/// Discord API base URL (v10).
pub const API_BASE: &str = "https://discord.com/api/v10";

/// Gateway intents bitmask.
///
/// GUILDS (1) | `GUILD_MESSAGES` (512) | `MESSAGE_CONTENT` (32768) = 33281
pub const WATCH_INTENTS: u64 = 33281;

/// Default heartbeat interval when server does not provide one (ms).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Permission bit: `ADMINISTRATOR`.
pub const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;
/// Permission bit: `MANAGE_GUILD`.
pub const PERMISSION_MANAGE_GUILD: u64 = 1 << 5;

/// Gateway opcodes this client sends or reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GatewayOpcode {
    /// An event was dispatched (server → client).
    Dispatch = 0,
    /// Fired periodically to keep the connection alive.
    Heartbeat = 1,
    /// Starts a new session during the initial handshake.
    Identify = 2,
    /// Resume a previous session that was disconnected.
    Resume = 6,
    /// Server is telling the client to reconnect.
    Reconnect = 7,
    /// The session has been invalidated.
    InvalidSession = 9,
    /// Sent immediately after connecting; contains heartbeat interval.
    Hello = 10,
    /// Acknowledges a received heartbeat.
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

/// A guild role as returned by `GET /guilds/{id}/roles`. Discord sends the
/// permission set as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuildRole {
    pub id: String,
    #[serde(deserialize_with = "permissions_from_string")]
    pub permissions: u64,
}

fn permissions_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match raw {
        serde_json::Value::String(text) => text.parse().map_err(serde::de::Error::custom),
        serde_json::Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("permissions out of range")),
        other => Err(serde::de::Error::custom(format!(
            "unexpected permissions value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trip_for_known_values() {
        assert_eq!(GatewayOpcode::from_u64(10), Some(GatewayOpcode::Hello));
        assert_eq!(GatewayOpcode::from_u64(11), Some(GatewayOpcode::HeartbeatAck));
        assert_eq!(GatewayOpcode::from_u64(3), None);
        assert_eq!(GatewayOpcode::from_u64(99), None);
    }

    #[test]
    fn role_permissions_parse_from_string() {
        let role: GuildRole =
            serde_json::from_str(r#"{"id":"55","name":"Leaders","permissions":"32"}"#).unwrap();
        assert_eq!(role.id, "55");
        assert_eq!(role.permissions & PERMISSION_MANAGE_GUILD, PERMISSION_MANAGE_GUILD);
    }

    #[test]
    fn role_permissions_reject_garbage() {
        let parsed = serde_json::from_str::<GuildRole>(r#"{"id":"55","permissions":"lots"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn intents_cover_guild_messages_and_content() {
        assert_eq!(WATCH_INTENTS & 512, 512);
        assert_eq!(WATCH_INTENTS & 32768, 32768);
    }
}
