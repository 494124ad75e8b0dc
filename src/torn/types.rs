//! Torn API records and the lenient decoding they need.
//!
//! Torn is loose with types: ids arrive as numbers or strings, respect as a
//! float or a numeric string, and empty collections as `[]` instead of `{}`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts `123`, `"123"`, `""`, `null` or a missing field. Anything that is
/// not a positive integer becomes `0`.
fn lenient_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, id_from_value))
}

fn id_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Latest Unix second accepted from the feed.
const MAX_TIMESTAMP: i64 = u32::MAX as i64;

/// Unix seconds from a number or a digit string. Zero, garbage and values
/// past [`MAX_TIMESTAMP`] are `None`.
fn timestamp_from_value(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()?
        }
        _ => return None,
    };
    (1..=MAX_TIMESTAMP).contains(&seconds).then_some(seconds)
}

/// One entry of `/faction/?selections=attacks`, as sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttack {
    #[serde(default, deserialize_with = "lenient_id")]
    pub attacker_id: u64,
    #[serde(default)]
    pub attacker_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub attacker_faction: u64,
    #[serde(default)]
    pub defender_name: Option<String>,
    #[serde(default)]
    pub respect_loss: Option<Value>,
    /// Older payloads carried the figure here.
    #[serde(default)]
    pub respect: Option<Value>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub timestamp_ended: Option<Value>,
    #[serde(default)]
    pub timestamp_started: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Respect figure as sent: a number, or text that may or may not be numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Respect {
    Number(f64),
    Text(String),
}

impl Respect {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

/// A hostile attack, normalized from [`RawAttack`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttackEvent {
    pub id: String,
    /// `None` when the attacker was stealthed (id missing or zero).
    pub attacker_id: Option<u64>,
    pub attacker_name: String,
    pub attacker_faction: u64,
    pub defender_name: String,
    pub respect: Option<Respect>,
    pub outcome: String,
    /// `None` when the feed carried no usable timestamp.
    pub timestamp: Option<i64>,
}

impl AttackEvent {
    pub fn from_raw(id: impl Into<String>, raw: RawAttack) -> Self {
        // `respect_loss` wins; `respect` is only a fallback.
        let respect = raw
            .respect_loss
            .as_ref()
            .and_then(Respect::from_value)
            .or_else(|| raw.respect.as_ref().and_then(Respect::from_value));

        let timestamp = [
            raw.timestamp_ended.as_ref(),
            raw.timestamp_started.as_ref(),
            raw.timestamp.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find_map(timestamp_from_value);

        Self {
            id: id.into(),
            attacker_id: (raw.attacker_id > 0).then_some(raw.attacker_id),
            attacker_name: raw
                .attacker_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Someone".into()),
            attacker_faction: raw.attacker_faction,
            defender_name: raw.defender_name.unwrap_or_else(|| "Unknown".into()),
            respect,
            outcome: raw.result.unwrap_or_else(|| "Attacked".into()),
            timestamp,
        }
    }
}

/// One fetch of the attack feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackPage {
    pub attacks: Vec<AttackEvent>,
    /// Keys of records that did not decode. They are still present in the feed.
    pub unreadable: Vec<String>,
}

impl AttackPage {
    /// Every id in the feed, decoded or not.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.attacks
            .iter()
            .map(|a| a.id.as_str())
            .chain(self.unreadable.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.attacks.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<AttackEvent>> for AttackPage {
    fn from(attacks: Vec<AttackEvent>) -> Self {
        Self {
            attacks,
            unreadable: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMemberStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of `/faction/{id}?selections=basic` `members`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<RawMemberStatus>,
}

/// An enemy member's status at one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub id: u64,
    pub name: String,
    /// Coarse state such as `Okay`, `Traveling`, `Abroad`, `Hospital`.
    pub state: Option<String>,
    /// Free text such as `Traveling to Mexico` or `In Japan`.
    pub description: String,
}

impl MemberSnapshot {
    pub fn from_raw(id: u64, raw: RawMember) -> Self {
        let status = raw.status.unwrap_or_default();
        let state = status
            .state
            .filter(|s| !s.is_empty())
            .or(status.status.filter(|s| !s.is_empty()));

        Self {
            id,
            name: raw.name.unwrap_or_else(|| format!("User {id}")),
            state,
            description: status.description.unwrap_or_default(),
        }
    }
}
