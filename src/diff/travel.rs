use std::collections::HashMap;

use super::places::normalize_place;
use crate::torn::MemberSnapshot;

/// Coarse states that mean "at home and not flying".
const GROUNDED_STATES: [&str; 2] = ["Okay", "Ok"];
const TRAVELING_STATE: &str = "Traveling";

const DESTINATION_MARKERS: [&str; 2] = ["Traveling to", "Abroad in"];
const RETURN_MARKER: &str = "Returning to Torn from";
const ABROAD_PREFIX: &str = "In ";

pub const UNKNOWN_PLACE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TravelEvent {
    Departing { destination: String },
    Returning { origin: String },
}

impl TravelEvent {
    /// Normalized place name, or [`UNKNOWN_PLACE`].
    pub fn place(&self) -> &str {
        match self {
            Self::Departing { destination } => destination,
            Self::Returning { origin } => origin,
        }
    }
}

/// Last-known status of one member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberStatus {
    pub state: Option<String>,
    pub description: String,
}

impl From<&MemberSnapshot> for MemberStatus {
    fn from(member: &MemberSnapshot) -> Self {
        Self {
            state: member.state.clone(),
            description: member.description.clone(),
        }
    }
}

/// Text following the first marker that is followed by whitespace and a
/// non-empty remainder.
fn text_after<'a>(description: &'a str, markers: &[&str]) -> Option<&'a str> {
    let description = description.trim();
    let (start, marker) = markers
        .iter()
        .filter_map(|marker| description.find(marker).map(|at| (at, *marker)))
        .min_by_key(|(at, _)| *at)?;

    let rest = &description[start + marker.len()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

/// `"Traveling to Mexico"` / `"Abroad in Mexico"` -> `"Mexico"`.
pub fn extract_destination(description: &str) -> Option<&str> {
    text_after(description, &DESTINATION_MARKERS)
}

/// `"Returning to Torn from Japan"` -> `"Japan"`.
pub fn extract_return_origin(description: &str) -> Option<&str> {
    text_after(description, &[RETURN_MARKER])
}

fn place_or_unknown(extracted: Option<&str>) -> String {
    extracted
        .map_or(UNKNOWN_PLACE, normalize_place)
        .to_string()
}

/// Compares one member's previous and current status. A return takes
/// priority over a departure.
pub fn detect_transition(
    previous: Option<&MemberStatus>,
    current: &MemberStatus,
) -> Option<TravelEvent> {
    let previous_description = previous.map_or("", |p| p.description.as_str());
    if previous_description.starts_with(ABROAD_PREFIX)
        && current.description.starts_with(RETURN_MARKER)
    {
        return Some(TravelEvent::Returning {
            origin: place_or_unknown(extract_return_origin(&current.description)),
        });
    }

    let previous_state = previous.and_then(|p| p.state.as_deref());
    let was_grounded = previous_state.is_none_or(|state| GROUNDED_STATES.contains(&state));
    if was_grounded && current.state.as_deref() == Some(TRAVELING_STATE) {
        return Some(TravelEvent::Departing {
            destination: place_or_unknown(extract_destination(&current.description)),
        });
    }

    None
}

/// Per-member status from the previous poll. One step of history only;
/// members who leave the roster keep their stale entry.
#[derive(Debug, Default)]
pub struct RosterStatuses {
    members: HashMap<u64, MemberStatus>,
    primed: bool,
}

impl RosterStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, member_id: u64) -> Option<&MemberStatus> {
        self.members.get(&member_id)
    }

    /// Records a baseline without detecting anything; members already in the
    /// air at startup must not look like fresh departures.
    pub fn prime(&mut self, roster: &[MemberSnapshot]) {
        for member in roster {
            self.members.insert(member.id, MemberStatus::from(member));
        }
        self.primed = true;
    }

    /// Detects a transition for `member` and then stores its current status,
    /// whether or not anything fired.
    pub fn observe(&mut self, member: &MemberSnapshot) -> Option<TravelEvent> {
        let current = MemberStatus::from(member);
        let event = detect_transition(self.members.get(&member.id), &current);
        self.members.insert(member.id, current);
        event
    }
}
