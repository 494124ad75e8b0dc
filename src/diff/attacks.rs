use std::collections::HashSet;

use crate::torn::AttackEvent;

/// Outcomes that cost the attacker nothing worth retaliating for.
const EXCLUDED_OUTCOMES: [&str; 3] = ["lost", "stalemate", "interrupted"];

/// What to do with one attack record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackVerdict {
    /// Already classified in an earlier poll.
    Skip,
    /// Attacker belongs to the home faction.
    OwnFaction,
    /// Failed or aborted attack; recorded but silent.
    Excluded,
    /// New hostile attack: alert.
    Notify,
}

/// Attack ids already classified. Grows for the life of the process.
#[derive(Debug, Default)]
pub struct SeenAttacks {
    ids: HashSet<String>,
}

impl SeenAttacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every id as seen without classifying anything.
    pub fn prime<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.ids.extend(ids.into_iter().map(str::to_string));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Classifies `event`, recording its id so it is never classified twice.
    pub fn classify(&mut self, event: &AttackEvent, home_faction: u64) -> AttackVerdict {
        if !self.ids.insert(event.id.clone()) {
            return AttackVerdict::Skip;
        }
        if home_faction != 0 && event.attacker_faction == home_faction {
            return AttackVerdict::OwnFaction;
        }
        if is_excluded_outcome(&event.outcome) {
            return AttackVerdict::Excluded;
        }
        AttackVerdict::Notify
    }
}

pub fn is_excluded_outcome(outcome: &str) -> bool {
    let normalized = outcome.trim().to_lowercase();
    EXCLUDED_OUTCOMES.contains(&normalized.as_str())
}
