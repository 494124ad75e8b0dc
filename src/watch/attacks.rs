use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::diff::{AttackVerdict, SeenAttacks};
use crate::notify::format::{battle_stats_line, format_respect, profile_url};
use crate::notify::{Emitter, Notification};
use crate::stats::StatCache;
use crate::torn::{AttackEvent, AttackFeed, AttackPage};

/// Torn's retaliation window after a hit.
pub const RETAL_WINDOW_SECS: i64 = 5 * 60;
/// Alerts for attacks already past their window still post, briefly.
const MIN_ALERT_LIFETIME_SECS: i64 = 5;

/// Renders a retal alert. `now` and `estimate` are passed in so the result
/// depends on nothing else.
pub fn attack_notification(event: &AttackEvent, now: i64, estimate: Option<&str>) -> Notification {
    let attack_ts = event.timestamp.unwrap_or(now);
    let retal_expires = attack_ts.saturating_add(RETAL_WINDOW_SECS);
    let lifetime_secs = retal_expires
        .saturating_sub(now)
        .clamp(MIN_ALERT_LIFETIME_SECS, RETAL_WINDOW_SECS);

    let link_line = event.attacker_id.map_or_else(
        || "🔗 *(Stealthed attacker — no profile link)*".to_string(),
        |id| format!("🔗 {}", profile_url(id)),
    );

    let text = format!(
        "🚨 **Faction Member {outcome}!** 🚨\n\
         ⏳ **Retal ends:** <t:{retal_expires}:R>\n\
         **Attacker:** {attacker}\n\
         **Defender:** {defender}\n\
         **Respect Lost:** {respect}\n\
         {stats}{link_line}",
        outcome = event.outcome,
        attacker = event.attacker_name,
        defender = event.defender_name,
        respect = format_respect(event.respect.as_ref()),
        stats = battle_stats_line(estimate),
    );

    Notification {
        text,
        lifetime: Duration::from_secs(lifetime_secs.unsigned_abs()),
    }
}

/// Polls the faction attack feed and alerts on each new hostile hit.
pub struct AttackWatcher {
    feed: Arc<dyn AttackFeed>,
    stats: Arc<StatCache>,
    emitter: Emitter,
    home_faction: u64,
    poll_interval: Duration,
    seen: SeenAttacks,
    primed: bool,
}

impl AttackWatcher {
    pub fn new(
        feed: Arc<dyn AttackFeed>,
        stats: Arc<StatCache>,
        emitter: Emitter,
        home_faction: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            feed,
            stats,
            emitter,
            home_faction,
            poll_interval,
            seen: SeenAttacks::new(),
            primed: false,
        }
    }

    pub fn seen(&self) -> &SeenAttacks {
        &self.seen
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    fn prime_from(&mut self, page: &AttackPage) {
        self.seen.prime(page.ids());
        self.primed = true;
        tracing::info!(
            baseline = page.len(),
            "Attack watcher primed; existing attacks will not be announced"
        );
    }

    /// Marks everything currently in the feed as seen. On failure the first
    /// successful poll primes instead.
    pub async fn prime(&mut self) {
        match self.feed.fetch_attacks().await {
            Ok(page) => self.prime_from(&page),
            Err(error) => tracing::warn!("Error fetching initial attacks: {error}"),
        }
    }

    /// One cycle. Returns how many alerts were emitted.
    pub async fn poll_once(&mut self) -> usize {
        let page = match self.feed.fetch_attacks().await {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!("Error fetching attacks: {error}");
                return 0;
            }
        };

        if !self.primed {
            self.prime_from(&page);
            return 0;
        }

        // Undecodable records are never announced; the id alone is recorded.
        for id in &page.unreadable {
            if !self.seen.contains(id) {
                tracing::warn!(attack = %id, "skipping malformed attack record");
                self.seen.prime([id.as_str()]);
            }
        }

        let mut emitted = 0;
        for event in &page.attacks {
            match self.seen.classify(event, self.home_faction) {
                AttackVerdict::Notify => {}
                verdict => {
                    if verdict != AttackVerdict::Skip {
                        tracing::debug!(attack = %event.id, ?verdict, "attack not announced");
                    }
                    continue;
                }
            }

            let estimate = match event.attacker_id {
                Some(id) => self.stats.estimate(id).await,
                None => None,
            };
            let notification =
                attack_notification(event, Utc::now().timestamp(), estimate.as_deref());
            tracing::info!(attack = %event.id, attacker = %event.attacker_name, "announcing attack");
            self.emitter.emit(notification).await;
            emitted += 1;
        }
        emitted
    }

    /// Primes, then polls forever with a fixed sleep after each cycle.
    pub async fn run(mut self) -> Result<()> {
        self.prime().await;
        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
