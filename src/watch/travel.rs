use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::diff::{RosterStatuses, TravelEvent, travel_times};
use crate::notify::format::{battle_stats_line, eta_line, profile_url};
use crate::notify::{Emitter, Notification};
use crate::stats::StatCache;
use crate::toggles::Toggles;
use crate::torn::{MemberSnapshot, RosterFeed};

/// Grace period on top of the standard flight time.
const LANDING_GRACE_SECS: u64 = 120;
/// Lifetime for alerts about places missing from the table.
const UNKNOWN_PLACE_LIFETIME: Duration = Duration::from_secs(6 * 60 * 60);

fn headline(member: &MemberSnapshot, event: &TravelEvent) -> String {
    let name = format!("[{}]({})", member.name, profile_url(member.id));
    match event {
        TravelEvent::Departing { destination } => {
            format!("🛫 **{name}** — Travelling to **{destination}**\n")
        }
        TravelEvent::Returning { origin } => {
            format!("🛬 **{name}** — Returning to Torn from **{origin}**\n")
        }
    }
}

/// Renders a departure or return alert with ETAs for each ticket class.
pub fn travel_notification(
    member: &MemberSnapshot,
    event: &TravelEvent,
    now: DateTime<Utc>,
    estimate: Option<&str>,
) -> Notification {
    let mut text = headline(member, event);

    let Some(times) = travel_times(event.place()) else {
        text.push_str(&battle_stats_line(estimate));
        text.push_str("_(No travel time data for this destination yet)_");
        return Notification {
            text,
            lifetime: UNKNOWN_PLACE_LIFETIME,
        };
    };

    for (class, minutes) in [
        ("Standard", times.standard),
        ("Airstrip", times.airstrip),
        ("Business", times.business),
    ] {
        text.push_str(&format!("{class}: {}\n", eta_line(now, minutes)));
    }
    text.push_str(&battle_stats_line(estimate));

    Notification {
        text: text.trim_end().to_string(),
        lifetime: Duration::from_secs(u64::from(times.standard) * 60 + LANDING_GRACE_SECS),
    }
}

/// Polls the enemy roster and alerts when members take off or head home.
pub struct TravelWatcher {
    feed: Arc<dyn RosterFeed>,
    stats: Arc<StatCache>,
    emitter: Emitter,
    toggles: Arc<Toggles>,
    enemy_faction: u64,
    poll_interval: Duration,
    statuses: RosterStatuses,
}

impl TravelWatcher {
    pub fn new(
        feed: Arc<dyn RosterFeed>,
        stats: Arc<StatCache>,
        emitter: Emitter,
        toggles: Arc<Toggles>,
        enemy_faction: u64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            feed,
            stats,
            emitter,
            toggles,
            enemy_faction,
            poll_interval,
            statuses: RosterStatuses::new(),
        }
    }

    pub fn statuses(&self) -> &RosterStatuses {
        &self.statuses
    }

    /// One cycle. Returns how many alerts were emitted. Paused cycles do not
    /// touch the feed, so stored statuses go stale until tracking resumes.
    pub async fn poll_once(&mut self) -> usize {
        if self.toggles.is_travel_paused() {
            tracing::debug!("travel tracking paused; skipping poll");
            return 0;
        }

        let roster = match self.feed.fetch_roster(self.enemy_faction).await {
            Ok(roster) => roster,
            Err(error) => {
                tracing::warn!("Error fetching enemy travel: {error}");
                return 0;
            }
        };

        if !self.statuses.is_primed() {
            self.statuses.prime(&roster);
            tracing::info!(
                enemy_faction = self.enemy_faction,
                members = roster.len(),
                "Travel watcher primed"
            );
            return 0;
        }

        let mut emitted = 0;
        for member in &roster {
            let Some(event) = self.statuses.observe(member) else {
                continue;
            };

            let estimate = self.stats.estimate(member.id).await;
            let notification = travel_notification(member, &event, Utc::now(), estimate.as_deref());
            tracing::info!(member = member.id, place = event.place(), "announcing travel");
            self.emitter.emit(notification).await;
            emitted += 1;
        }
        emitted
    }

    /// Polls forever; the first successful fetch only records a baseline.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.poll_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
