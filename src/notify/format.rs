//! Text rendering for alerts. Discord markdown and `<t:..>` timestamps.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::torn::Respect;

const PROFILE_URL: &str = "https://www.torn.com/profiles.php?XID=";

pub fn profile_url(player_id: u64) -> String {
    format!("{PROFILE_URL}{player_id}")
}

fn two_decimals_trimmed(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `12.50` -> `12.5`, `12.00` -> `12`, text passes through, missing -> `Unknown`.
pub fn format_respect(respect: Option<&Respect>) -> String {
    match respect {
        Some(Respect::Number(value)) => two_decimals_trimmed(*value),
        Some(Respect::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_or_else(|_| text.clone(), two_decimals_trimmed),
        None => "Unknown".into(),
    }
}

/// `45` -> `45m`, `134` -> `2h 14m`.
pub fn pretty_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Discord renders `<t:UNIX:t>` as a short local time for each reader.
pub fn eta_line(now: DateTime<Utc>, minutes: u32) -> String {
    let eta = now + ChronoDuration::minutes(i64::from(minutes));
    format!("{} (ETA <t:{}:t>)", pretty_minutes(minutes), eta.timestamp())
}

pub fn battle_stats_line(estimate: Option<&str>) -> String {
    estimate.map_or_else(String::new, |est| {
        format!("📊 **Est. Battle Stats:** {est}\n")
    })
}
