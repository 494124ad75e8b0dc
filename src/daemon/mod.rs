use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::notify::{Emitter, NotificationSink};
use crate::stats::StatCache;
use crate::toggles::Toggles;
use crate::torn::TornClient;
use crate::transport::discord::http_client::DiscordHttpClient;
use crate::transport::discord::{DiscordListener, DiscordSink};
use crate::watch::{AttackWatcher, TravelWatcher};

mod supervisor;

use supervisor::{Backoff, spawn_component_supervisor};

const RESTART_POLICY: Backoff = Backoff {
    initial_secs: 2,
    max_secs: 60,
    max_restarts: 10,
};

/// Everything the components share, built once per process.
struct Shared {
    config: Arc<Config>,
    toggles: Arc<Toggles>,
    http: Arc<DiscordHttpClient>,
    torn: Arc<TornClient>,
    stats: Arc<StatCache>,
    emitter: Emitter,
}

impl Shared {
    fn build(config: Arc<Config>) -> Result<Self> {
        let timeout = config.watch.request_timeout();
        let toggles = Arc::new(Toggles::new());
        let http = Arc::new(DiscordHttpClient::new(
            config.discord.bot_token.as_str(),
            timeout,
        )?);
        let sink: Arc<dyn NotificationSink> = Arc::new(DiscordSink::new(
            Arc::clone(&http),
            config.discord.channel_id,
        ));
        let torn = Arc::new(TornClient::new(
            &config.torn.base_url,
            config.torn.api_key.as_deref().unwrap_or_default(),
            timeout,
        )?);
        let stats = Arc::new(StatCache::from_config(&config.ffscouter, timeout)?);

        Ok(Self {
            emitter: Emitter::new(sink, Arc::clone(&toggles)),
            config,
            toggles,
            http,
            torn,
            stats,
        })
    }
}

fn spawn_components(shared: &Shared) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    let config = &shared.config;

    {
        let (torn, stats, emitter) = (
            Arc::clone(&shared.torn),
            Arc::clone(&shared.stats),
            shared.emitter.clone(),
        );
        let home_faction = config.torn.faction_id;
        let interval = config.watch.poll_interval();
        handles.push(spawn_component_supervisor(
            "attack-watcher",
            RESTART_POLICY,
            move || {
                let watcher = AttackWatcher::new(
                    torn.clone(),
                    Arc::clone(&stats),
                    emitter.clone(),
                    home_faction,
                    interval,
                );
                watcher.run()
            },
        ));
    }

    if config.travel_tracking_enabled() {
        let (torn, stats, emitter, toggles) = (
            Arc::clone(&shared.torn),
            Arc::clone(&shared.stats),
            shared.emitter.clone(),
            Arc::clone(&shared.toggles),
        );
        let enemy_faction = config.torn.enemy_faction_id;
        let interval = config.watch.poll_interval();
        handles.push(spawn_component_supervisor(
            "travel-watcher",
            RESTART_POLICY,
            move || {
                let watcher = TravelWatcher::new(
                    torn.clone(),
                    Arc::clone(&stats),
                    emitter.clone(),
                    Arc::clone(&toggles),
                    enemy_faction,
                    interval,
                );
                watcher.run()
            },
        ));
    } else {
        tracing::info!("ENEMY_FACTION_ID not set; enemy travel tracking disabled");
    }

    {
        let http = Arc::clone(&shared.http);
        let toggles = Arc::clone(&shared.toggles);
        let token = config.discord.bot_token.clone();
        let channel_id = config.discord.channel_id;
        handles.push(spawn_component_supervisor(
            "discord-listener",
            RESTART_POLICY,
            move || {
                let listener = DiscordListener::new(
                    Arc::clone(&http),
                    token.clone(),
                    Arc::clone(&toggles),
                    channel_id,
                );
                listener.run()
            },
        ));
    }

    handles
}

/// Starts the watchers and the command listener, then waits for ctrl-c.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let shared = Shared::build(config)?;
    let handles = spawn_components(&shared);

    tracing::info!(
        channel_id = shared.config.discord.channel_id,
        faction_id = shared.config.torn.faction_id,
        enemy_faction_id = shared.config.torn.enemy_faction_id,
        components = handles.len(),
        "retalwatch started; press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
