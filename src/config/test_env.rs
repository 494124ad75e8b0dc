use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every variable `apply_env_overrides` reads.
const WATCH_ENV_KEYS: [&str; 6] = [
    "DISCORD_TOKEN",
    "TORN_API_KEY",
    "FFSCOUTER_KEY",
    "CHANNEL_ID",
    "FACTION_ID",
    "ENEMY_FACTION_ID",
];

/// Holds the process-wide env lock, starts from a clean slate and restores
/// the previous values on drop.
pub(super) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(super) fn clean() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = WATCH_ENV_KEYS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in WATCH_ENV_KEYS {
            // SAFETY: Test-only. ENV_LOCK is held for the guard's lifetime,
            // so no other test mutates the environment concurrently.
            unsafe {
                std::env::remove_var(key);
            }
        }
        Self { saved, _lock: lock }
    }

    pub(super) fn set(&self, key: &'static str, value: &str) {
        debug_assert!(WATCH_ENV_KEYS.contains(&key));
        // SAFETY: see `clean`.
        unsafe {
            std::env::set_var(key, value);
        }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: Test-only restoration while ENV_LOCK is still held.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
