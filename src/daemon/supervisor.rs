use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Restart policy shared by every daemon component.
#[derive(Debug, Clone, Copy)]
pub(super) struct Backoff {
    pub initial_secs: u64,
    pub max_secs: u64,
    /// Consecutive failures tolerated before giving up; 0 means never.
    pub max_restarts: u32,
}

/// Runs `start` in a loop, sleeping with doubling backoff after each exit.
/// A component that stops without error still counts as a failure: every
/// component here is meant to run for the life of the process.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    policy: Backoff,
    mut start: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let initial = policy.initial_secs.max(1);
        let ceiling = policy.max_secs.max(initial);
        let mut backoff = initial;
        let mut failures: u32 = 0;

        loop {
            tracing::info!("Component '{name}' starting");
            match start().await {
                Ok(()) => {
                    tracing::warn!("Component '{name}' exited unexpectedly");
                    backoff = initial;
                }
                Err(e) => tracing::error!("Component '{name}' failed: {e:#}"),
            }
            failures = failures.saturating_add(1);

            if policy.max_restarts > 0 && failures > policy.max_restarts {
                tracing::error!(
                    "Component '{name}' exceeded {} restarts; giving up",
                    policy.max_restarts
                );
                break;
            }
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(ceiling);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_restarts: u32) -> Backoff {
        Backoff {
            initial_secs: 1,
            max_secs: 1,
            max_restarts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_component_is_restarted_until_circuit_opens() {
        let starts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&starts);
        let handle = spawn_component_supervisor("test-fail", policy(2), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("boom")
            }
        });

        handle.await.unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn clean_exit_is_also_restarted() {
        let starts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&starts);
        let handle = spawn_component_supervisor("test-exit", policy(0), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        let _ = handle.await;
        assert!(starts.load(Ordering::SeqCst) >= 1);
    }
}
