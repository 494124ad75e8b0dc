use std::sync::Arc;
use std::time::Duration;

use super::sink::{NotificationSink, OutgoingMessage};
use crate::toggles::Toggles;

const BROAD_MENTION: &str = "@here";

/// An alert decided on by a watcher, before quiet-mode formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub lifetime: Duration,
}

/// The one place every alert passes through on its way to the sink.
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn NotificationSink>,
    toggles: Arc<Toggles>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn NotificationSink>, toggles: Arc<Toggles>) -> Self {
        Self { sink, toggles }
    }

    /// Quiet mode sends the bare text with no mentions allowed; otherwise the
    /// text is prefixed with `@here` and only that mention may ping.
    pub fn render(&self, notification: Notification) -> OutgoingMessage {
        let Notification { text, lifetime } = notification;
        if self.toggles.is_quiet() {
            OutgoingMessage {
                content: text,
                allow_everyone: false,
                delete_after: lifetime,
            }
        } else {
            OutgoingMessage {
                content: format!("{BROAD_MENTION}\n{text}"),
                allow_everyone: true,
                delete_after: lifetime,
            }
        }
    }

    /// Best effort: a failed send is logged and dropped.
    pub async fn emit(&self, notification: Notification) {
        let message = self.render(notification);
        if let Err(error) = self.sink.send(message).await {
            tracing::warn!("Failed to post alert: {error:#}");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Sink that remembers what it was asked to send.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Mutex<Vec<OutgoingMessage>>,
        pub(crate) fail: bool,
    }

    impl RecordingSink {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub(crate) fn messages(&self) -> Vec<OutgoingMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn send<'a>(
            &'a self,
            message: OutgoingMessage,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(message);
                if self.fail {
                    anyhow::bail!("sink offline");
                }
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    fn notification() -> Notification {
        Notification {
            text: "🚨 alert".into(),
            lifetime: Duration::from_secs(120),
        }
    }

    #[tokio::test]
    async fn loud_mode_pings_here() {
        let sink = Arc::new(RecordingSink::default());
        let emitter = Emitter::new(sink.clone(), Arc::new(Toggles::new()));

        emitter.emit(notification()).await;

        let sent = sink.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "@here\n🚨 alert");
        assert!(sent[0].allow_everyone);
        assert_eq!(sent[0].delete_after, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn quiet_mode_suppresses_mentions() {
        let sink = Arc::new(RecordingSink::default());
        let toggles = Arc::new(Toggles::new());
        toggles.set_quiet(true);
        let emitter = Emitter::new(sink.clone(), toggles);

        emitter.emit(notification()).await;

        let sent = sink.messages();
        assert_eq!(sent[0].content, "🚨 alert");
        assert!(!sent[0].allow_everyone);
    }

    #[tokio::test]
    async fn toggle_is_read_per_message() {
        let sink = Arc::new(RecordingSink::default());
        let toggles = Arc::new(Toggles::new());
        let emitter = Emitter::new(sink.clone(), Arc::clone(&toggles));

        emitter.emit(notification()).await;
        toggles.set_quiet(true);
        emitter.emit(notification()).await;

        let sent = sink.messages();
        assert!(sent[0].allow_everyone);
        assert!(!sent[1].allow_everyone);
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink::failing());
        let emitter = Emitter::new(sink.clone(), Arc::new(Toggles::new()));

        emitter.emit(notification()).await;
        assert_eq!(sink.messages().len(), 1);
    }
}
