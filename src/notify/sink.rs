use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A message ready for the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    /// Whether an `@here`/`@everyone` token in `content` may ping.
    pub allow_everyone: bool,
    /// The message removes itself after this long.
    pub delete_after: Duration,
}

/// Where alerts go. Delivery is best effort: callers log failures and move on.
pub trait NotificationSink: Send + Sync {
    fn send<'a>(
        &'a self,
        message: OutgoingMessage,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}
