pub mod emit;
pub mod format;
pub mod sink;

pub use emit::{Emitter, Notification};
pub use sink::{NotificationSink, OutgoingMessage};
