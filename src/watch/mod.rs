//! The two polling pipelines. Each owns its differencer state outright; only
//! the toggles and the stat cache are shared.

pub mod attacks;
pub mod travel;

pub use attacks::{AttackWatcher, attack_notification};
pub use travel::{TravelWatcher, travel_notification};
