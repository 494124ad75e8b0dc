//! Pure change detection over successive feed snapshots. No I/O.

pub mod attacks;
pub mod places;
pub mod travel;

pub use attacks::{AttackVerdict, SeenAttacks};
pub use places::{TravelTimes, normalize_place, travel_times};
pub use travel::{RosterStatuses, TravelEvent, UNKNOWN_PLACE};
