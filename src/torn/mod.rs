//! Torn API feeds polled by the watchers.

pub mod client;
pub mod types;

pub use client::{AttackFeed, RosterFeed, TornClient};
pub use types::{AttackEvent, AttackPage, MemberSnapshot, Respect};
