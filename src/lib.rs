#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod commands;
pub mod config;
pub mod daemon;
pub mod diff;
pub mod error;
pub mod notify;
pub mod stats;
pub mod toggles;
pub mod torn;
pub mod transport;
pub mod watch;
