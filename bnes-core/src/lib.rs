//! Core types and service wiring for bnes, the waste collection reminder.

/// YAML run configuration.
pub mod config;
/// Parsing of the council collections table.
pub mod extract;
/// Download of the council page.
pub mod fetch;
/// Domain models shared by all channels.
pub mod model;
/// Traits describing the notification channels.
pub mod ports;
/// Lookup of channels by recipient method.
pub mod registry;
/// Due-tomorrow selection.
pub mod schedule;
/// Notifier fanning messages out to recipients.
pub mod service;

pub use config::*;
pub use extract::*;
pub use fetch::*;
pub use model::*;
pub use ports::*;
pub use registry::*;
pub use schedule::*;
pub use service::*;
