//! Per-guild bot state: readiness, take generation, training, and the registry
//! that serializes access to each guild.

pub mod bot;
pub mod readiness;
pub mod registry;

pub use bot::GuildBot;
pub use readiness::{Readiness, TriggerKind};
pub use registry::GuildRegistry;
