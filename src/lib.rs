//! takebot: a chat bot that learns how a guild talks and posts its own takes.

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod guild;
pub mod model;
pub mod scheduler;
pub mod training;

pub use error::{Error, Result};

/// Guild (server) identifier type.
pub type GuildId = u64;

/// Channel identifier type.
pub type ChannelId = u64;

/// Message identifier type.
pub type MessageId = u64;

/// A chat message observed in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: u64,
    pub content: String,
    /// The message mentions the bot.
    pub mentions_bot: bool,
    /// The author may be learned from while restricted training is on.
    pub author_is_trusted: bool,
}

/// Text the bot wants posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub text: String,
    /// Message being answered, for platforms that thread replies.
    pub reply_to: Option<MessageId>,
}
