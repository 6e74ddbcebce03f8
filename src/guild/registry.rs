//! Guild registry: one lock-guarded bot per guild.
//!
//! Every operation on a guild's bot runs under that guild's mutex, so the
//! readiness check and the fire that consumes it cannot interleave with
//! another message for the same guild. Guilds never contend with each other.

use crate::config::Config;
use crate::error::{BotError, Result, TrainingError};
use crate::generator::{MarkovText, TextGenerator};
use crate::guild::bot::GuildBot;
use crate::guild::readiness::TriggerKind;
use crate::training::TrainingReport;
use crate::{GuildId, InboundMessage, Outbound};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Builds the bot for a guild seen for the first time.
pub type BotFactory<G> = Box<dyn Fn(GuildId, &Config) -> Result<GuildBot<G>> + Send + Sync>;

pub struct GuildRegistry<G: TextGenerator = MarkovText> {
    config: Arc<Config>,
    bots: RwLock<HashMap<GuildId, Arc<Mutex<GuildBot<G>>>>>,
    factory: BotFactory<G>,
}

impl<G: TextGenerator> std::fmt::Debug for GuildRegistry<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildRegistry").finish_non_exhaustive()
    }
}

impl<G: TextGenerator> GuildRegistry<G> {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_factory(config, Box::new(GuildBot::new))
    }

    pub fn with_factory(config: Arc<Config>, factory: BotFactory<G>) -> Self {
        Self {
            config,
            bots: RwLock::new(HashMap::new()),
            factory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The guild's bot, created with defaults on first use.
    pub async fn bot(&self, guild_id: GuildId) -> Result<Arc<Mutex<GuildBot<G>>>> {
        if let Some(bot) = self.bots.read().await.get(&guild_id) {
            return Ok(bot.clone());
        }

        let mut bots = self.bots.write().await;
        if let Some(bot) = bots.get(&guild_id) {
            return Ok(bot.clone());
        }

        let bot = Arc::new(Mutex::new((self.factory)(guild_id, &self.config)?));
        bots.insert(guild_id, bot.clone());

        tracing::info!(guild_id = %guild_id, "guild bot created");
        Ok(bot)
    }

    /// Known guilds, sorted.
    pub async fn guild_ids(&self) -> Vec<GuildId> {
        let mut ids: Vec<GuildId> = self.bots.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Feed a message to its guild's bot and decide whether to answer.
    ///
    /// A mention is answered in the message's channel when the mention
    /// cooldown allows. Otherwise, when the random cooldown allows, the bot
    /// posts a take or rant to its own channel. Generation runs on the
    /// blocking pool with the guild locked.
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<Option<Outbound>> {
        let bot = self.bot(message.guild_id).await?;
        let mut bot = bot.lock_owned().await;
        let message = message.clone();

        let outbound = tokio::task::spawn_blocking(move || dispatch(&mut bot, &message))
            .await
            .map_err(|error| BotError::TaskFailed(error.to_string()))?;
        Ok(outbound)
    }

    /// Post an unprompted take or rant if the guild is ready for one.
    pub async fn random_tick(&self, guild_id: GuildId) -> Option<Outbound> {
        let bot = self.bots.read().await.get(&guild_id).cloned()?;
        let mut bot = bot.lock_owned().await;

        let channel_id = bot.channel_id()?;
        if !bot.is_ready(TriggerKind::Random) {
            return None;
        }

        let text = match tokio::task::spawn_blocking(move || bot.trigger_random()).await {
            Ok(text) => text?,
            Err(error) => {
                tracing::warn!(guild_id = %guild_id, %error, "random post task failed");
                return None;
            }
        };
        tracing::debug!(guild_id = %guild_id, "random post");

        Some(Outbound {
            guild_id,
            channel_id,
            text,
            reply_to: None,
        })
    }

    /// Retrain a guild's bot on the blocking pool. The guild stays locked
    /// until training finishes.
    pub async fn train(
        &self,
        guild_id: GuildId,
        dataset: Option<String>,
        only_file: Option<String>,
    ) -> Result<TrainingReport> {
        let bot = self.bot(guild_id).await?;
        let mut bot = bot.lock_owned().await;

        tokio::task::spawn_blocking(move || bot.train_full(dataset.as_deref(), only_file.as_deref()))
            .await
            .map_err(|error| TrainingError::TaskFailed(error.to_string()))?
    }
}

/// Observe a message and pick the bot's answer, if any.
fn dispatch<G: TextGenerator>(bot: &mut GuildBot<G>, message: &InboundMessage) -> Option<Outbound> {
    let learnable = bot.channel_id() == Some(message.channel_id)
        && (!bot.restricted_training_only() || message.author_is_trusted);
    bot.observe(&message.content, learnable);

    let home_channel = bot.channel_id()?;

    if message.mentions_bot && bot.is_ready(TriggerKind::Mention) {
        let reply = bot.generate_take(Some(&message.content), true);
        return reply.map(|text| Outbound {
            guild_id: message.guild_id,
            channel_id: message.channel_id,
            text,
            reply_to: Some(message.message_id),
        });
    }

    if bot.is_ready(TriggerKind::Random) {
        return bot.trigger_random().map(|text| Outbound {
            guild_id: message.guild_id,
            channel_id: home_channel,
            text,
            reply_to: None,
        });
    }

    None
}
