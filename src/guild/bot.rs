//! A guild's bot: decides when it may speak and assembles what it says.

use crate::clock::{Clock, SystemClock};
use crate::config::{BotDefaults, ChanceConfig, Config};
use crate::error::{BotError, ModelError, Result};
use crate::format::{Formatter, TakeFormatter};
use crate::generator::{MarkovText, TextGenerator};
use crate::guild::readiness::{Readiness, TriggerKind};
use crate::model::{Model, ModelSettings};
use crate::training::{self, FileOutcome, TrainingReport};
use crate::{ChannelId, GuildId};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom as _;
use rand::{Rng as _, RngCore, SeedableRng as _};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

/// Hard cap on a chat message.
const MESSAGE_CHAR_LIMIT: usize = 2000;
/// Room left for the signature suffix.
const SUFFIX_MARGIN: usize = 30;
/// Rants stay strictly below this many characters before the suffix.
pub const RANT_CHAR_LIMIT: usize = MESSAGE_CHAR_LIMIT - SUFFIX_MARGIN;

/// History must hold more than this many messages before it is used as a seed.
const MIN_HISTORY_FOR_SEED: usize = 5;
/// The newest messages are still being talked about; never echo them.
const NEWEST_EXCLUDED: usize = 4;
/// Seed candidates need more than this many words.
const MIN_SEED_WORDS: usize = 5;

const BECAUSE_PREFIXES: &[&str] = &["because", "Because", "bc"];
const YES_NO_AUXILIARIES: &[&str] = &[
    "are", "is", "will", "do", "does", "doesnt", "am", "should", "have", "would", "did",
];
const YES_NO_FILLERS: &[&str] = &["yea", "ya", "yeah", "yep", "na", "nah", "no", "nope"];
const YES_NO_PUNCTUATION: &[&str] = &["", ".", ","];

/// Remaining cooldown for one trigger kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownStatus {
    pub kind: TriggerKind,
    pub remaining_secs: i64,
    /// Remaining time as `M:SS`.
    pub remaining: String,
    /// Full cooldown as `M:SS`.
    pub total: String,
}

pub struct GuildBot<G: TextGenerator = MarkovText> {
    guild_id: GuildId,
    channel_id: Option<ChannelId>,
    enabled: bool,
    learn_enabled: bool,
    restricted_training_only: bool,
    rant_size: usize,
    rant_chance_percent: f64,

    readiness: Readiness,
    previous_takes: VecDeque<String>,
    /// Newest first.
    recent_messages: VecDeque<String>,
    current_dataset: Option<String>,
    model: Model<G>,

    limits: BotDefaults,
    chances: ChanceConfig,
    model_settings: ModelSettings,
    training_root: PathBuf,
    model_root: PathBuf,

    formatter: Arc<dyn Formatter>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
}

impl<G: TextGenerator> std::fmt::Debug for GuildBot<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildBot")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("enabled", &self.enabled)
            .field("current_dataset", &self.current_dataset)
            .finish_non_exhaustive()
    }
}

impl<G: TextGenerator> GuildBot<G> {
    /// A bot with the system clock, an OS-seeded RNG, and the default formatter.
    pub fn new(guild_id: GuildId, config: &Config) -> Result<Self> {
        Self::with_runtime(
            guild_id,
            config,
            Arc::new(SystemClock),
            Box::new(StdRng::from_os_rng()),
            Arc::new(TakeFormatter::new(config.text.suffix.clone())),
        )
    }

    pub fn with_runtime(
        guild_id: GuildId,
        config: &Config,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Self> {
        let limits = config.bot;
        let model_settings = ModelSettings::from_config(config);
        let model = Model::new(training::state_size_for(None), model_settings.clone(), formatter.clone())?;

        Ok(Self {
            guild_id,
            channel_id: None,
            enabled: true,
            learn_enabled: true,
            restricted_training_only: false,
            rant_size: limits.rant_size,
            rant_chance_percent: limits.rant_chance_percent,
            readiness: Readiness::new(
                limits.mention_wait_minutes,
                limits.random_wait_minutes,
                limits.msgs_wait,
                clock.now(),
            ),
            previous_takes: VecDeque::with_capacity(limits.max_previous_takes),
            recent_messages: VecDeque::new(),
            current_dataset: None,
            model,
            limits,
            chances: config.chances,
            model_settings,
            training_root: config.training_root.clone(),
            model_root: config.model_root.clone(),
            formatter,
            clock,
            rng,
        })
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn learn_enabled(&self) -> bool {
        self.learn_enabled
    }

    pub fn restricted_training_only(&self) -> bool {
        self.restricted_training_only
    }

    pub fn rant_size(&self) -> usize {
        self.rant_size
    }

    pub fn rant_chance_percent(&self) -> f64 {
        self.rant_chance_percent
    }

    pub fn current_dataset(&self) -> Option<&str> {
        self.current_dataset.as_deref()
    }

    pub fn model(&self) -> &Model<G> {
        &self.model
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn is_ready(&self, kind: TriggerKind) -> bool {
        self.readiness.is_ready(kind)
    }

    pub fn previous_takes(&self) -> impl Iterator<Item = &str> {
        self.previous_takes.iter().map(String::as_str)
    }

    /// Discard the model and start over from the init text.
    pub fn reset(&mut self, state_size: usize) -> std::result::Result<(), ModelError> {
        let model = Model::new(state_size, self.model_settings.clone(), self.formatter.clone())?;

        self.model = model;
        self.current_dataset = None;
        self.learn_enabled = true;
        self.readiness.release_latch();

        tracing::info!(guild_id = %self.guild_id, state_size, "model reset");
        Ok(())
    }

    /// Record an observed message, optionally learn from it, and refresh readiness.
    ///
    /// `learnable` is the caller's verdict on whether the author and channel
    /// may be learned from.
    pub fn observe(&mut self, content: &str, learnable: bool) {
        self.recent_messages.push_front(content.to_string());
        self.recent_messages.truncate(self.limits.max_recent_messages);

        if self.learn_enabled
            && learnable
            && content.split_whitespace().count() > self.model.state_size()
            && let Err(error) = self.model.update(&[content.to_string()])
        {
            tracing::debug!(guild_id = %self.guild_id, %error, "message not learned");
        }

        self.readiness.record_message();
        self.test_take_readiness(self.limits.readiness_sample);
        self.readiness.recompute(self.clock.now());
    }

    /// Latch readiness if `sample` fresh sentences are pairwise distinct.
    /// Once latched, the model is not probed again until reset.
    pub fn test_take_readiness(&mut self, sample: usize) -> bool {
        if self.readiness.can_generate_unique_takes() {
            return true;
        }

        let mut seen = HashSet::with_capacity(sample);
        for _ in 0..sample {
            let sentence = self.model.make_sentence(None, &mut *self.rng);
            if !seen.insert(sentence) {
                return false;
            }
        }

        self.readiness.engage_latch();
        tracing::info!(guild_id = %self.guild_id, sample, "model ready for unique takes");
        true
    }

    /// Generate a single take.
    ///
    /// `message` is the content being replied to, or `None` for an unprompted
    /// take. With `trigger_cooldown` the matching cooldown is consumed before
    /// generating, even if nothing comes out.
    pub fn generate_take(&mut self, message: Option<&str>, trigger_cooldown: bool) -> Option<String> {
        if !self.can_post() {
            return None;
        }

        if trigger_cooldown {
            let kind = if message.is_some() {
                TriggerKind::Mention
            } else {
                TriggerKind::Random
            };
            self.readiness.fire(kind, self.clock.now());
        }

        let take = match message {
            None => {
                let seed = self.pick_history_seed();
                let sentence = self.model.make_sentence(seed.as_deref(), &mut *self.rng);
                let cleaned = self.formatter.clean(&sentence, false);
                self.ensure_unique(cleaned, self.limits.unique_tries, None)
            }
            Some(content) => self.model.make_sentence(Some(content), &mut *self.rng),
        };

        self.log_take(&take);

        let mut text = self.formatter.append_suffix(&self.formatter.clean(&take, false));
        if let Some(content) = message {
            text = self.decorate_reply(content, text);
        }

        tracing::debug!(guild_id = %self.guild_id, reply = message.is_some(), "take generated");
        Some(text)
    }

    /// Regenerate while `text` repeats a logged take, at most `max_tries` times.
    /// Returns the last candidate whether or not it is unique.
    pub fn ensure_unique(&mut self, text: String, max_tries: usize, seed: Option<&str>) -> String {
        let mut text = text;
        let mut tries = 0;

        while tries < max_tries && self.previous_takes.contains(&text) {
            text = self.model.make_sentence(seed, &mut *self.rng);
            tries += 1;
        }

        text
    }

    /// Remember a take, evicting the oldest once the history is full.
    pub fn log_take(&mut self, text: &str) {
        let capacity = self.limits.max_previous_takes;
        if capacity == 0 {
            return;
        }

        while self.previous_takes.len() >= capacity {
            self.previous_takes.pop_front();
        }
        self.previous_takes.push_back(text.to_string());
    }

    /// Generate up to `size` sentences (default: the configured rant size)
    /// joined into one message below [`RANT_CHAR_LIMIT`] characters.
    pub fn generate_rant(&mut self, size: Option<usize>, trigger_cooldown: bool) -> Option<String> {
        if !self.can_post() {
            return None;
        }

        let size = size.unwrap_or(self.rant_size);
        let mut rant = String::new();
        let mut rant_chars = 0;

        for _ in 0..size {
            let sentence = self.model.make_sentence(None, &mut *self.rng);
            // Compared before punctuation is added, so a bare candidate never
            // matches its own logged form ("foo" vs "foo.").
            let sentence = self.ensure_unique(sentence, self.limits.unique_tries, None);
            let sentence = self
                .formatter
                .ensure_terminal_punctuation(&self.formatter.clean(&sentence, true));
            if sentence.is_empty() {
                continue;
            }
            self.log_take(&sentence);

            let separator = usize::from(!rant.is_empty());
            let sentence_chars = sentence.chars().count();
            if rant_chars + separator + sentence_chars >= RANT_CHAR_LIMIT {
                break;
            }

            if separator == 1 {
                rant.push(' ');
            }
            rant.push_str(&sentence);
            rant_chars += separator + sentence_chars;
        }

        if rant.is_empty() {
            return None;
        }

        if trigger_cooldown {
            self.readiness.fire(TriggerKind::Random, self.clock.now());
        }

        tracing::debug!(guild_id = %self.guild_id, chars = rant_chars, "rant generated");
        Some(self.formatter.append_suffix(&rant))
    }

    /// Unprompted post: a rant with `rant_chance_percent` odds, otherwise a take.
    /// Consumes the random cooldown.
    pub fn trigger_random(&mut self) -> Option<String> {
        let rant_chance = (self.rant_chance_percent / 100.0).clamp(0.0, 1.0);
        if self.rng.random_bool(rant_chance) {
            self.generate_rant(None, true)
        } else {
            self.generate_take(None, true)
        }
    }

    /// Replace the model with one trained on `<training_root>/<dataset>`, or
    /// the root itself when `dataset` is `None`. Learning from chat is
    /// switched off afterwards.
    pub fn train_full(&mut self, dataset: Option<&str>, only_file: Option<&str>) -> Result<TrainingReport> {
        let dir = training::resolve_dataset_dir(&self.training_root, dataset)?;
        let files = training::list_corpus_files(&dir, only_file)?;
        let state_size = training::state_size_for(dataset);

        self.reset(state_size)?;

        let mut report = TrainingReport::new(dataset, state_size);
        for path in files {
            let file = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let outcome = match training::read_corpus_file(&path, &*self.formatter) {
                Ok(lines) => match self.model.update(&lines) {
                    Ok(()) => FileOutcome::Trained {
                        file,
                        lines: lines.len(),
                    },
                    Err(error) => FileOutcome::Skipped {
                        file,
                        reason: error.to_string(),
                    },
                },
                Err(error) => FileOutcome::Skipped {
                    file,
                    reason: error.to_string(),
                },
            };

            if let FileOutcome::Skipped { file, reason } = &outcome {
                tracing::warn!(guild_id = %self.guild_id, %file, %reason, "skipping corpus file");
            }
            report.outcomes.push(outcome);
        }

        self.learn_enabled = false;
        self.current_dataset = dataset.map(str::to_string);

        tracing::info!(
            guild_id = %self.guild_id,
            dataset = dataset.unwrap_or("<root>"),
            state_size,
            files = report.outcomes.len(),
            lines = report.lines_trained(),
            "training complete"
        );
        Ok(report)
    }

    pub fn save_model(&self, name: &str) -> std::result::Result<PathBuf, ModelError> {
        self.model.save(&self.model_root, name)
    }

    pub fn load_model(&mut self, name: &str) -> std::result::Result<PathBuf, ModelError> {
        self.model.load(&self.model_root, name)
    }

    pub fn set_channel(&mut self, channel_id: Option<ChannelId>) {
        self.channel_id = channel_id;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_random_wait(&mut self, minutes: f64) -> std::result::Result<(), BotError> {
        self.set_wait(TriggerKind::Random, "random_wait_minutes", minutes)
    }

    pub fn set_mention_wait(&mut self, minutes: f64) -> std::result::Result<(), BotError> {
        self.set_wait(TriggerKind::Mention, "mention_wait_minutes", minutes)
    }

    pub fn set_rant_size(&mut self, size: usize) {
        self.rant_size = size;
    }

    pub fn set_rant_chance(&mut self, percent: f64) -> std::result::Result<(), BotError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(BotError::InvalidSetting {
                name: "rant_chance_percent",
                value: percent.to_string(),
            });
        }
        self.rant_chance_percent = percent;
        Ok(())
    }

    /// Set learning, or toggle it with `None`. Returns the new value.
    pub fn set_learning(&mut self, enabled: Option<bool>) -> bool {
        self.learn_enabled = enabled.unwrap_or(!self.learn_enabled);
        self.learn_enabled
    }

    /// Set restricted training, or toggle it with `None`. Returns the new value.
    pub fn set_restricted_training(&mut self, restricted: Option<bool>) -> bool {
        self.restricted_training_only = restricted.unwrap_or(!self.restricted_training_only);
        self.restricted_training_only
    }

    pub fn is_trained_on(&self, dataset: &str) -> bool {
        self.current_dataset.as_deref() == Some(dataset)
    }

    pub fn cooldown(&self, kind: TriggerKind) -> CooldownStatus {
        let remaining_secs = self.readiness.remaining_secs(kind, self.clock.now());
        CooldownStatus {
            kind,
            remaining_secs,
            remaining: self.formatter.duration_to_text(remaining_secs as f64 / 60.0),
            total: self.formatter.duration_to_text(self.readiness.wait_minutes(kind)),
        }
    }

    pub fn cooldown_report(&self) -> String {
        let random = self.cooldown(TriggerKind::Random);
        let mention = self.cooldown(TriggerKind::Mention);
        format!(
            "Random post cd: {} of {}\nMention reply cd: {} of {}",
            random.remaining, random.total, mention.remaining, mention.total
        )
    }

    fn set_wait(&mut self, kind: TriggerKind, name: &'static str, minutes: f64) -> std::result::Result<(), BotError> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(BotError::InvalidSetting {
                name,
                value: minutes.to_string(),
            });
        }
        self.readiness.set_wait_minutes(kind, minutes);
        Ok(())
    }

    fn can_post(&self) -> bool {
        self.enabled && self.channel_id.is_some()
    }

    /// An older, wordy message from history to steer an unprompted take.
    fn pick_history_seed(&mut self) -> Option<String> {
        if self.recent_messages.len() <= MIN_HISTORY_FOR_SEED
            || !self.rng.random_bool(self.chances.seed_from_history)
        {
            return None;
        }

        let candidates: Vec<&String> = self
            .recent_messages
            .iter()
            .skip(NEWEST_EXCLUDED)
            .filter(|message| message.split(' ').count() > MIN_SEED_WORDS)
            .collect();

        candidates.choose(&mut self.rng).map(|message| message.to_string())
    }

    /// Conversational prefixes for "why" and yes/no questions.
    fn decorate_reply(&mut self, content: &str, text: String) -> String {
        let words: Vec<&str> = content.split(' ').collect();
        let mut text = text;

        if words.contains(&"why")
            && self.rng.random_bool(self.chances.because)
            && let Some(prefix) = BECAUSE_PREFIXES.choose(&mut self.rng)
        {
            text = format!("{prefix} {text}");
        }

        let yes_no_question = words.iter().take(2).any(|word| YES_NO_AUXILIARIES.contains(word));
        if yes_no_question
            && self.rng.random_bool(self.chances.yes_no)
            && let Some(filler) = YES_NO_FILLERS.choose(&mut self.rng)
            && let Some(punctuation) = YES_NO_PUNCTUATION.choose(&mut self.rng)
        {
            text = format!("{filler}{punctuation} {text}");
        }

        text
    }
}

impl<G: TextGenerator> std::fmt::Display for GuildBot<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mention = self.cooldown(TriggerKind::Mention);
        let random = self.cooldown(TriggerKind::Random);

        writeln!(f, "Enabled: {}", self.enabled)?;
        writeln!(f, "Learning: {}", self.learn_enabled)?;
        writeln!(f, "Restricted training: {}", self.restricted_training_only)?;
        writeln!(f, "Sentences parsed: {}", self.model.sentence_count())?;
        writeln!(f, "Chain: {}", self.model.state_size())?;
        writeln!(f, "Data set: {}", self.current_dataset.as_deref().unwrap_or("none"))?;
        writeln!(
            f,
            "Mention reply cooldown: {} of {}m",
            mention.remaining,
            self.readiness.wait_minutes(TriggerKind::Mention).floor()
        )?;
        writeln!(
            f,
            "Random take cooldown: {} of {}m",
            random.remaining,
            self.readiness.wait_minutes(TriggerKind::Random).floor()
        )?;
        writeln!(f, "Rant chance: {}%", self.rant_chance_percent)?;
        write!(f, "Rant size: {}", self.rant_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::clock::testing::ManualClock;
    use crate::error::TrainingError;
    use crate::generator::scripted::ScriptedGenerator;
    use rand::SeedableRng as _;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.chances.seed_from_history = 0.0;
        config.chances.smart_reply = 0.0;
        config.chances.because = 0.0;
        config.chances.yes_no = 0.0;
        config
    }

    fn bot_with<G: TextGenerator>(config: &Config, clock: &ManualClock) -> GuildBot<G> {
        let mut bot = GuildBot::with_runtime(
            7,
            config,
            Arc::new(clock.clone()),
            Box::new(StdRng::seed_from_u64(11)),
            Arc::new(TakeFormatter::default()),
        )
        .expect("bot");
        bot.set_channel(Some(100));
        bot
    }

    fn scripted_bot(lines: &[&str], config: &Config) -> (GuildBot<ScriptedGenerator>, ManualClock) {
        let clock = ManualClock::new();
        let mut bot = bot_with(config, &clock);
        bot.model = Model::from_generator(
            ScriptedGenerator::new(lines),
            ModelSettings::from_config(config),
            bot.formatter.clone(),
        );
        (bot, clock)
    }

    fn distinct_lines(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("take {i:04}.")).collect()
    }

    #[test]
    fn test_log_take_evicts_oldest() {
        let mut config = test_config();
        config.bot.max_previous_takes = 2;
        let (mut bot, _) = scripted_bot(&["x"], &config);

        for take in ["a", "b", "c"] {
            bot.log_take(take);
            assert!(bot.previous_takes.len() <= 2);
        }

        assert_eq!(bot.previous_takes().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_no_channel_means_no_output() {
        let (mut bot, _) = scripted_bot(&["hello there"], &test_config());
        bot.set_channel(None);

        assert!(bot.generate_take(None, true).is_none());
        assert!(bot.generate_take(Some("hey"), true).is_none());
        assert!(bot.generate_rant(Some(3), true).is_none());
        assert!(bot.previous_takes.is_empty());
    }

    #[test]
    fn test_disabled_bot_never_rants() {
        let (mut bot, _) = scripted_bot(&["hello there"], &test_config());
        bot.set_enabled(false);

        assert!(bot.generate_rant(Some(3), false).is_none());
        assert!(bot.generate_take(None, false).is_none());
    }

    #[test]
    fn test_rant_stops_before_length_bound() {
        let lines = distinct_lines(400);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut bot, _) = scripted_bot(&refs, &test_config());

        let rant = bot.generate_rant(Some(400), false).expect("partial rant");

        assert!(rant.chars().count() < RANT_CHAR_LIMIT);
        // 10-char sentences joined by spaces: 179 fit, the 180th would reach the limit.
        assert_eq!(rant.chars().count(), 10 + 11 * 178);
        assert!(rant.starts_with("take 0000. take 0001."));
        assert!(rant.ends_with("take 0178."));
    }

    #[test]
    fn test_rant_uses_requested_size() {
        let (mut bot, _) = scripted_bot(&["one fish", "two fish!", "red fish"], &test_config());

        let rant = bot.generate_rant(Some(3), false).expect("rant");
        assert_eq!(rant, "one fish. two fish! red fish.");
        assert_eq!(bot.previous_takes().count(), 3);

        assert!(bot.generate_rant(Some(0), false).is_none());
    }

    #[test]
    fn test_rant_repeats_unpunctuated_sentences() {
        let (mut bot, _) = scripted_bot(&["one fish"], &test_config());

        let rant = bot.generate_rant(Some(2), false).expect("rant");

        // "one fish" is checked against the logged "one fish." and passes.
        assert_eq!(rant, "one fish. one fish.");
        assert_eq!(bot.model.generator().calls(), 2);
        assert_eq!(bot.previous_takes().collect::<Vec<_>>(), vec!["one fish.", "one fish."]);
    }

    #[test]
    fn test_rant_fires_random_cooldown_only_when_triggered() {
        let mut config = test_config();
        config.bot.msgs_wait = 0;
        let lines = distinct_lines(40);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut bot, _) = scripted_bot(&refs, &config);

        bot.observe("hi", false);
        assert!(bot.is_ready(TriggerKind::Random));

        bot.generate_rant(Some(2), false).expect("rant");
        assert!(bot.is_ready(TriggerKind::Random));

        bot.generate_rant(Some(2), true).expect("rant");
        assert!(!bot.is_ready(TriggerKind::Random));
    }

    #[test]
    fn test_ensure_unique_is_bounded() {
        let (mut bot, _) = scripted_bot(&["same old take"], &test_config());
        bot.log_take("same old take");

        let take = bot.ensure_unique("same old take".to_string(), 5, None);

        assert_eq!(take, "same old take");
        assert_eq!(bot.model.generator().calls(), 5);
    }

    #[test]
    fn test_ensure_unique_returns_first_fresh_candidate() {
        let (mut bot, _) = scripted_bot(&["old", "new"], &test_config());
        bot.log_take("old");

        assert_eq!(bot.ensure_unique("old".to_string(), 20, None), "new");
        assert_eq!(bot.model.generator().calls(), 2);
        assert_eq!(bot.ensure_unique("fresh".to_string(), 20, None), "fresh");
    }

    #[test]
    fn test_reply_skips_uniqueness() {
        let (mut bot, _) = scripted_bot(&["only take"], &test_config());
        bot.log_take("only take");

        let reply = bot.generate_take(Some("hello bot"), false).expect("reply");

        assert_eq!(reply, "only take");
        assert_eq!(bot.model.generator().calls(), 1);
    }

    #[test]
    fn test_reply_prefixes_when_forced() {
        let mut config = test_config();
        config.chances.because = 1.0;
        config.chances.yes_no = 1.0;
        let (mut bot, _) = scripted_bot(&["cats purr loudly"], &config);

        let reply = bot.generate_take(Some("why do cats purr"), false).expect("reply");
        let words: Vec<&str> = reply.split(' ').collect();

        assert!(YES_NO_FILLERS.contains(&words[0].trim_end_matches(['.', ','])));
        assert!(BECAUSE_PREFIXES.contains(&words[1]));
        assert!(reply.ends_with("cats purr loudly"));
    }

    #[test]
    fn test_reply_prefixes_need_their_cue() {
        let mut config = test_config();
        config.chances.because = 1.0;
        config.chances.yes_no = 1.0;
        let (mut bot, _) = scripted_bot(&["cats purr loudly"], &config);

        // "do" past the second word is not a yes/no question.
        let reply = bot.generate_take(Some("tell me what to do"), false).expect("reply");
        assert_eq!(reply, "cats purr loudly");
    }

    #[test]
    fn test_reply_prefixes_suppressed_by_chance() {
        let (mut bot, _) = scripted_bot(&["cats purr loudly"], &test_config());

        let reply = bot.generate_take(Some("why do cats purr"), false).expect("reply");
        assert_eq!(reply, "cats purr loudly");
    }

    #[test]
    fn test_proactive_take_seeds_from_older_history() {
        let mut config = test_config();
        config.chances.seed_from_history = 1.0;
        config.chances.smart_reply = 1.0;
        let (mut bot, _) = scripted_bot(&["zebra stripes are neat", "something else entirely"], &config);

        bot.observe("i really think zebra stripes look good today", false);
        for _ in 0..5 {
            bot.observe("hi", false);
        }

        let take = bot.generate_take(None, false).expect("take");
        assert_eq!(take, "zebra stripes are neat");
        assert_eq!(bot.previous_takes().last(), Some("zebra stripes are neat"));
    }

    #[test]
    fn test_take_is_cleaned_and_suffixed() {
        let clock = ManualClock::new();
        let config = test_config();
        let mut bot: GuildBot<ScriptedGenerator> = GuildBot::with_runtime(
            7,
            &config,
            Arc::new(clock),
            Box::new(StdRng::seed_from_u64(1)),
            Arc::new(TakeFormatter::new("-bot")),
        )
        .expect("bot");
        bot.set_channel(Some(1));
        bot.model = Model::from_generator(
            ScriptedGenerator::new(&["look <@123>  here."]),
            ModelSettings::from_config(&config),
            bot.formatter.clone(),
        );

        assert_eq!(bot.generate_take(None, false).as_deref(), Some("look here -bot"));
    }

    #[test]
    fn test_cooldown_blocks_until_wait_elapses() {
        let mut config = test_config();
        config.bot.mention_wait_minutes = 2.0;
        config.bot.random_wait_minutes = 5.0;
        config.bot.msgs_wait = 2;
        let lines = distinct_lines(40);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut bot, clock) = scripted_bot(&refs, &config);

        bot.observe("first", false);
        assert!(bot.readiness.can_generate_unique_takes());
        assert!(bot.is_ready(TriggerKind::Mention));
        assert!(!bot.is_ready(TriggerKind::Random));

        bot.generate_take(Some("hello"), true).expect("reply");
        assert!(!bot.is_ready(TriggerKind::Mention));

        clock.advance_secs(119);
        bot.observe("second", false);
        assert!(!bot.is_ready(TriggerKind::Mention));
        assert!(bot.is_ready(TriggerKind::Random));

        bot.generate_take(None, true).expect("take");
        assert!(!bot.is_ready(TriggerKind::Random));
        assert_eq!(bot.readiness.messages_waited(), 0);

        clock.advance_secs(1);
        bot.observe("third", false);
        assert!(bot.is_ready(TriggerKind::Mention));
        assert!(!bot.is_ready(TriggerKind::Random));

        // Enough messages, not enough time.
        bot.observe("fourth", false);
        assert!(!bot.is_ready(TriggerKind::Random));

        clock.advance_secs(5 * 60);
        bot.observe("fifth", false);
        assert!(bot.is_ready(TriggerKind::Random));
    }

    #[test]
    fn test_fallback_reply_still_consumes_cooldown() {
        let mut config = test_config();
        config.bot.msgs_wait = 0;
        let lines = distinct_lines(40);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut bot, _) = scripted_bot(&refs, &config);
        bot.observe("hi", false);
        assert!(bot.is_ready(TriggerKind::Mention));

        bot.model = Model::from_generator(
            ScriptedGenerator::new(&[""]),
            ModelSettings::from_config(&config),
            bot.formatter.clone(),
        );
        let reply = bot.generate_take(Some("anyone?"), true).expect("fallback reply");

        assert_eq!(reply, "hmm");
        assert!(!bot.is_ready(TriggerKind::Mention));
    }

    #[test]
    fn test_degenerate_model_never_latches() {
        let (mut bot, _) = scripted_bot(&["same thing"], &test_config());

        for _ in 0..20 {
            bot.observe("hello", false);
        }

        assert!(!bot.readiness.can_generate_unique_takes());
        assert!(!bot.is_ready(TriggerKind::Mention));
        assert!(!bot.is_ready(TriggerKind::Random));
    }

    #[test]
    fn test_latch_survives_until_reset() {
        let config = test_config();
        let lines = distinct_lines(40);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (mut bot, _) = scripted_bot(&refs, &config);

        bot.observe("hello", false);
        assert!(bot.readiness.can_generate_unique_takes());

        bot.model = Model::from_generator(
            ScriptedGenerator::new(&["same thing"]),
            ModelSettings::from_config(&config),
            bot.formatter.clone(),
        );
        for _ in 0..10 {
            bot.observe("hello again", false);
            assert!(bot.readiness.can_generate_unique_takes());
        }
        assert_eq!(bot.model.generator().calls(), 0);

        bot.reset(2).expect("reset");
        assert!(!bot.readiness.can_generate_unique_takes());
    }

    #[test]
    fn test_observe_learns_only_long_allowed_messages() {
        let clock = ManualClock::new();
        let mut bot: GuildBot = bot_with(&test_config(), &clock);
        assert_eq!(bot.model().sentence_count(), 1);

        bot.observe("two words", true);
        assert_eq!(bot.model().sentence_count(), 1);

        bot.observe("three whole words", true);
        assert_eq!(bot.model().sentence_count(), 2);

        bot.observe("a message from a stranger", false);
        assert_eq!(bot.model().sentence_count(), 2);

        assert!(!bot.set_learning(None));
        bot.observe("learning is now switched off", true);
        assert_eq!(bot.model().sentence_count(), 2);
        assert_eq!(bot.recent_messages.front().map(String::as_str), Some("learning is now switched off"));
    }

    #[test]
    fn test_recent_messages_are_bounded() {
        let mut config = test_config();
        config.bot.max_recent_messages = 3;
        let (mut bot, _) = scripted_bot(&["x"], &config);

        for message in ["1", "2", "3", "4", "5"] {
            bot.observe(message, false);
        }

        assert_eq!(bot.recent_messages, VecDeque::from(["5".to_string(), "4".into(), "3".into()]));
    }

    fn training_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("tempdir");
        for (dataset, file, body) in [
            ("prophet", "verses.txt", "and so it was written in the sand\nthe tide came in at dawn\n"),
            ("movies", "a.txt", "i'll be back\nyou talking to me\n"),
            ("movies", "b.txt", "\n   \n"),
            ("users", "someone.txt", "hello from someone here\n"),
            ("users", "other.txt", "hello from another person\n"),
        ] {
            let dir = root.path().join(dataset);
            std::fs::create_dir_all(&dir).expect("mkdir");
            std::fs::write(dir.join(file), body).expect("write");
        }
        root
    }

    fn trainable_bot(root: &tempfile::TempDir) -> GuildBot {
        let mut config = test_config();
        config.training_root = root.path().to_path_buf();
        bot_with(&config, &ManualClock::new())
    }

    #[test]
    fn test_training_order_depends_on_dataset() {
        let root = training_root();
        let mut bot = trainable_bot(&root);

        let report = bot.train_full(Some("prophet"), None).expect("train");
        assert_eq!(report.state_size, 3);
        assert_eq!(bot.model().state_size(), 3);
        assert_eq!(report.lines_trained(), 2);
        assert!(bot.is_trained_on("prophet"));
        assert!(!bot.learn_enabled());

        let report = bot.train_full(Some("movies"), None).expect("train");
        assert_eq!(report.state_size, 2);
        assert_eq!(bot.model().state_size(), 2);
        assert!(bot.is_trained_on("movies"));
    }

    #[test]
    fn test_training_skips_unusable_files() {
        let root = training_root();
        let mut bot = trainable_bot(&root);

        let report = bot.train_full(Some("movies"), None).expect("train");

        assert_eq!(
            report.outcomes[0],
            FileOutcome::Trained {
                file: "a.txt".into(),
                lines: 2
            }
        );
        assert_eq!(report.skipped().map(|(file, _)| file).collect::<Vec<_>>(), vec!["b.txt"]);
        // init text plus the two movie lines
        assert_eq!(bot.model().sentence_count(), 3);
    }

    #[test]
    fn test_training_single_file() {
        let root = training_root();
        let mut bot = trainable_bot(&root);

        let report = bot.train_full(Some("users"), Some("someone.txt")).expect("train");

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.lines_trained(), 1);
        assert!(bot.is_trained_on("users"));
    }

    #[test]
    fn test_training_missing_dataset_leaves_bot_untouched() {
        let root = training_root();
        let mut bot = trainable_bot(&root);
        bot.observe("one two three four", true);

        let error = bot.train_full(Some("missing"), None).expect_err("must fail");

        assert!(matches!(error, Error::Training(TrainingError::DatasetNotFound { .. })));
        assert_eq!(bot.model().sentence_count(), 2);
        assert!(bot.learn_enabled());
        assert_eq!(bot.current_dataset(), None);
    }

    #[test]
    fn test_training_root_records_no_dataset() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::write(root.path().join("loose.txt"), "a loose corpus line\n").expect("write");
        let mut bot = trainable_bot(&root);

        let report = bot.train_full(None, None).expect("train");

        assert_eq!(report.lines_trained(), 1);
        assert_eq!(bot.current_dataset(), None);
        assert!(!bot.learn_enabled());
    }

    #[test]
    fn test_reset_restores_learning_and_order() {
        let root = training_root();
        let mut bot = trainable_bot(&root);
        bot.train_full(Some("prophet"), None).expect("train");

        bot.reset(2).expect("reset");

        assert_eq!(bot.model().state_size(), 2);
        assert_eq!(bot.model().sentence_count(), 1);
        assert!(bot.learn_enabled());
        assert_eq!(bot.current_dataset(), None);
    }

    #[test]
    fn test_settings_validation() {
        let (mut bot, _) = scripted_bot(&["x"], &test_config());

        assert!(bot.set_random_wait(-1.0).is_err());
        assert!(bot.set_mention_wait(f64::NAN).is_err());
        assert!(bot.set_rant_chance(150.0).is_err());

        bot.set_random_wait(0.5).expect("valid wait");
        bot.set_rant_chance(50.0).expect("valid chance");
        assert_eq!(bot.readiness().wait_minutes(TriggerKind::Random), 0.5);
        assert_eq!(bot.rant_chance_percent(), 50.0);

        assert!(bot.set_restricted_training(None));
        assert!(!bot.set_restricted_training(None));
        assert!(bot.set_restricted_training(Some(true)));
    }

    #[test]
    fn test_trigger_random_honors_rant_chance() {
        let mut config = test_config();
        config.bot.rant_size = 2;
        let (mut bot, _) = scripted_bot(&["one", "two", "three", "four"], &config);

        bot.set_rant_chance(100.0).expect("chance");
        assert_eq!(bot.trigger_random().as_deref(), Some("one. two."));

        bot.set_rant_chance(0.0).expect("chance");
        assert_eq!(bot.trigger_random().as_deref(), Some("three"));
    }

    #[test]
    fn test_cooldown_report_and_status() {
        let (mut bot, clock) = scripted_bot(&["x"], &test_config());
        bot.readiness.engage_latch();
        bot.generate_take(Some("hi"), true).expect("reply");
        clock.advance_secs(30);

        let mention = bot.cooldown(TriggerKind::Mention);
        assert_eq!(mention.remaining_secs, 90);
        assert_eq!(mention.remaining, "1:30");
        assert_eq!(mention.total, "2:00");
        assert_eq!(
            bot.cooldown_report(),
            "Random post cd: 0:00 of 5:00\nMention reply cd: 1:30 of 2:00"
        );

        let status = bot.to_string();
        assert!(status.contains("Sentences parsed: 1"));
        assert!(status.contains("Chain: 2"));
        assert!(status.contains("Data set: none"));
        assert!(status.contains("Mention reply cooldown: 1:30 of 2m"));
        assert!(status.ends_with("Rant size: 10"));
    }
}
