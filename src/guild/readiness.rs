//! Cooldown and readiness state for one guild.
//!
//! Each trigger kind is either blocked or ready. A kind only becomes ready
//! once its cooldown has elapsed and the readiness latch has engaged; firing
//! it blocks it again immediately.

use chrono::{DateTime, TimeDelta, Utc};

/// What caused the bot to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Reply to a message that mentions the bot.
    Mention,
    /// Unprompted take or rant.
    Random,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Mention => write!(f, "mention"),
            TriggerKind::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Readiness {
    mention_wait_minutes: f64,
    random_wait_minutes: f64,
    msgs_wait: u32,

    ready_for_mention: bool,
    ready_for_random: bool,
    last_mention: DateTime<Utc>,
    last_random: DateTime<Utc>,
    messages_waited: u32,

    /// One-way gate: set once the model has shown varied output.
    can_generate_unique_takes: bool,
}

impl Readiness {
    /// Both kinds start blocked with their cooldowns already elapsed.
    pub fn new(mention_wait_minutes: f64, random_wait_minutes: f64, msgs_wait: u32, now: DateTime<Utc>) -> Self {
        Self {
            mention_wait_minutes,
            random_wait_minutes,
            msgs_wait,
            ready_for_mention: false,
            ready_for_random: false,
            last_mention: now
                .checked_sub_signed(wait_duration(mention_wait_minutes))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            last_random: now
                .checked_sub_signed(wait_duration(random_wait_minutes))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            messages_waited: 0,
            can_generate_unique_takes: false,
        }
    }

    pub fn is_ready(&self, kind: TriggerKind) -> bool {
        match kind {
            TriggerKind::Mention => self.ready_for_mention,
            TriggerKind::Random => self.ready_for_random,
        }
    }

    pub fn can_generate_unique_takes(&self) -> bool {
        self.can_generate_unique_takes
    }

    pub fn messages_waited(&self) -> u32 {
        self.messages_waited
    }

    pub fn wait_minutes(&self, kind: TriggerKind) -> f64 {
        match kind {
            TriggerKind::Mention => self.mention_wait_minutes,
            TriggerKind::Random => self.random_wait_minutes,
        }
    }

    pub fn set_wait_minutes(&mut self, kind: TriggerKind, minutes: f64) {
        match kind {
            TriggerKind::Mention => self.mention_wait_minutes = minutes,
            TriggerKind::Random => self.random_wait_minutes = minutes,
        }
    }

    pub fn last_fired(&self, kind: TriggerKind) -> DateTime<Utc> {
        match kind {
            TriggerKind::Mention => self.last_mention,
            TriggerKind::Random => self.last_random,
        }
    }

    pub fn engage_latch(&mut self) {
        self.can_generate_unique_takes = true;
    }

    /// Disengage the latch. Ready flags drop with it.
    pub fn release_latch(&mut self) {
        self.can_generate_unique_takes = false;
        self.ready_for_mention = false;
        self.ready_for_random = false;
    }

    pub fn record_message(&mut self) {
        self.messages_waited = self.messages_waited.saturating_add(1);
    }

    /// Raise ready flags whose conditions now hold. Never lowers a flag.
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        if !self.can_generate_unique_takes {
            return;
        }

        if self.cooldown_elapsed(TriggerKind::Mention, now) {
            self.ready_for_mention = true;
        }

        if self.messages_waited >= self.msgs_wait && self.cooldown_elapsed(TriggerKind::Random, now) {
            self.ready_for_random = true;
        }
    }

    /// Consume the kind's cooldown slot: block it and restart its timer.
    pub fn fire(&mut self, kind: TriggerKind, now: DateTime<Utc>) {
        match kind {
            TriggerKind::Mention => {
                self.ready_for_mention = false;
                self.last_mention = now;
            }
            TriggerKind::Random => {
                self.ready_for_random = false;
                self.last_random = now;
                self.messages_waited = 0;
            }
        }
    }

    /// Whole seconds until the kind's cooldown elapses, zero when it already has.
    pub fn remaining_secs(&self, kind: TriggerKind, now: DateTime<Utc>) -> i64 {
        let elapsed = now.signed_duration_since(self.last_fired(kind));
        let wait = wait_duration(self.wait_minutes(kind));

        wait.checked_sub(&elapsed)
            .unwrap_or(wait)
            .num_seconds()
            .max(0)
    }

    fn cooldown_elapsed(&self, kind: TriggerKind, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_fired(kind)) >= wait_duration(self.wait_minutes(kind))
    }
}

fn wait_duration(minutes: f64) -> TimeDelta {
    let millis = (minutes.max(0.0) * 60_000.0).round();
    if millis >= i64::MAX as f64 {
        return TimeDelta::MAX;
    }
    TimeDelta::try_milliseconds(millis as i64).unwrap_or(TimeDelta::MAX)
}
