//! Voice switching strategies.
//!
//! [`SwitchStrategy`] is the configuration selector; each variant maps to a
//! [`VoiceSwitcher`] implementation. The set is closed: random, turn-based
//! and semantic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ThinkingError;
use crate::random::RandomSource;
use crate::types::ThoughtSegment;
use crate::voices::{Voice, VoiceRegistry};

/// Which policy chooses the next voice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchStrategy {
    /// Probability-gated uniform pick.
    Random,
    /// Next voice in catalog order, wrapping.
    #[default]
    TurnBased,
    /// Content-conditioned pick via voice triggers.
    Semantic,
}

impl SwitchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::TurnBased => "turn-based",
            Self::Semantic => "semantic",
        }
    }

    /// The switcher implementing this strategy.
    pub fn switcher(&self) -> &'static dyn VoiceSwitcher {
        static RANDOM: RandomSwitch = RandomSwitch;
        static TURN_BASED: TurnBasedSwitch = TurnBasedSwitch;
        static SEMANTIC: SemanticSwitch = SemanticSwitch;
        match self {
            Self::Random => &RANDOM,
            Self::TurnBased => &TURN_BASED,
            Self::Semantic => &SEMANTIC,
        }
    }
}

impl fmt::Display for SwitchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchStrategy {
    type Err = ThinkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "turn-based" | "turn_based" | "turnbased" => Ok(Self::TurnBased),
            "semantic" => Ok(Self::Semantic),
            other => Err(ThinkingError::Config(format!("unknown switch strategy '{}'", other))),
        }
    }
}

/// Inputs to one switching decision.
#[derive(Debug, Clone, Copy)]
pub struct SwitchContext<'a, 's> {
    pub registry: &'a VoiceRegistry,
    /// The voice that produced `last_segment`.
    pub current: &'a Voice,
    pub last_segment: &'s ThoughtSegment,
    /// Only read by the random strategy.
    pub switch_probability: f64,
}

/// A policy choosing the next active voice.
pub trait VoiceSwitcher: Send + Sync {
    fn next_voice<'a>(&self, ctx: &SwitchContext<'a, '_>, rng: &mut dyn RandomSource) -> &'a Voice;
}

/// With probability `switch_probability`, a uniform pick over the whole
/// catalog (possibly the current voice); otherwise the current voice.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSwitch;

impl VoiceSwitcher for RandomSwitch {
    fn next_voice<'a>(&self, ctx: &SwitchContext<'a, '_>, rng: &mut dyn RandomSource) -> &'a Voice {
        if rng.next_f64() < ctx.switch_probability {
            ctx.registry.random_pick(rng)
        } else {
            ctx.current
        }
    }
}

/// Next voice in catalog order, wrapping circularly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnBasedSwitch;

impl TurnBasedSwitch {
    /// Successor of `current` in `registry`; an unknown id restarts at the
    /// first voice.
    pub fn successor<'a>(registry: &'a VoiceRegistry, current: &Voice) -> &'a Voice {
        match registry.position(&current.id) {
            Some(index) => registry
                .get((index + 1) % registry.len())
                .unwrap_or_else(|| registry.first()),
            None => {
                log::warn!("Current voice '{}' not in catalog, restarting at first voice", current.id);
                registry.first()
            }
        }
    }
}

impl VoiceSwitcher for TurnBasedSwitch {
    fn next_voice<'a>(&self, ctx: &SwitchContext<'a, '_>, _rng: &mut dyn RandomSource) -> &'a Voice {
        Self::successor(ctx.registry, ctx.current)
    }
}

/// Picks the voice whose triggers best match the last segment.
///
/// Every voice other than the current one is scored by how many of its
/// triggers occur in the segment's lowercased text. The highest score wins,
/// earlier catalog position breaking ties. With no match anywhere this is
/// exactly turn-based switching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticSwitch;

impl SemanticSwitch {
    pub fn score(voice: &Voice, lowered: &str) -> usize {
        voice
            .triggers
            .iter()
            .filter(|t| !t.is_empty() && lowered.contains(t.as_str()))
            .count()
    }
}

impl VoiceSwitcher for SemanticSwitch {
    fn next_voice<'a>(&self, ctx: &SwitchContext<'a, '_>, _rng: &mut dyn RandomSource) -> &'a Voice {
        let lowered = ctx.last_segment.content.to_lowercase();
        let mut best: Option<(&'a Voice, usize)> = None;
        for voice in ctx.registry.voices() {
            if voice.id == ctx.current.id {
                continue;
            }
            let score = Self::score(voice, &lowered);
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((voice, score));
            }
        }
        match best {
            Some((voice, score)) => {
                log::debug!("Semantic switch to '{}' (score {})", voice.id, score);
                voice
            }
            None => TurnBasedSwitch::successor(ctx.registry, ctx.current),
        }
    }
}
