//! Configuration: run-policy defaults, caller overrides, backend settings.
//!
//! Defaults live in an explicit [`ThinkingStreamDefaults`] record. Callers
//! supply a [`ConfigOverrides`] whose set fields win over the defaults;
//! merging validates the result and has no side effects.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThinkingError};
use crate::strategy::SwitchStrategy;

/// Default per-segment generation cap, in tokens.
pub const DEFAULT_SEGMENT_MAX_TOKENS: u32 = 150;

/// Baseline run policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThinkingStreamDefaults {
    pub switch_strategy: SwitchStrategy,
    pub min_tokens_before_switch: usize,
    pub switch_probability: f64,
    pub enforce_min_tokens: bool,
    pub segment_max_tokens: u32,
}

/// The stock defaults: turn-based, 50-token floor (not enforced), 0.3.
pub const DEFAULTS: ThinkingStreamDefaults = ThinkingStreamDefaults {
    switch_strategy: SwitchStrategy::TurnBased,
    min_tokens_before_switch: 50,
    switch_probability: 0.3,
    enforce_min_tokens: false,
    segment_max_tokens: DEFAULT_SEGMENT_MAX_TOKENS,
};

impl Default for ThinkingStreamDefaults {
    fn default() -> Self {
        DEFAULTS
    }
}

/// Caller-supplied overrides; unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    pub switch_strategy: Option<SwitchStrategy>,
    pub min_tokens_before_switch: Option<usize>,
    pub switch_probability: Option<f64>,
    pub enforce_min_tokens: Option<bool>,
    pub segment_max_tokens: Option<u32>,
}

impl ConfigOverrides {
    /// Read overrides from `POLYTHINK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
            raw.map(|v| {
                v.trim()
                    .parse::<T>()
                    .map_err(|_| ThinkingError::Config(format!("{} has invalid value '{}'", key, v)))
            })
            .transpose()
        }

        Ok(Self {
            switch_strategy: lookup("POLYTHINK_STRATEGY")
                .map(|v| v.parse::<SwitchStrategy>())
                .transpose()?,
            min_tokens_before_switch: parse("POLYTHINK_MIN_TOKENS", lookup("POLYTHINK_MIN_TOKENS"))?,
            switch_probability: parse(
                "POLYTHINK_SWITCH_PROBABILITY",
                lookup("POLYTHINK_SWITCH_PROBABILITY"),
            )?,
            enforce_min_tokens: parse("POLYTHINK_ENFORCE_MIN_TOKENS", lookup("POLYTHINK_ENFORCE_MIN_TOKENS"))?,
            segment_max_tokens: parse("POLYTHINK_SEGMENT_TOKENS", lookup("POLYTHINK_SEGMENT_TOKENS"))?,
        })
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn layer(&self, other: &ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            switch_strategy: other.switch_strategy.or(self.switch_strategy),
            min_tokens_before_switch: other.min_tokens_before_switch.or(self.min_tokens_before_switch),
            switch_probability: other.switch_probability.or(self.switch_probability),
            enforce_min_tokens: other.enforce_min_tokens.or(self.enforce_min_tokens),
            segment_max_tokens: other.segment_max_tokens.or(self.segment_max_tokens),
        }
    }
}

impl ThinkingStreamDefaults {
    /// Merge overrides over these defaults and validate the result.
    pub fn merge(&self, overrides: &ConfigOverrides) -> Result<ThinkingStreamDefaults> {
        let merged = ThinkingStreamDefaults {
            switch_strategy: overrides.switch_strategy.unwrap_or(self.switch_strategy),
            min_tokens_before_switch: overrides
                .min_tokens_before_switch
                .unwrap_or(self.min_tokens_before_switch),
            switch_probability: overrides.switch_probability.unwrap_or(self.switch_probability),
            enforce_min_tokens: overrides.enforce_min_tokens.unwrap_or(self.enforce_min_tokens),
            segment_max_tokens: overrides.segment_max_tokens.unwrap_or(self.segment_max_tokens),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.switch_probability) {
            return Err(ThinkingError::Config(format!(
                "switch_probability must be in [0, 1], got {}",
                self.switch_probability
            )));
        }
        if self.segment_max_tokens == 0 {
            return Err(ThinkingError::Config("segment_max_tokens must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backend settings
// ---------------------------------------------------------------------------

/// Connection settings for the HTTP backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub temperature: Option<f64>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            organization: None,
            temperature: None,
            timeout_secs: 120,
        }
    }
}

impl BackendSettings {
    /// Read settings from the environment:
    ///
    /// - `OPENAI_API_KEY` — API key
    /// - `OPENAI_ORGANIZATION` — optional organization id
    /// - `POLYTHINK_MODEL` — model name (default `gpt-4o-mini`)
    /// - `POLYTHINK_BASE_URL` — API base URL
    /// - `POLYTHINK_TEMPERATURE` — sampling temperature
    /// - `POLYTHINK_TIMEOUT_SECS` — HTTP timeout (default 120)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let temperature = match lookup("POLYTHINK_TEMPERATURE") {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
                ThinkingError::Config(format!("POLYTHINK_TEMPERATURE has invalid value '{}'", raw))
            })?),
            None => None,
        };
        let timeout_secs = match lookup("POLYTHINK_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ThinkingError::Config(format!("POLYTHINK_TIMEOUT_SECS has invalid value '{}'", raw))
            })?,
            None => defaults.timeout_secs,
        };
        Ok(Self {
            model: lookup("POLYTHINK_MODEL").unwrap_or(defaults.model),
            base_url: lookup("POLYTHINK_BASE_URL").unwrap_or(defaults.base_url),
            api_key: lookup("OPENAI_API_KEY"),
            organization: lookup("OPENAI_ORGANIZATION"),
            temperature,
            timeout_secs,
        })
    }
}
