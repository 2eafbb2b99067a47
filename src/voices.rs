//! Voice registry — the static catalog of cognitive framings.
//!
//! A [`Voice`] is a named behavioral framing applied to one generation
//! segment. The registry is an ordered, immutable catalog: ids are unique,
//! the catalog is never empty, and iteration order is the catalog order used
//! by turn-based switching.
//!
//! Custom catalogs can be loaded from YAML:
//!
//! ```yaml
//! voices:
//!   - id: analyst
//!     name: The Analyst
//!     tendency: Break the problem into parts and weigh evidence.
//!     triggers: [data, evidence]
//! ```

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThinkingError};
use crate::random::RandomSource;

/// A fixed cognitive framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Stable unique identifier.
    pub id: String,
    /// Display name, shown in separators.
    pub name: String,
    /// Prompt fragment describing how this voice thinks.
    pub tendency: String,
    /// Keywords that make this voice a good follow-up under semantic
    /// switching. Lowercased by [`VoiceRegistry::new`].
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tendency: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tendency: tendency.into(),
            triggers: Vec::new(),
        }
    }

    /// Builder: set semantic triggers (stored lowercase).
    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = triggers.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }
}

static BUILTIN_VOICES: Lazy<Vec<Voice>> = Lazy::new(|| {
    vec![
        Voice::new(
            "analyst",
            "The Analyst",
            "You reason carefully and logically. Break the question into parts, \
             weigh the evidence for each, and make your assumptions explicit.",
        )
        .with_triggers(["because", "evidence", "data", "cost", "compare", "measure"]),
        Voice::new(
            "dreamer",
            "The Dreamer",
            "You think associatively and imaginatively. Reach for analogies, \
             unexpected connections and possibilities nobody has mentioned yet.",
        )
        .with_triggers(["imagine", "what if", "possibility", "future", "could"]),
        Voice::new(
            "skeptic",
            "The Skeptic",
            "You doubt what has been said so far. Look for weak assumptions, \
             missing counterarguments and places where the reasoning is too confident.",
        )
        .with_triggers(["obviously", "clearly", "always", "never", "certain", "best"]),
        Voice::new(
            "pragmatist",
            "The Pragmatist",
            "You care about what actually works. Ground the discussion in concrete \
             steps, trade-offs and constraints of the real world.",
        )
        .with_triggers(["should", "plan", "time", "practical", "job", "learn"]),
        Voice::new(
            "empath",
            "The Empath",
            "You pay attention to feelings and people. Consider how the choice \
             affects the person asking and anyone else involved.",
        )
        .with_triggers(["feel", "worried", "enjoy", "people", "motivation", "stress"]),
    ]
});

/// Ordered, validated voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRegistry {
    voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    voices: Vec<Voice>,
}

impl VoiceRegistry {
    /// Build a registry, rejecting an empty catalog or duplicate ids.
    ///
    /// Triggers are lowercased here, whatever path the voices came from.
    pub fn new(mut voices: Vec<Voice>) -> Result<Self> {
        if voices.is_empty() {
            return Err(ThinkingError::Catalog("catalog must contain at least one voice".into()));
        }
        let mut seen = HashSet::new();
        for voice in &voices {
            if voice.id.trim().is_empty() {
                return Err(ThinkingError::Catalog("voice id cannot be empty".into()));
            }
            if !seen.insert(voice.id.as_str()) {
                return Err(ThinkingError::Catalog(format!("duplicate voice id '{}'", voice.id)));
            }
        }
        for voice in &mut voices {
            for trigger in &mut voice.triggers {
                *trigger = trigger.to_lowercase();
            }
        }
        Ok(Self { voices })
    }

    /// Parse a catalog from a YAML document with a top-level `voices:` list.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.voices)
    }

    /// Parse a catalog from a YAML file on disk.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The full catalog in order.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Look up a voice by id. `None` means the id is not in the catalog.
    pub fn lookup(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    /// Look up a voice, falling back to the first catalog voice on a miss.
    pub fn lookup_or_default(&self, id: &str) -> &Voice {
        match self.lookup(id) {
            Some(voice) => voice,
            None => {
                log::warn!("Unknown voice id '{}', falling back to '{}'", id, self.first().id);
                self.first()
            }
        }
    }

    /// Catalog position of a voice id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.voices.iter().position(|v| v.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// The deterministic default voice.
    pub fn first(&self) -> &Voice {
        &self.voices[0]
    }

    /// Uniform pick over the whole catalog.
    pub fn random_pick(&self, rng: &mut dyn RandomSource) -> &Voice {
        let index = rng.pick_index(self.voices.len());
        self.voices.get(index).unwrap_or_else(|| self.first())
    }
}

impl Default for VoiceRegistry {
    /// The built-in five-voice catalog.
    fn default() -> Self {
        Self {
            voices: BUILTIN_VOICES.clone(),
        }
    }
}
