//! Tendency state — the persistent bias profile of a run.
//!
//! Four independent dimensions, each holding a free-text description rather
//! than a number. The state is replaced, never mutated in place: an
//! adjustment produces a new [`TendencyState`] that differs from the old one
//! in at most one dimension.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four fixed tendency dimensions, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TendencyDimension {
    /// Breadth vs. depth of exploration.
    Exploration,
    /// How readily claims are questioned.
    Skepticism,
    /// Concrete vs. abstract framing.
    Abstraction,
    /// Emotional coloring of the language.
    Expressiveness,
}

impl TendencyDimension {
    pub const ALL: [TendencyDimension; 4] = [
        Self::Exploration,
        Self::Skepticism,
        Self::Abstraction,
        Self::Expressiveness,
    ];

    /// Wire name, as used in the structured-output schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Skepticism => "skepticism",
            Self::Abstraction => "abstraction",
            Self::Expressiveness => "expressiveness",
        }
    }

    /// Label used in rendered prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exploration => "Exploration",
            Self::Skepticism => "Skepticism",
            Self::Abstraction => "Abstraction",
            Self::Expressiveness => "Expressiveness",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for TendencyDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing sentence appended to every rendered tendency fragment.
pub const TENDENCY_EXPLANATION: &str = "These tendencies color how you think; let them \
     shape your reasoning quietly without mentioning them.";

/// Current description for each of the four dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TendencyState {
    pub exploration: String,
    pub skepticism: String,
    pub abstraction: String,
    pub expressiveness: String,
}

impl Default for TendencyState {
    fn default() -> Self {
        Self {
            exploration: "balanced between exploring new angles and deepening existing ones".into(),
            skepticism: "balanced between trusting and questioning claims".into(),
            abstraction: "balanced between concrete examples and general principles".into(),
            expressiveness: "balanced between neutral and emotionally colored language".into(),
        }
    }
}

impl TendencyState {
    pub fn get(&self, dimension: TendencyDimension) -> &str {
        match dimension {
            TendencyDimension::Exploration => &self.exploration,
            TendencyDimension::Skepticism => &self.skepticism,
            TendencyDimension::Abstraction => &self.abstraction,
            TendencyDimension::Expressiveness => &self.expressiveness,
        }
    }

    /// A copy with one dimension replaced.
    pub fn with(&self, dimension: TendencyDimension, description: impl Into<String>) -> Self {
        let mut next = self.clone();
        let description = description.into();
        match dimension {
            TendencyDimension::Exploration => next.exploration = description,
            TendencyDimension::Skepticism => next.skepticism = description,
            TendencyDimension::Abstraction => next.abstraction = description,
            TendencyDimension::Expressiveness => next.expressiveness = description,
        }
        next
    }

    /// `(dimension, description)` pairs in render order.
    pub fn iter(&self) -> impl Iterator<Item = (TendencyDimension, &str)> {
        TendencyDimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Prompt fragment describing the current tendencies.
    pub fn render(&self) -> String {
        let mut out = String::from("Your current tendencies:\n");
        for (dimension, description) in self.iter() {
            out.push_str(&format!("- {}: {}\n", dimension.label(), description));
        }
        out.push_str(TENDENCY_EXPLANATION);
        out
    }
}

/// Decision on whether and how to shift one tendency dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TendencyAdjustment {
    pub should_adjust: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<TendencyDimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TendencyAdjustment {
    /// The "leave everything as is" decision.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn shift(
        dimension: TendencyDimension,
        new_description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            should_adjust: true,
            dimension: Some(dimension),
            new_description: Some(new_description.into()),
            reason: Some(reason.into()),
        }
    }
}

/// Apply an adjustment, returning the next state.
///
/// Identity unless `should_adjust` is set and both the dimension and the new
/// description are present; otherwise exactly one dimension changes.
pub fn apply_adjustment(state: &TendencyState, adjustment: &TendencyAdjustment) -> TendencyState {
    match (adjustment.should_adjust, adjustment.dimension, &adjustment.new_description) {
        (true, Some(dimension), Some(description)) => state.with(dimension, description.clone()),
        _ => state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_deterministic_and_complete() {
        let state = TendencyState::default();
        let rendered = state.render();
        assert_eq!(rendered, state.render());
        for (dimension, description) in state.iter() {
            assert!(rendered.contains(&format!("- {}: {}", dimension.label(), description)));
        }
        assert!(rendered.ends_with(TENDENCY_EXPLANATION));
    }

    #[test]
    fn test_render_order() {
        let rendered = TendencyState::default().render();
        let pos = |label: &str| rendered.find(label).unwrap();
        assert!(pos("Exploration") < pos("Skepticism"));
        assert!(pos("Skepticism") < pos("Abstraction"));
        assert!(pos("Abstraction") < pos("Expressiveness"));
    }

    #[test]
    fn test_apply_without_flag_is_identity() {
        let state = TendencyState::default();
        let adjustment = TendencyAdjustment {
            should_adjust: false,
            dimension: Some(TendencyDimension::Skepticism),
            new_description: Some("doubt everything".into()),
            reason: None,
        };
        assert_eq!(apply_adjustment(&state, &adjustment), state);
    }

    #[test]
    fn test_apply_missing_parts_is_identity() {
        let state = TendencyState::default();
        let no_dim = TendencyAdjustment {
            should_adjust: true,
            dimension: None,
            new_description: Some("x".into()),
            reason: None,
        };
        let no_desc = TendencyAdjustment {
            should_adjust: true,
            dimension: Some(TendencyDimension::Abstraction),
            new_description: None,
            reason: None,
        };
        assert_eq!(apply_adjustment(&state, &no_dim), state);
        assert_eq!(apply_adjustment(&state, &no_desc), state);
    }

    #[test]
    fn test_apply_changes_only_named_dimension() {
        let state = TendencyState::default();
        let adjustment = TendencyAdjustment::shift(
            TendencyDimension::Skepticism,
            "slightly more questioning of easy answers",
            "the reasoning accepted a claim without support",
        );
        let next = apply_adjustment(&state, &adjustment);

        assert_eq!(next.skepticism, "slightly more questioning of easy answers");
        for dimension in TendencyDimension::ALL {
            if dimension != TendencyDimension::Skepticism {
                assert_eq!(next.get(dimension).as_bytes(), state.get(dimension).as_bytes());
            }
        }
        // original untouched
        assert_eq!(state, TendencyState::default());
    }

    #[test]
    fn test_adjustment_serde_camel_case() {
        let json = r#"{"shouldAdjust":true,"dimension":"expressiveness","newDescription":"warmer","reason":"tone"}"#;
        let adj: TendencyAdjustment = serde_json::from_str(json).unwrap();
        assert_eq!(adj.dimension, Some(TendencyDimension::Expressiveness));
        assert_eq!(adj.new_description.as_deref(), Some("warmer"));

        let minimal: TendencyAdjustment = serde_json::from_str(r#"{"shouldAdjust":false}"#).unwrap();
        assert_eq!(minimal, TendencyAdjustment::none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"shouldAdjust":false,"confidence":0.2}"#;
        assert!(serde_json::from_str::<TendencyAdjustment>(json).is_err());
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let json = r#"{"shouldAdjust":true,"dimension":"courage"}"#;
        assert!(serde_json::from_str::<TendencyAdjustment>(json).is_err());
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!(TendencyDimension::parse("abstraction"), Some(TendencyDimension::Abstraction));
        assert_eq!(TendencyDimension::parse("Abstraction"), None);
        assert_eq!(TendencyDimension::Exploration.to_string(), "exploration");
    }
}
