//! Meta-cognition observer.
//!
//! Watches recent reasoning and decides whether one tendency dimension
//! should shift. The observer never produces reasoning itself: it asks the
//! backend for a single structured [`TendencyAdjustment`].
//!
//! Subtlety is requested in the prompt, not enforced: a drastic adjustment
//! returned by the backend is passed through as-is. A value that does not
//! fit the schema is a hard [`ThinkingError::SchemaViolation`], never
//! retried and never partially applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{GenerationBackend, ObjectSchema};
use crate::error::{Result, ThinkingError};
use crate::tendency::{apply_adjustment, TendencyAdjustment, TendencyDimension, TendencyState};

/// Name reported for the adjustment schema.
pub const ADJUSTMENT_SCHEMA_NAME: &str = "tendency_adjustment";

/// Line used when no external pressure was supplied.
pub const NO_EXTERNAL_PRESSURE: &str = "No external pressure was given.";

/// What the observer looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaCognitionInput {
    /// Recent reasoning segments, oldest first.
    pub recent_thoughts: Vec<String>,
    pub current_tendency: TendencyState,
    pub original_prompt: String,
    /// Optional hint from outside the run (e.g. "the user wants a decision fast").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_pressure: Option<String>,
}

/// JSON schema of [`TendencyAdjustment`].
///
/// Strict-mode compatible: every property is required and the optional
/// ones are nullable.
pub fn adjustment_schema() -> ObjectSchema {
    let dimensions: Vec<&str> = TendencyDimension::ALL.iter().map(|d| d.as_str()).collect();
    let mut dimension_enum: Vec<Value> = dimensions.iter().map(|d| Value::from(*d)).collect();
    dimension_enum.push(Value::Null);

    ObjectSchema::new(
        ADJUSTMENT_SCHEMA_NAME,
        serde_json::json!({
            "type": "object",
            "properties": {
                "shouldAdjust": {
                    "type": "boolean",
                    "description": "Whether any tendency should shift right now."
                },
                "dimension": {
                    "type": ["string", "null"],
                    "enum": dimension_enum,
                    "description": "The single dimension to shift."
                },
                "newDescription": {
                    "type": ["string", "null"],
                    "description": "The new description for that dimension."
                },
                "reason": {
                    "type": ["string", "null"],
                    "description": "Why the shift is warranted."
                }
            },
            "required": ["shouldAdjust", "dimension", "newDescription", "reason"],
            "additionalProperties": false
        }),
    )
}

/// Build the observer prompt.
pub fn build_observer_prompt(input: &MetaCognitionInput) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are the meta-cognitive observer of a reasoning process. Your role is to watch \
         the thinking, not to think. Do not answer the question yourself.\n\n",
    );
    prompt.push_str(&format!("The question being reasoned about:\n{}\n\n", input.original_prompt));

    prompt.push_str("Current tendencies:\n");
    for (dimension, description) in input.current_tendency.iter() {
        prompt.push_str(&format!("- {}: {}\n", dimension.as_str(), description));
    }
    prompt.push('\n');

    match input.external_pressure.as_deref() {
        Some(pressure) => prompt.push_str(&format!("External pressure: {}\n\n", pressure)),
        None => prompt.push_str(&format!("{}\n\n", NO_EXTERNAL_PRESSURE)),
    }

    prompt.push_str("Recent thoughts:\n");
    if input.recent_thoughts.is_empty() {
        prompt.push_str("(none yet)\n");
    }
    for (i, thought) in input.recent_thoughts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, thought));
    }

    prompt.push_str(
        "\nDecide whether exactly one tendency should shift. Adjustments should be rare and \
         subtle: prefer no change, and when you do change a dimension, nudge its description \
         slightly rather than reversing it.",
    );
    prompt
}

/// Interpret a structured-output value as an adjustment.
pub fn parse_adjustment(value: Value) -> Result<TendencyAdjustment> {
    if !value.is_object() {
        return Err(ThinkingError::SchemaViolation(format!(
            "expected an object, got {}",
            value
        )));
    }
    if !value.get("shouldAdjust").is_some_and(Value::is_boolean) {
        return Err(ThinkingError::SchemaViolation(
            "missing boolean field 'shouldAdjust'".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| ThinkingError::SchemaViolation(e.to_string()))
}

/// Ask the backend whether a tendency should shift.
pub async fn observe(
    backend: &dyn GenerationBackend,
    input: &MetaCognitionInput,
) -> Result<TendencyAdjustment> {
    let prompt = build_observer_prompt(input);
    let value = backend.generate_object(&prompt, &adjustment_schema()).await?;
    let adjustment = parse_adjustment(value)?;
    if adjustment.should_adjust {
        log::info!(
            "Meta-cognition suggests shifting {:?}: {:?}",
            adjustment.dimension,
            adjustment.reason
        );
    } else {
        log::debug!("Meta-cognition suggests no adjustment");
    }
    Ok(adjustment)
}

/// Observe, then apply the decision to the input's tendency state.
pub async fn observe_and_apply(
    backend: &dyn GenerationBackend,
    input: &MetaCognitionInput,
) -> Result<(TendencyState, TendencyAdjustment)> {
    let adjustment = observe(backend, input).await?;
    let next = apply_adjustment(&input.current_tendency, &adjustment);
    Ok((next, adjustment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn input(pressure: Option<&str>) -> MetaCognitionInput {
        MetaCognitionInput {
            recent_thoughts: vec!["Rust has a steep curve.".into(), "Go is simpler.".into()],
            current_tendency: TendencyState::default(),
            original_prompt: "Should I learn Rust or Go?".into(),
            external_pressure: pressure.map(String::from),
        }
    }

    #[test]
    fn test_prompt_structure() {
        let prompt = build_observer_prompt(&input(None));
        assert!(prompt.contains("watch the thinking, not to think"));
        assert!(prompt.contains(NO_EXTERNAL_PRESSURE));
        assert!(prompt.contains("1. Rust has a steep curve."));
        assert!(prompt.contains("2. Go is simpler."));
        assert!(prompt.find("1. Rust").unwrap() < prompt.find("2. Go").unwrap());
        for (dimension, description) in TendencyState::default().iter() {
            assert!(prompt.contains(&format!("- {}: {}", dimension.as_str(), description)));
        }
        assert!(prompt.contains("Should I learn Rust or Go?"));
    }

    #[test]
    fn test_prompt_includes_pressure_verbatim() {
        let prompt = build_observer_prompt(&input(Some("The user is in a hurry!")));
        assert!(prompt.contains("The user is in a hurry!"));
        assert!(!prompt.contains(NO_EXTERNAL_PRESSURE));
    }

    #[test]
    fn test_schema_enumerates_exactly_four_dimensions() {
        let schema = adjustment_schema();
        let values = schema.schema["properties"]["dimension"]["enum"].as_array().unwrap();
        let names: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
        assert_eq!(names, vec!["exploration", "skepticism", "abstraction", "expressiveness"]);
        assert_eq!(schema.schema["properties"]["shouldAdjust"]["type"], "boolean");
        assert_eq!(schema.name, ADJUSTMENT_SCHEMA_NAME);
    }

    #[test]
    fn test_parse_adjustment_accepts_nulls() {
        let value = serde_json::json!({
            "shouldAdjust": false, "dimension": null, "newDescription": null, "reason": null
        });
        assert_eq!(parse_adjustment(value).unwrap(), TendencyAdjustment::none());
    }

    #[test]
    fn test_parse_adjustment_violations() {
        for bad in [
            serde_json::json!("yes"),
            serde_json::json!({"dimension": "skepticism"}),
            serde_json::json!({"shouldAdjust": "true"}),
            serde_json::json!({"shouldAdjust": true, "dimension": "bravery"}),
            serde_json::json!({
                "shouldAdjust": true,
                "dimension": "skepticism",
                "newDescription": "x",
                "reason": null,
                "dimensions": ["skepticism", "abstraction"],
                "confidence": 0.2
            }),
        ] {
            let err = parse_adjustment(bad).unwrap_err();
            assert!(matches!(err, ThinkingError::SchemaViolation(_)));
        }
    }

    #[tokio::test]
    async fn test_observe_and_apply() {
        let backend = ScriptedBackend::new();
        backend.push_object(serde_json::json!({
            "shouldAdjust": true,
            "dimension": "abstraction",
            "newDescription": "leaning a little toward concrete examples",
            "reason": "the thoughts are drifting into generalities"
        }));

        let input = input(None);
        let (next, adjustment) = observe_and_apply(&backend, &input).await.unwrap();
        assert!(adjustment.should_adjust);
        assert_eq!(next.abstraction, "leaning a little toward concrete examples");
        assert_eq!(next.skepticism, input.current_tendency.skepticism);
        assert_eq!(backend.object_prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_drastic_adjustment_applied_verbatim() {
        let backend = ScriptedBackend::new();
        let reversal = "trust every claim immediately and never question anything";
        backend.push_object(serde_json::json!({
            "shouldAdjust": true,
            "dimension": "skepticism",
            "newDescription": reversal,
            "reason": "the user wants speed"
        }));

        let input = input(Some("answer now"));
        let (next, adjustment) = observe_and_apply(&backend, &input).await.unwrap();
        assert_eq!(adjustment.new_description.as_deref(), Some(reversal));
        assert_eq!(next.skepticism, reversal);
        assert_eq!(next, input.current_tendency.with(TendencyDimension::Skepticism, reversal));
    }

    #[tokio::test]
    async fn test_observe_propagates_schema_violation() {
        let backend = ScriptedBackend::new();
        backend.push_object(serde_json::json!({"should": "maybe"}));
        let err = observe(&backend, &input(None)).await.unwrap_err();
        assert!(matches!(err, ThinkingError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_observe_propagates_backend_error() {
        let backend = ScriptedBackend::new();
        let err = observe(&backend, &input(None)).await.unwrap_err();
        assert!(err.is_backend());
    }
}
