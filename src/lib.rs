//! # polythink
//!
//! Segmented, multi-voice chain-of-thought orchestration on top of a text
//! generation backend.
//!
//! A run repeatedly invokes the backend under different behavioral framings
//! ("voices"), streams every chunk to an output sink, stitches the segments
//! into one narrative and stops once the reasoning concludes or a hard
//! iteration ceiling is reached. A meta-cognition observer can watch the
//! reasoning and nudge a four-dimension tendency profile that biases later
//! segments.
//!
//! ```text
//! VoiceRegistry ──► ThinkingStreamEngine ──► GenerationBackend (stream_text)
//!                        │      ▲                    │
//!                        │      └── SwitchStrategy   ▼
//!                        │                       OutputSink
//!                        ▼
//!        MetaCognition observer (generate_object) ──► TendencyState
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod metacognition;
pub mod random;
pub mod sink;
pub mod strategy;
pub mod tendency;
pub mod types;
pub mod voices;

// Re-exports
pub use backend::{GenerationBackend, ObjectSchema, OpenAiBackend, ScriptedBackend, StreamRequest};
pub use config::{BackendSettings, ConfigOverrides, ThinkingStreamDefaults, DEFAULTS};
pub use engine::{run_thinking_stream, TendencyMode, ThinkingStreamConfig, ThinkingStreamEngine};
pub use error::{Result, ThinkingError};
pub use metacognition::{observe, observe_and_apply, MetaCognitionInput};
pub use random::{RandomSource, SequenceRandom, StdRandom};
pub use sink::{BufferSink, NullSink, OutputSink, StdoutSink};
pub use strategy::{SwitchStrategy, VoiceSwitcher};
pub use tendency::{apply_adjustment, TendencyAdjustment, TendencyDimension, TendencyState};
pub use types::{ThinkingResult, ThoughtSegment};
pub use voices::{Voice, VoiceRegistry};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
