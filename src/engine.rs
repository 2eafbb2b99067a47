//! Thinking-stream engine — the segmented generation loop.
//!
//! One run drives at most [`MAX_ITERATIONS`] generation segments. Each
//! segment is produced under one active voice, streamed chunk by chunk to
//! the output sink, then recorded. After each segment the engine checks the
//! completion heuristic and, if the run is not finished, picks the next
//! voice through the configured [`SwitchStrategy`].
//!
//! # Run lifecycle
//!
//! ```text
//! Init: random starting voice, no segments
//!   ↓
//! Generate: system prompt (voice + question + history) → stream → sink
//!   ↓
//! Record: push segment, fire per-segment callback
//!   ↓
//! Complete? (marker in newest segment AND ≥ 3 segments) ── yes → Terminal
//!   ↓ no
//! Switch: strategy picks next voice, separator → sink ── back to Generate
//!   ↓ (ceiling reached)
//! Terminal: final thought = segments joined by a blank line
//! ```
//!
//! Iterations are strictly sequential; the streaming call is the only
//! suspension point. Backend errors propagate to the caller untouched and
//! discard the run; segments already handed to the callback survive.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::backend::{GenerationBackend, StreamChunk, StreamRequest};
use crate::config::{ConfigOverrides, ThinkingStreamDefaults, DEFAULTS};
use crate::error::{Result, ThinkingError};
use crate::heuristics::{is_complete, synthesize, MAX_ITERATIONS};
use crate::metacognition::{observe_and_apply, MetaCognitionInput};
use crate::random::{RandomSource, StdRandom};
use crate::sink::OutputSink;
use crate::strategy::{SwitchContext, SwitchStrategy};
use crate::tendency::TendencyState;
use crate::types::{ThinkingResult, ThoughtSegment};
use crate::voices::{Voice, VoiceRegistry};

/// User turn for the first segment.
pub const STARTING_CUE: &str = "Begin thinking.";

/// User turn for every later segment.
pub const CONTINUING_CUE: &str = "Continue thinking.";

/// Natural pause points at which a segment stops.
pub const STOP_SEQUENCES: [&str; 2] = ["\n\n", "---"];

/// Default number of recent segments shown to the observer in adaptive mode.
pub const DEFAULT_OBSERVER_WINDOW: usize = 3;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the tendency profile takes part in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TendencyMode {
    /// Tendencies never touch generation.
    #[default]
    Off,
    /// A fixed profile rendered into every system prompt.
    Static(TendencyState),
    /// The observer runs after every non-final segment; its adjustment is
    /// applied and the new profile is rendered into the next prompt.
    Adaptive {
        initial: TendencyState,
        external_pressure: Option<String>,
        /// How many recent segments the observer sees.
        window: usize,
    },
}

impl TendencyMode {
    /// Adaptive mode from the default balanced profile.
    pub fn adaptive(external_pressure: Option<String>) -> Self {
        Self::Adaptive {
            initial: TendencyState::default(),
            external_pressure,
            window: DEFAULT_OBSERVER_WINDOW,
        }
    }

    fn initial_state(&self) -> Option<TendencyState> {
        match self {
            Self::Off => None,
            Self::Static(state) => Some(state.clone()),
            Self::Adaptive { initial, .. } => Some(initial.clone()),
        }
    }
}

/// Run-level policy. Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct ThinkingStreamConfig {
    pub backend: Arc<dyn GenerationBackend>,
    pub switch_strategy: SwitchStrategy,
    /// Token floor before a switch; only honored when `enforce_min_tokens`.
    pub min_tokens_before_switch: usize,
    /// Only read by the random strategy.
    pub switch_probability: f64,
    pub enforce_min_tokens: bool,
    pub segment_max_tokens: u32,
    pub tendency_mode: TendencyMode,
}

impl ThinkingStreamConfig {
    /// Config with the stock defaults.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::from_policy(backend, DEFAULTS)
    }

    /// Defaults merged under the given overrides.
    pub fn with_overrides(
        backend: Arc<dyn GenerationBackend>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        Ok(Self::from_policy(backend, DEFAULTS.merge(overrides)?))
    }

    pub fn from_policy(backend: Arc<dyn GenerationBackend>, policy: ThinkingStreamDefaults) -> Self {
        Self {
            backend,
            switch_strategy: policy.switch_strategy,
            min_tokens_before_switch: policy.min_tokens_before_switch,
            switch_probability: policy.switch_probability,
            enforce_min_tokens: policy.enforce_min_tokens,
            segment_max_tokens: policy.segment_max_tokens,
            tendency_mode: TendencyMode::Off,
        }
    }

    pub fn with_strategy(mut self, strategy: SwitchStrategy) -> Self {
        self.switch_strategy = strategy;
        self
    }

    pub fn with_tendency_mode(mut self, mode: TendencyMode) -> Self {
        self.tendency_mode = mode;
        self
    }

    fn validate(&self) -> Result<()> {
        ThinkingStreamDefaults {
            switch_strategy: self.switch_strategy,
            min_tokens_before_switch: self.min_tokens_before_switch,
            switch_probability: self.switch_probability,
            enforce_min_tokens: self.enforce_min_tokens,
            segment_max_tokens: self.segment_max_tokens,
        }
        .validate()?;
        if let TendencyMode::Adaptive { window: 0, .. } = self.tendency_mode {
            return Err(ThinkingError::Config("observer window must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompt building
// ---------------------------------------------------------------------------

/// System prompt for one segment.
///
/// The history section is omitted entirely when there are no prior segments.
pub fn build_system_prompt(
    voice: &Voice,
    original_prompt: &str,
    history: &[ThoughtSegment],
    tendency: Option<&TendencyState>,
) -> String {
    let mut prompt = format!(
        "{}\n\nYou are thinking about the following question:\n{}\n",
        voice.tendency, original_prompt
    );
    if !history.is_empty() {
        prompt.push_str("\nYour thoughts so far:\n");
        prompt.push_str(&synthesize(history));
        prompt.push('\n');
    }
    if let Some(state) = tendency {
        prompt.push('\n');
        prompt.push_str(&state.render());
        prompt.push('\n');
    }
    prompt.push_str(
        "\nContinue your stream of thought in a few sentences. Think out loud, build on \
         what came before, and do not repeat yourself.",
    );
    prompt
}

/// User turn for the segment at `iteration` (zero-based).
pub fn continuation_cue(iteration: usize) -> &'static str {
    if iteration == 0 {
        STARTING_CUE
    } else {
        CONTINUING_CUE
    }
}

/// Separator written to the sink before the next voice speaks.
pub fn voice_separator(voice: &Voice) -> String {
    format!("\n\n~ {} ~\n\n", voice.name)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives thinking runs over a shared voice catalog.
///
/// The random source is owned per engine; use one engine per concurrent run.
pub struct ThinkingStreamEngine {
    registry: Arc<VoiceRegistry>,
    rng: Box<dyn RandomSource>,
}

impl std::fmt::Debug for ThinkingStreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThinkingStreamEngine")
            .field("voices", &self.registry.len())
            .finish()
    }
}

impl ThinkingStreamEngine {
    /// Engine with an entropy-seeded random source.
    pub fn new(registry: Arc<VoiceRegistry>) -> Self {
        Self::with_random(registry, Box::new(StdRandom::from_entropy()))
    }

    /// Engine with an injected random source.
    pub fn with_random(registry: Arc<VoiceRegistry>, rng: Box<dyn RandomSource>) -> Self {
        Self { registry, rng }
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    /// Run the loop for one question.
    ///
    /// Every generated chunk and separator goes to `sink` in arrival order.
    /// `on_segment` is called synchronously once per completed segment.
    pub async fn run(
        &mut self,
        original_prompt: &str,
        config: &ThinkingStreamConfig,
        sink: &mut dyn OutputSink,
        mut on_segment: Option<&mut (dyn FnMut(&ThoughtSegment) + Send)>,
    ) -> Result<ThinkingResult> {
        config.validate()?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let registry = Arc::clone(&self.registry);
        let switcher = config.switch_strategy.switcher();
        let backend = config.backend.as_ref();

        let mut current: &Voice = registry.random_pick(self.rng.as_mut());
        let mut segments: Vec<ThoughtSegment> = Vec::new();
        let mut tendency = config.tendency_mode.initial_state();
        let mut tokens_under_voice = 0usize;

        log::info!(
            "Thinking run {} started: strategy={}, voices={}, first voice={}",
            run_id,
            config.switch_strategy,
            registry.len(),
            current.id
        );

        for iteration in 0..MAX_ITERATIONS {
            let request = StreamRequest {
                system: build_system_prompt(current, original_prompt, &segments, tendency.as_ref()),
                prompt: continuation_cue(iteration).to_string(),
                max_tokens: config.segment_max_tokens,
                stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            };

            let raw = Self::stream_segment(backend, request, sink).await?;
            let segment = ThoughtSegment::new(current.id.clone(), &raw);
            log::debug!(
                "Run {} segment {} by '{}': ~{} tokens",
                run_id,
                iteration + 1,
                segment.voice_id,
                segment.token_count
            );
            tokens_under_voice += segment.token_count;
            segments.push(segment);

            if let (Some(callback), Some(segment)) = (on_segment.as_deref_mut(), segments.last()) {
                callback(segment);
            }

            if is_complete(&segments) {
                log::debug!("Run {} reached a conclusion after {} segments", run_id, segments.len());
                break;
            }
            if iteration + 1 == MAX_ITERATIONS {
                log::debug!("Run {} hit the iteration ceiling", run_id);
                break;
            }

            if let TendencyMode::Adaptive { external_pressure, window, .. } = &config.tendency_mode {
                let start = segments.len().saturating_sub(*window);
                let input = MetaCognitionInput {
                    recent_thoughts: segments[start..].iter().map(|s| s.content.clone()).collect(),
                    current_tendency: tendency.clone().unwrap_or_default(),
                    original_prompt: original_prompt.to_string(),
                    external_pressure: external_pressure.clone(),
                };
                let (next_state, _) = observe_and_apply(backend, &input).await?;
                tendency = Some(next_state);
            }

            let next = match segments.last() {
                Some(last)
                    if !(config.enforce_min_tokens
                        && tokens_under_voice < config.min_tokens_before_switch) =>
                {
                    let ctx = SwitchContext {
                        registry: registry.as_ref(),
                        current,
                        last_segment: last,
                        switch_probability: config.switch_probability,
                    };
                    switcher.next_voice(&ctx, self.rng.as_mut())
                }
                _ => {
                    log::debug!(
                        "Run {} keeps '{}' ({} of {} tokens)",
                        run_id,
                        current.id,
                        tokens_under_voice,
                        config.min_tokens_before_switch
                    );
                    current
                }
            };
            if next.id != current.id {
                tokens_under_voice = 0;
            }
            log::debug!("Run {} switching {} -> {}", run_id, current.id, next.id);
            sink.write_separator(&voice_separator(next))?;
            current = next;
        }

        let final_thought = synthesize(&segments);
        let final_tendency = match config.tendency_mode {
            TendencyMode::Off => None,
            _ => tendency,
        };
        log::info!(
            "Thinking run {} finished: {} segments, ~{} tokens",
            run_id,
            segments.len(),
            segments.iter().map(|s| s.token_count).sum::<usize>()
        );

        Ok(ThinkingResult {
            run_id,
            segments,
            final_thought,
            final_tendency,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Stream one segment, forwarding each delta to the sink as it arrives.
    async fn stream_segment(
        backend: &dyn GenerationBackend,
        request: StreamRequest,
        sink: &mut dyn OutputSink,
    ) -> Result<String> {
        let mut receiver = backend.stream_text(request).await?;
        let mut buffer = String::new();
        while let Some(chunk) = receiver.next().await {
            match chunk {
                StreamChunk::TextDelta { text } => {
                    buffer.push_str(&text);
                    sink.write(&text)?;
                }
                StreamChunk::Done => break,
                StreamChunk::Error { message } => return Err(ThinkingError::Backend(message)),
            }
        }
        Ok(buffer)
    }
}

/// Run with the built-in catalog and an entropy-seeded random source.
pub async fn run_thinking_stream(
    original_prompt: &str,
    config: &ThinkingStreamConfig,
    sink: &mut dyn OutputSink,
    on_segment: Option<&mut (dyn FnMut(&ThoughtSegment) + Send)>,
) -> Result<ThinkingResult> {
    let mut engine = ThinkingStreamEngine::new(Arc::new(VoiceRegistry::default()));
    engine.run(original_prompt, config, sink, on_segment).await
}
