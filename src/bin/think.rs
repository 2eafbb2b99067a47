//! `think` — stream a multi-voice chain of thought to the terminal.
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` — API key for the Chat Completions backend
//! - `POLYTHINK_MODEL` / `POLYTHINK_BASE_URL` / `POLYTHINK_TIMEOUT_SECS` — backend settings
//! - `POLYTHINK_STRATEGY` / `POLYTHINK_SWITCH_PROBABILITY` / `POLYTHINK_MIN_TOKENS` — run policy
//! - `RUST_LOG` — tracing filter (default: "info,polythink=debug")
//!
//! # Usage
//!
//! ```bash
//! think "Should I learn Rust or Go?"
//! think --strategy semantic --adaptive --pressure "answer quickly" "Is P = NP?"
//! think --dry-run --json "Anything"
//! ```

use std::sync::Arc;

use anyhow::Context;
use polythink::{
    BackendSettings, ConfigOverrides, GenerationBackend, OpenAiBackend, ScriptedBackend,
    StdoutSink, SwitchStrategy, TendencyMode, ThinkingStreamConfig, ThinkingStreamEngine,
    ThoughtSegment, VoiceRegistry,
};

const USAGE: &str = "Usage: think [--strategy random|turn-based|semantic] [--voices FILE.yaml] \
[--adaptive] [--pressure TEXT] [--dry-run] [--plain] [--json] QUESTION...";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    prompt: String,
    strategy: Option<SwitchStrategy>,
    voices_file: Option<String>,
    adaptive: bool,
    pressure: Option<String>,
    dry_run: bool,
    plain: bool,
    json: bool,
    help: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut words = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--strategy" | "-s" => {
                let value = iter.next().ok_or("--strategy needs a value")?;
                parsed.strategy = Some(value.parse().map_err(|e| format!("{}", e))?);
            }
            "--voices" => parsed.voices_file = Some(iter.next().ok_or("--voices needs a file")?),
            "--pressure" => parsed.pressure = Some(iter.next().ok_or("--pressure needs text")?),
            "--adaptive" => parsed.adaptive = true,
            "--dry-run" => parsed.dry_run = true,
            "--plain" => parsed.plain = true,
            "--json" => parsed.json = true,
            "--help" | "-h" => parsed.help = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            _ => words.push(arg),
        }
    }
    parsed.prompt = words.join(" ");
    if parsed.prompt.trim().is_empty() && !parsed.help {
        return Err("a question is required".into());
    }
    if parsed.pressure.is_some() && !parsed.adaptive {
        return Err("--pressure only applies with --adaptive".into());
    }
    Ok(parsed)
}

/// Canned segments for `--dry-run`.
fn dry_run_backend(prompt: &str) -> ScriptedBackend {
    let backend = ScriptedBackend::with_segments([
        format!("Let me break down \"{}\" into the parts that matter.", prompt),
        "What if the framing itself is the interesting part?".to_string(),
        "Are we sure the obvious answer holds up?".to_string(),
        "Ultimately, the right choice depends on what you want to get out of it.".to_string(),
    ]);
    for _ in 0..3 {
        backend.push_object(serde_json::json!({
            "shouldAdjust": false, "dimension": null, "newDescription": null, "reason": null
        }));
    }
    backend
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,polythink=debug".into()),
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {}\n{}", message, USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let registry = match args.voices_file {
        Some(ref path) => VoiceRegistry::from_yaml_file(path)
            .with_context(|| format!("loading voice catalog from {}", path))?,
        None => VoiceRegistry::default(),
    };

    let backend: Arc<dyn GenerationBackend> = if args.dry_run {
        Arc::new(dry_run_backend(&args.prompt))
    } else {
        let settings = BackendSettings::from_env()?;
        tracing::info!("Using model {} at {}", settings.model, settings.base_url);
        Arc::new(OpenAiBackend::new(settings)?)
    };

    let mut overrides = ConfigOverrides::from_env()?;
    if args.strategy.is_some() {
        overrides.switch_strategy = args.strategy;
    }
    let mut config = ThinkingStreamConfig::with_overrides(backend, &overrides)?;
    if args.adaptive {
        config = config.with_tendency_mode(TendencyMode::adaptive(args.pressure.clone()));
    }

    println!(
        "polythink {} — {} voices, {} switching — {}",
        polythink::VERSION,
        registry.len(),
        config.switch_strategy,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("Q: {}\n", args.prompt);

    let mut sink = if args.plain { StdoutSink::plain() } else { StdoutSink::new() };
    let mut on_segment = |segment: &ThoughtSegment| {
        tracing::debug!("segment by {} (~{} tokens)", segment.voice_id, segment.token_count);
    };

    let mut engine = ThinkingStreamEngine::new(Arc::new(registry));
    let result = engine
        .run(&args.prompt, &config, &mut sink, Some(&mut on_segment))
        .await?;

    println!("\n");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "[{} segments, ~{} tokens, voices: {}]",
            result.segments.len(),
            result.total_tokens(),
            result.voice_sequence().join(" → ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_prompt_words() {
        let parsed = parse_args(args(&["Should", "I", "learn", "Rust?"])).unwrap();
        assert_eq!(parsed.prompt, "Should I learn Rust?");
        assert_eq!(parsed.strategy, None);
    }

    #[test]
    fn test_parse_flags() {
        let parsed = parse_args(args(&[
            "--strategy", "semantic", "--adaptive", "--pressure", "hurry", "--json", "why",
        ]))
        .unwrap();
        assert_eq!(parsed.strategy, Some(SwitchStrategy::Semantic));
        assert!(parsed.adaptive && parsed.json);
        assert_eq!(parsed.pressure.as_deref(), Some("hurry"));
        assert_eq!(parsed.prompt, "why");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["--strategy"])).is_err());
        assert!(parse_args(args(&["--strategy", "loud", "q"])).is_err());
        assert!(parse_args(args(&["--bogus", "q"])).is_err());
        assert!(parse_args(args(&["--pressure", "x", "q"])).is_err());
        assert!(parse_args(args(&["--help"])).unwrap().help);
    }

    #[tokio::test]
    async fn test_dry_run_backend_completes_run() {
        let backend: Arc<dyn GenerationBackend> = Arc::new(dry_run_backend("q"));
        let config = ThinkingStreamConfig::new(backend)
            .with_tendency_mode(TendencyMode::adaptive(None));
        let mut engine = ThinkingStreamEngine::with_random(
            Arc::new(VoiceRegistry::default()),
            Box::new(polythink::SequenceRandom::indices(vec![0])),
        );
        let result = engine
            .run("q", &config, &mut polythink::NullSink, None)
            .await
            .unwrap();
        assert_eq!(result.segments.len(), 4);
        assert_eq!(result.final_tendency, Some(polythink::TendencyState::default()));
    }
}
