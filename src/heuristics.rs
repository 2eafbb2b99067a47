//! Text heuristics shared by the engine: token estimate, completion markers
//! and final synthesis.

use crate::types::ThoughtSegment;

/// Hard ceiling on segments per run.
pub const MAX_ITERATIONS: usize = 6;

/// Completion never fires before this many segments exist.
pub const MIN_SEGMENTS_FOR_COMPLETION: usize = 3;

/// Lowercase substrings that signal a concluding segment.
pub const CONCLUSION_MARKERS: [&str; 6] = [
    "in conclusion",
    "to summarize",
    "my final thought",
    "therefore, i think",
    "so the answer is",
    "ultimately",
];

/// Separator between segments in the synthesized final thought.
pub const SEGMENT_JOINER: &str = "\n\n";

/// Rough token count: one token per four characters, rounded up.
///
/// Counts Unicode scalar values, not bytes. Not a tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Whether the text contains any conclusion marker (case-insensitive substring).
pub fn has_conclusion_marker(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CONCLUSION_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Completion check over the run so far.
///
/// True only when the newest segment carries a conclusion marker and at
/// least [`MIN_SEGMENTS_FOR_COMPLETION`] segments have been produced.
pub fn is_complete(segments: &[ThoughtSegment]) -> bool {
    match segments.last() {
        Some(last) => {
            segments.len() >= MIN_SEGMENTS_FOR_COMPLETION && has_conclusion_marker(&last.content)
        }
        None => false,
    }
}

/// Concatenate segment contents in order, separated by a blank line.
pub fn synthesize(segments: &[ThoughtSegment]) -> String {
    segments
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(SEGMENT_JOINER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(content: &str) -> ThoughtSegment {
        ThoughtSegment::new("analyst", content)
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
        // four multi-byte chars are still one token
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_marker_is_substring_and_case_insensitive() {
        assert!(has_conclusion_marker("So The Answer Is: Rust."));
        assert!(has_conclusion_marker("ultimately"));
        // substring, not whole word
        assert!(has_conclusion_marker("penultimately, we see"));
        assert!(!has_conclusion_marker("therefore I think")); // missing comma
        assert!(!has_conclusion_marker("no markers here"));
    }

    #[test]
    fn test_completion_requires_three_segments() {
        let two = vec![seg("a"), seg("In conclusion, yes.")];
        assert!(!is_complete(&two));

        let three = vec![seg("a"), seg("b"), seg("In conclusion, yes.")];
        assert!(is_complete(&three));

        let three_no_marker = vec![seg("a"), seg("in conclusion"), seg("c")];
        assert!(!is_complete(&three_no_marker));
        assert!(!is_complete(&[]));
    }

    #[test]
    fn test_synthesize_joins_with_blank_line() {
        let segments = vec![seg("First."), seg("Second."), seg("Third.")];
        assert_eq!(synthesize(&segments), "First.\n\nSecond.\n\nThird.");
        assert_eq!(synthesize(&[]), "");
    }
}
