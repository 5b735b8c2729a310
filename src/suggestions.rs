//! # Suggestion parsing
//!
//! Extracts N candidate reply texts from a single model generation. The
//! model is asked for labeled options (`Response 1: ...`) but real output
//! drifts, so parsing runs three strategies in order, each weaker and more
//! forgiving than the last:
//!
//! 1. labeled segments — text between numeric labels, optionally prefixed
//!    with the word "Response";
//! 2. paragraph split — blank-line or numbered-line boundaries, leading
//!    label tokens stripped, duplicates dropped;
//! 3. equal word slices — the raw text cut into N roughly equal chunks.
//!
//! Whatever the strategies produce, [`parse_suggestions`] always returns
//! exactly `n` entries: short segments (20 characters or fewer) are
//! rejected, and a shortfall is padded by repeating the last suggestion, or
//! a generic acknowledgment when nothing parsed at all.

use once_cell::sync::Lazy;
use regex::Regex;

const MIN_SEGMENT_CHARS: usize = 20;
const FALLBACK_ACK: &str = "I understand your inquiry and will help you with that.";

/// `Response 3:` / `2.` / `1 -` style labels.
static LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:response\s+)?\d+[:.\s-]+").unwrap());

/// A blank line, or a newline directly followed by a numbered line.
static BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n|\n\d+[.)]").unwrap());

/// Leading label token on a stripped paragraph.
static LEADING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:response\s+)?\d+[:.\s-]+").unwrap());

/// Strategy 1: the text between one numeric label and the next (or end of
/// input). Only segments longer than 20 characters count.
fn labeled_segments(text: &str) -> Vec<String> {
    let labels: Vec<_> = LABEL.find_iter(text).collect();
    let mut segments = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        let end = labels.get(i + 1).map_or(text.len(), |next| next.start());
        let segment = text[label.end()..end].trim();
        if segment.len() > MIN_SEGMENT_CHARS {
            segments.push(segment.to_string());
        }
    }
    segments
}

/// Strategy 2: split on paragraph boundaries, strip any leading label, drop
/// short and duplicate parts.
fn paragraph_segments(text: &str, existing: &[String], n: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    for boundary in BOUNDARY.find_iter(text) {
        parts.push(&text[start..boundary.start()]);
        // A numbered-line boundary only consumes the newline; the label
        // stays with the next part and is stripped below.
        let matched = boundary.as_str();
        start = if matched.trim_start_matches('\n').starts_with(|c: char| c.is_ascii_digit()) {
            boundary.start() + 1
        } else {
            boundary.end()
        };
    }
    parts.push(&text[start..]);

    let mut segments = Vec::new();
    for part in parts {
        let stripped = LEADING_LABEL.replace(part.trim(), "");
        let stripped = stripped.trim();
        if stripped.len() > MIN_SEGMENT_CHARS
            && !existing.iter().any(|s| s == stripped)
            && !segments.iter().any(|s: &String| s == stripped)
        {
            segments.push(stripped.to_string());
            if existing.len() + segments.len() >= n {
                break;
            }
        }
    }
    segments
}

/// Strategy 3: cut the raw text into `n` roughly equal word-count slices.
fn word_slices(text: &str, n: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunk_size = words.len() / n;
    let mut slices = Vec::new();
    for i in 0..n {
        let start = i * chunk_size;
        let end = if i < n - 1 { start + chunk_size } else { words.len() };
        if start >= words.len() {
            break;
        }
        let chunk = words[start..end].join(" ");
        if !chunk.is_empty() {
            slices.push(chunk);
        }
    }
    slices
}

/// Parse a model generation into exactly `n` suggestion strings.
pub fn parse_suggestions(text: &str, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }

    let mut suggestions = labeled_segments(text);

    if suggestions.len() < n {
        let extra = paragraph_segments(text, &suggestions, n);
        suggestions.extend(extra);
    }

    if suggestions.is_empty() {
        suggestions = word_slices(text, n);
    }

    while suggestions.len() < n {
        let pad = suggestions
            .last()
            .cloned()
            .unwrap_or_else(|| FALLBACK_ACK.to_string());
        suggestions.push(pad);
    }
    suggestions.truncate(n);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_responses() {
        let text = "Response 1: Thank you for reaching out, we completely understand your concern.\n\
                    Response 2: Here is what we can do right away to resolve this for you.";
        let parsed = parse_suggestions(text, 2);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].starts_with("Thank you for reaching out"));
        assert!(parsed[1].starts_with("Here is what we can do"));
    }

    #[test]
    fn test_bare_numeric_labels() {
        let text = "1. We are sorry to hear about the delay with your order shipment.\n\
                    2. Our team will issue a replacement within two business days.";
        let parsed = parse_suggestions(text, 2);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].contains("sorry to hear"));
        assert!(parsed[1].contains("replacement"));
    }

    #[test]
    fn test_paragraph_fallback() {
        let text = "Thank you so much for your patience while we looked into this issue.\n\n\
                    We have gone ahead and processed a full refund to your original payment method.";
        let parsed = parse_suggestions(text, 2);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].contains("patience"));
        assert!(parsed[1].contains("refund"));
        assert_ne!(parsed[0], parsed[1]);
    }

    #[test]
    fn test_single_paragraph_pads_by_repetition() {
        let text = "We appreciate you contacting us and will get back to you shortly with details.";
        let parsed = parse_suggestions(text, 3);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], parsed[1]);
        assert_eq!(parsed[1], parsed[2]);
    }

    #[test]
    fn test_unparseable_blob_word_slices() {
        // Every paragraph is under the length floor, so both the labeled and
        // paragraph strategies come up empty and the raw text gets cut into
        // equal word slices.
        let text = "alpha beta\n\ngamma delta\n\nepsilon zeta\n\neta theta\n\niota kappa\n\nlambda mu";
        let parsed = parse_suggestions(text, 3);
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|s| !s.is_empty()));
        assert!(parsed[0].starts_with("alpha"));
        assert_ne!(parsed[0], parsed[1]);
    }

    #[test]
    fn test_empty_text_generic_acknowledgment() {
        let parsed = parse_suggestions("", 2);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], FALLBACK_ACK);
        assert_eq!(parsed[1], FALLBACK_ACK);
    }

    #[test]
    fn test_short_segments_rejected() {
        let text = "Response 1: too short\nResponse 2: This one is comfortably long enough to keep.";
        let parsed = parse_suggestions(text, 2);
        // Only the long segment parses; it is repeated to fill the count.
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].contains("comfortably long"));
    }

    #[test]
    fn test_zero_requested_returns_empty() {
        let text = "Response 1: A perfectly reasonable reply with enough words in it.";
        assert!(parse_suggestions(text, 0).is_empty());
        assert!(parse_suggestions("", 0).is_empty());
    }

    #[test]
    fn test_excess_segments_truncated() {
        let text = "Response 1: First option with plenty of words to pass the filter.\n\
                    Response 2: Second option with plenty of words to pass the filter.\n\
                    Response 3: Third option with plenty of words to pass the filter.";
        let parsed = parse_suggestions(text, 2);
        assert_eq!(parsed.len(), 2);
        assert!(parsed[1].starts_with("Second"));
    }
}
