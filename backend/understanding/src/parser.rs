//! Field extraction from free-text model replies.
//!
//! Each field has an ordered rule table. Rules are tried in priority order
//! and the first non-empty result wins; later rules are fallbacks for replies
//! that ignored the requested format.

use once_cell::sync::Lazy;
use regex::Regex;

use roomscribe_core::ParseError;

/// One extraction strategy.
pub struct Rule {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<String>,
}

/// Room label rules: labeled line, "this is a X" sentence, first line.
pub static ROOM_RULES: &[Rule] = &[
    Rule { name: "labeled", extract: labeled_room },
    Rule { name: "sentence", extract: sentence_room },
    Rule { name: "first-line", extract: first_line },
];

/// Description rules: labeled block, text after the first line, whole reply.
pub static DESCRIPTION_RULES: &[Rule] = &[
    Rule { name: "labeled", extract: labeled_description },
    Rule { name: "after-first-line", extract: after_first_line },
    Rule { name: "full-text", extract: full_text },
];

/// Straight and typographic quote characters stripped from captions.
const QUOTES: &[char] = &[
    '"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00AB}', '\u{00BB}',
];

// --- Compiled regexes ---
//
// Labels may appear anywhere in a line ("1. Room/Area: ...", "Sure - Room/Area: ...").
// Horizontal whitespace only around the colon, so a capture never starts on the next line.

static ROOM_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\broom(?:[ \t]*/[ \t]*area|[ \t]+type)?[ \t*]*:[ \t*]*(.+)$").unwrap()
});

static ROOM_SENTENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bthis\s+(?:is|appears\s+to\s+be)\s+(?:an?|the)\s+([^.,;:!?\n]+)").unwrap()
});

static DESCRIPTION_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\b(?:(?:visual|detailed)[ \t]+)?description[ \t*]*:[ \t*]*(.*)\z").unwrap()
});

/// Run `rules` in order and return the first non-empty extraction.
pub fn first_match(rules: &[Rule], text: &str) -> Option<(&'static str, String)> {
    rules.iter().find_map(|rule| {
        (rule.extract)(text)
            .filter(|value| !value.is_empty())
            .map(|value| (rule.name, value))
    })
}

/// Extract the room label. Fails only when every rule comes up empty.
pub fn extract_room(text: &str) -> Result<String, ParseError> {
    first_match(ROOM_RULES, text)
        .map(|(_, room)| room)
        .ok_or(ParseError::Empty { field: "room" })
}

/// Extract the visual description. Any non-blank reply yields something.
pub fn extract_description(text: &str) -> Result<String, ParseError> {
    first_match(DESCRIPTION_RULES, text)
        .map(|(_, description)| description)
        .ok_or(ParseError::Empty { field: "description" })
}

/// Strip surrounding quotes and whitespace from a caption reply.
pub fn extract_caption(text: &str) -> Result<String, ParseError> {
    let caption = text.trim_matches(|c: char| c.is_whitespace() || QUOTES.contains(&c));
    if caption.is_empty() {
        return Err(ParseError::Empty { field: "caption" });
    }
    Ok(caption.to_string())
}

fn clean_label(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '*' || c == '_' || QUOTES.contains(&c))
        .trim_end_matches(['.', '!', ',', ';', ':'])
        .trim()
        .to_string()
}

fn labeled_room(text: &str) -> Option<String> {
    ROOM_LABEL_RE
        .captures(text)
        .map(|caps| clean_label(&caps[1]))
}

fn sentence_room(text: &str) -> Option<String> {
    ROOM_SENTENCE_RE
        .captures(text)
        .map(|caps| clean_label(&caps[1]))
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(clean_label)
}

fn labeled_description(text: &str) -> Option<String> {
    DESCRIPTION_LABEL_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}

fn after_first_line(text: &str) -> Option<String> {
    text.trim()
        .split_once('\n')
        .map(|(_, rest)| rest.trim().to_string())
}

fn full_text(text: &str) -> Option<String> {
    Some(text.trim().to_string())
}
