//! Caption length policy.

use tracing::warn;

use roomscribe_core::{CaptionLengthPolicy, ParseError};

pub const DEFAULT_MIN_CHARS: usize = 50;
pub const DEFAULT_MAX_CHARS: usize = 80;

/// Target character band for captions and what to do when a reply misses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionPolicy {
    pub min_chars: usize,
    pub max_chars: usize,
    pub on_violation: CaptionLengthPolicy,
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
            on_violation: CaptionLengthPolicy::Warn,
        }
    }
}

impl CaptionPolicy {
    /// Apply the policy to an extracted caption. Lengths are counted in characters.
    pub fn apply(&self, caption: String) -> Result<String, ParseError> {
        let len = caption.chars().count();
        if (self.min_chars..=self.max_chars).contains(&len) {
            return Ok(caption);
        }

        match self.on_violation {
            CaptionLengthPolicy::Reject => Err(ParseError::CaptionLength {
                len,
                min: self.min_chars,
                max: self.max_chars,
            }),
            CaptionLengthPolicy::Truncate if len > self.max_chars => {
                let truncated = truncate_chars(&caption, self.max_chars);
                if truncated.is_empty() {
                    return Err(ParseError::Empty { field: "caption" });
                }
                warn!(
                    len,
                    max = self.max_chars,
                    truncated_len = truncated.chars().count(),
                    "Caption too long, truncated"
                );
                Ok(truncated)
            }
            _ => {
                warn!(
                    len,
                    min = self.min_chars,
                    max = self.max_chars,
                    caption = %caption,
                    "Caption length outside target band"
                );
                Ok(caption)
            }
        }
    }
}

/// Cut to at most `max` characters, preferring the last word boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    head.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
        .to_string()
}
