//! Inline image directive parsing
//!
//! A text reply may embed `[Image of <prompt>]` to ask for a follow-up image.
//! Detection is purely lexical: the first match wins, and quoted or code
//! regions are not treated specially.

use std::sync::LazyLock;

use regex::Regex;

static IMAGE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[Image of (.*?)\]").expect("image directive pattern is valid")
});

/// A reply split into what to show and what (if anything) to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub display_text: String,
    pub image_prompt: Option<String>,
}

/// Split `raw` into display text and an optional image prompt.
///
/// When a directive is found the tag is removed and the remainder trimmed.
/// A directive with a blank prompt is still removed but requests no image.
pub fn parse(raw: &str) -> ParsedReply {
    let Some(captures) = IMAGE_DIRECTIVE.captures(raw) else {
        return ParsedReply {
            display_text: raw.to_string(),
            image_prompt: None,
        };
    };

    let tag = captures.get(0).map_or("", |m| m.as_str());
    let prompt = captures.get(1).map_or("", |m| m.as_str()).trim();

    ParsedReply {
        display_text: raw.replacen(tag, "", 1).trim().to_string(),
        image_prompt: (!prompt.is_empty()).then(|| prompt.to_string()),
    }
}
