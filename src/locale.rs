//! Display/response languages and the small set of localized strings the
//! orchestration core needs on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selected display and response language.
///
/// `En` is the primary locale and the fallback for any missing translation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub const DEFAULT: Locale = Locale::En;

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Generic text shown when the text backend fails. Never carries error detail.
    pub fn connection_error_message(self) -> &'static str {
        match self {
            Locale::En => "I encountered a connection error. Please try again.",
            Locale::Zh => "连接出现错误，请重试。",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "zh" => Ok(Locale::Zh),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Inputs that send the user back to the context selector instead of
/// starting a turn. Matched against every locale, not just the active one.
pub(crate) const NAVIGATION_KEYWORDS: &[(Locale, &str)] = &[
    (Locale::En, "/home"),
    (Locale::En, "menu"),
    (Locale::En, "start"),
    (Locale::En, "hi"),
    (Locale::Zh, "你好"),
    (Locale::Zh, "菜单"),
    (Locale::Zh, "主页"),
];

/// Case-insensitive exact match of the trimmed input against the keyword set.
pub fn is_navigation_command(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    NAVIGATION_KEYWORDS
        .iter()
        .any(|(_, keyword)| *keyword == normalized)
}
