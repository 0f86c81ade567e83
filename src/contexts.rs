//! Conversational contexts ("modules")
//!
//! Each context has a greeting, an optional quote and an optional prompt for
//! an illustration of that quote. Unknown context ids resolve to the
//! `dashboard` fallback, and missing translations fall back to the default
//! locale field by field.

use crate::config::ConfigError;
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const FALLBACK_CONTEXT: &str = "dashboard";

/// Per-locale text. Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zh: Option<String>,
}

impl LocalizedText {
    pub fn new(en: &str, zh: &str) -> Self {
        Self {
            en: Some(en.to_string()),
            zh: Some(zh.to_string()),
        }
    }

    fn exact(&self, locale: Locale) -> Option<&str> {
        let text = match locale {
            Locale::En => self.en.as_deref(),
            Locale::Zh => self.zh.as_deref(),
        };
        text.filter(|t| !t.trim().is_empty())
    }

    /// Text in `locale`, else in the default locale
    pub fn get(&self, locale: Locale) -> Option<&str> {
        self.exact(locale).or_else(|| self.exact(Locale::DEFAULT))
    }
}

/// Static definition of one context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDef {
    #[serde(default)]
    pub title: LocalizedText,
    pub greeting: LocalizedText,
    #[serde(default)]
    pub quote: LocalizedText,
    #[serde(default)]
    pub illustrative_prompt: Option<String>,
}

/// Quote entry plus the prompt for its background illustration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    pub quote: String,
    pub prompt: String,
}

/// What a freshly opened context shows before the user says anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    /// The id actually used, after falling back for unknown ids
    pub context_id: String,
    pub greeting: String,
    pub illustration: Option<Illustration>,
}

/// Context id with its title, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ContextFile {
    contexts: BTreeMap<String, ContextDef>,
}

/// Mapping from context id to its definition, with a guaranteed fallback
#[derive(Debug, Clone)]
pub struct ContextTable {
    contexts: BTreeMap<String, ContextDef>,
    fallback: ContextDef,
}

impl ContextTable {
    /// Build a table; `contexts` must contain the `dashboard` fallback and
    /// every greeting needs default-locale text.
    pub fn new(mut contexts: BTreeMap<String, ContextDef>) -> Result<Self, ConfigError> {
        let fallback = contexts.remove(FALLBACK_CONTEXT).ok_or_else(|| {
            ConfigError::ContextTable(format!("missing fallback context `{FALLBACK_CONTEXT}`"))
        })?;

        let missing_greeting = std::iter::once((FALLBACK_CONTEXT, &fallback))
            .chain(contexts.iter().map(|(id, def)| (id.as_str(), def)))
            .find(|(_, def)| def.greeting.exact(Locale::DEFAULT).is_none());
        if let Some((id, _)) = missing_greeting {
            return Err(ConfigError::ContextTable(format!(
                "context `{id}` has no {} greeting",
                Locale::DEFAULT
            )));
        }

        Ok(Self { contexts, fallback })
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ContextFile =
            toml::from_str(source).map_err(|e| ConfigError::ContextTable(e.to_string()))?;
        Self::new(file.contexts)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Selectable contexts (the fallback itself is the selector, not listed)
    pub fn list(&self, locale: Locale) -> Vec<ContextSummary> {
        self.contexts
            .iter()
            .map(|(id, def)| ContextSummary {
                id: id.clone(),
                title: def.title.get(locale).unwrap_or(id).to_string(),
            })
            .collect()
    }

    /// Greeting and optional illustration for `id` in `locale`
    pub fn resolve(&self, id: &str, locale: Locale) -> Opening {
        let (context_id, def) = match self.contexts.get(id) {
            Some(def) => (id, def),
            None => (FALLBACK_CONTEXT, &self.fallback),
        };

        let illustration = def
            .quote
            .get(locale)
            .zip(
                def.illustrative_prompt
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty()),
            )
            .map(|(quote, prompt)| Illustration {
                quote: quote.to_string(),
                prompt: prompt.to_string(),
            });

        Opening {
            context_id: context_id.to_string(),
            greeting: def.greeting.get(locale).unwrap_or_default().to_string(),
            illustration,
        }
    }

    /// The built-in NEXUS modules
    pub fn builtin() -> Self {
        let mut contexts = BTreeMap::new();

        contexts.insert(
            "self".to_string(),
            ContextDef {
                title: LocalizedText::new("Self-Mastery", "自我掌控"),
                greeting: LocalizedText::new(
                    "Welcome to **Self-Mastery**. I am here to help you regulate your state and execute with clarity. How are you feeling right now?",
                    "欢迎来到**自我掌控**模块。我将帮助你调节状态，清晰执行。你现在感觉如何？",
                ),
                quote: LocalizedText::new(
                    "**\"You have power over your mind - not outside events. Realize this, and you will find strength.\"** — Marcus Aurelius",
                    "**“你拥有对自己心灵的掌控权，而非外在事件。意识到这一点，你将找到力量。”** —— 马可·奥勒留",
                ),
                illustrative_prompt: Some(
                    "A minimalist zen garden with a single polished stone, symbolizing mental clarity and stoic calm, cinematic lighting, photorealistic".to_string(),
                ),
            },
        );

        contexts.insert(
            "team".to_string(),
            ContextDef {
                title: LocalizedText::new("Team Synergy", "团队协同"),
                greeting: LocalizedText::new(
                    "Welcome to **Team Synergy**. Let's bridge the gaps. Are you preparing for a 1:1, a review, or resolving a conflict?",
                    "欢迎来到**团队协同**模块。让我们消除隔阂。你是在准备1:1沟通、绩效评估，还是解决冲突？",
                ),
                quote: LocalizedText::new(
                    "**\"Great teams are not those that don't fail, but those that fail well together.\"**",
                    "**“伟大的团队不是不失败的团队，而是能够一起从失败中成长的团队。”**",
                ),
                illustrative_prompt: Some(
                    "A high-tech bridge connecting two cliffs, symbolizing connection and synergy, futuristic architectural style, 8k resolution".to_string(),
                ),
            },
        );

        contexts.insert(
            "strategy".to_string(),
            ContextDef {
                title: LocalizedText::new("Strategic Wisdom", "战略智慧"),
                greeting: LocalizedText::new(
                    "Welcome to **Strategic Wisdom**. The Council is assembled. What strategic dilemma shall we dissect today?",
                    "欢迎来到**战略智慧**模块。委员会已集结。今天我们要剖析什么战略难题？",
                ),
                quote: LocalizedText::new(
                    "**\"Strategy is about making choices, trade-offs; it's about deliberately choosing to be different.\"** — Michael Porter",
                    "**“战略就是做出选择和权衡；是刻意选择与众不同。”** —— 迈克尔·波特",
                ),
                illustrative_prompt: Some(
                    "A glowing compass on a dark map table, surrounded by strategic markers, cinematic lighting, mysterious and intellectual atmosphere".to_string(),
                ),
            },
        );

        contexts.insert(
            "toolkit".to_string(),
            ContextDef {
                title: LocalizedText::new("Toolkit", "工具箱"),
                greeting: LocalizedText::new(
                    "Welcome to the **Toolkit**. I can help you find specific frameworks or mental models. What do you need?",
                    "欢迎来到**工具箱**。我可以帮你寻找特定的思维模型或框架。你需要什么？",
                ),
                quote: LocalizedText::new(
                    "**\"Give me a lever long enough and a fulcrum on which to place it, and I shall move the world.\"** — Archimedes",
                    "**“给我一个支点，我就能撬动地球。”** —— 阿基米德",
                ),
                illustrative_prompt: Some(
                    "A collection of glowing, holographic tools and geometric shapes floating in a workshop, symbolizing mental models, cyberpunk style".to_string(),
                ),
            },
        );

        let fallback = ContextDef {
            title: LocalizedText::new("Dashboard", "仪表盘"),
            greeting: LocalizedText::new("How can I help you today?", "今天我能为你做些什么？"),
            quote: LocalizedText::default(),
            illustrative_prompt: None,
        };

        Self { contexts, fallback }
    }
}
