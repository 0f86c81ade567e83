//! The council of advisors shown on the dashboard
//!
//! Portraits are generated once, all requested concurrently. Failed
//! portraits are skipped and the advisor is shown without one.

use crate::llm::AspectRatio;
use crate::runtime::ImageBackend;
use crate::timeline::ImageRef;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorGroup {
    Visionaries,
    Guardians,
    Realists,
    Evolutionists,
}

#[derive(Debug, Clone, Copy)]
pub struct Advisor {
    pub id: &'static str,
    pub group: AdvisorGroup,
    pub name: &'static str,
    pub portrait_prompt: &'static str,
}

pub const ADVISORS: &[Advisor] = &[
    Advisor {
        id: "steve-jobs",
        group: AdvisorGroup::Visionaries,
        name: "Steve Jobs",
        portrait_prompt: "Close-up portrait of Steve Jobs, black turtleneck, rimless round glasses, intense and visionary gaze, hand on chin, dramatic lighting, black background, photorealistic, 8k",
    },
    Advisor {
        id: "naval-ravikant",
        group: AdvisorGroup::Visionaries,
        name: "Naval Ravikant",
        portrait_prompt: "Portrait of Naval Ravikant, Indian-American entrepreneur, thoughtful expression, casual t-shirt, wise and calm demeanor, podcast studio setting, photorealistic",
    },
    Advisor {
        id: "larry-page",
        group: AdvisorGroup::Visionaries,
        name: "Larry Page",
        portrait_prompt: "Portrait of Larry Page, Google founder, grey hair, intense intellect, looking at the horizon, tech visionary style, photorealistic",
    },
    Advisor {
        id: "st-augustine",
        group: AdvisorGroup::Guardians,
        name: "St. Augustine",
        portrait_prompt: "Portrait of St. Augustine of Hippo, late Roman era philosopher, bearded, holding a book, expression of spiritual intensity and patience, dramatic chiaroscuro lighting, photorealistic art style",
    },
    Advisor {
        id: "thomas-aquinas",
        group: AdvisorGroup::Guardians,
        name: "Thomas Aquinas",
        portrait_prompt: "Portrait of Thomas Aquinas, medieval theologian, dominican habit, holding a quill, expression of deep reason and faith, library background, photorealistic",
    },
    Advisor {
        id: "carl-jung",
        group: AdvisorGroup::Guardians,
        name: "Carl Jung",
        portrait_prompt: "Portrait of Carl Jung, elderly psychoanalyst, round glasses, white hair, expression of deep wisdom and mystery, study background, photorealistic",
    },
    Advisor {
        id: "marcus-aurelius",
        group: AdvisorGroup::Guardians,
        name: "Marcus Aurelius",
        portrait_prompt: "Marble bust come to life of Marcus Aurelius, Roman Emperor, stoic beard, weary but strong eyes, wearing imperial robes, cinematic lighting, ancient Rome background, photorealistic",
    },
    Advisor {
        id: "cs-lewis",
        group: AdvisorGroup::Guardians,
        name: "C.S. Lewis",
        portrait_prompt: "Portrait of C.S. Lewis, British scholar, 1950s style, holding a pipe, tweed jacket, expression of imagination and warmth, oxford study background, photorealistic",
    },
    Advisor {
        id: "deng-xiaoping",
        group: AdvisorGroup::Realists,
        name: "Deng Xiaoping",
        portrait_prompt: "Portrait of Deng Xiaoping, Chinese leader, elderly, short hair, grey mao suit, expression of pragmatic determination, kind but firm eyes, photorealistic",
    },
    Advisor {
        id: "du-yuesheng",
        group: AdvisorGroup::Realists,
        name: "Du Yuesheng",
        portrait_prompt: "Portrait of Du Yuesheng, 1930s Shanghai tycoon, traditional Chinese changshan robe, sharp eyes, expression of street wisdom and cunning, vintage shanghai background, photorealistic",
    },
    Advisor {
        id: "mao-zedong",
        group: AdvisorGroup::Realists,
        name: "Mao Zedong",
        portrait_prompt: "Portrait of Mao Zedong, Chinese leader, charismatic gaze, grey suit, expression of strategic confidence, historical setting, photorealistic",
    },
    Advisor {
        id: "sun-tzu",
        group: AdvisorGroup::Realists,
        name: "Sun Tzu",
        portrait_prompt: "Portrait of Sun Tzu, ancient Chinese general, armor, holding a bamboo scroll, expression of strategic depth, ancient battlefield background, photorealistic",
    },
    Advisor {
        id: "ray-dalio",
        group: AdvisorGroup::Evolutionists,
        name: "Ray Dalio",
        portrait_prompt: "Portrait of Ray Dalio, hedge fund manager, grey hair, business casual, expression of systematic thinking, office background, photorealistic",
    },
    Advisor {
        id: "james-clear",
        group: AdvisorGroup::Evolutionists,
        name: "James Clear",
        portrait_prompt: "Portrait of James Clear, author, athletic build, clean cut, t-shirt, expression of focus and clarity, modern minimalist background, photorealistic",
    },
    Advisor {
        id: "david-goggins",
        group: AdvisorGroup::Evolutionists,
        name: "David Goggins",
        portrait_prompt: "Portrait of David Goggins, Navy SEAL, shaved head, intense sweating, expression of extreme pain and determination, gym or outdoor running background, photorealistic",
    },
];

/// An advisor with its portrait, if one has been generated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorPortrait {
    pub id: &'static str,
    pub group: AdvisorGroup,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait: Option<ImageRef>,
}

#[derive(Debug, Default)]
pub struct AdvisorGallery {
    portraits: RwLock<HashMap<&'static str, ImageRef>>,
    /// Number of portraits produced by the one load
    loaded: OnceCell<usize>,
}

impl AdvisorGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate every portrait. Only the first call does any work; later
    /// calls wait for it and return the same count.
    pub async fn load<I: ImageBackend + ?Sized>(&self, image: &I) -> usize {
        *self
            .loaded
            .get_or_init(|| self.generate_all(image))
            .await
    }

    async fn generate_all<I: ImageBackend + ?Sized>(&self, image: &I) -> usize {
        tracing::info!(count = ADVISORS.len(), "Generating advisor portraits");

        let requests = ADVISORS.iter().map(|advisor| async move {
            let portrait = image
                .generate_image(advisor.portrait_prompt, AspectRatio::Square)
                .await;
            (advisor.id, portrait)
        });
        let results = join_all(requests).await;

        let mut portraits = self
            .portraits
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (id, portrait) in results {
            match portrait {
                Some(portrait) => {
                    portraits.insert(id, portrait);
                }
                None => tracing::warn!(advisor = %id, "Advisor portrait unavailable"),
            }
        }
        let produced = portraits.len();
        drop(portraits);

        tracing::info!(produced, "Advisor portraits ready");
        produced
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// All advisors in display order
    pub fn entries(&self) -> Vec<AdvisorPortrait> {
        let portraits = self
            .portraits
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        ADVISORS
            .iter()
            .map(|advisor| AdvisorPortrait {
                id: advisor.id,
                group: advisor.group,
                name: advisor.name,
                portrait: portraits.get(advisor.id).cloned(),
            })
            .collect()
    }
}
