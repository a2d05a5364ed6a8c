// Motif tagging: AI tag suggestions and crowd-sourced tags.

use std::collections::BTreeSet;

use crate::config::TaggingConfig;
use crate::services::{GoogleVision, OxfordVision, ServiceError, Translator};

pub mod store;

pub use store::{ElasticsearchTagStore, MotifTagStore};

/// Which labelling services to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionApis {
    pub google: bool,
    pub oxford: bool,
}

impl SuggestionApis {
    pub fn all() -> Self {
        Self {
            google: true,
            oxford: true,
        }
    }
}

impl Default for SuggestionApis {
    fn default() -> Self {
        Self::all()
    }
}

/// Labels an image with every enabled service and translates the result.
#[derive(Debug, Clone)]
pub struct TagSuggester {
    google: GoogleVision,
    oxford: Option<OxfordVision>,
    translator: Translator,
    config: TaggingConfig,
}

impl TagSuggester {
    pub fn new(
        google: GoogleVision,
        oxford: Option<OxfordVision>,
        translator: Translator,
        config: TaggingConfig,
    ) -> Self {
        Self {
            google,
            oxford,
            translator,
            config,
        }
    }

    /// Translated, lowercased, sorted suggestions for the image at `image_url`.
    pub async fn fetch_suggestions(&self, image_url: &str, apis: SuggestionApis) -> Result<Vec<String>, ServiceError> {
        let google = async {
            if apis.google {
                self.google.labels(image_url).await
            } else {
                Ok(Vec::new())
            }
        };
        let oxford = async {
            match (&self.oxford, apis.oxford) {
                (Some(oxford), true) => oxford.categories(image_url).await,
                _ => Ok(Vec::new()),
            }
        };

        let (google, oxford) = tokio::try_join!(google, oxford)?;
        let tags = union_tags([google, oxford]);
        if tags.is_empty() {
            tracing::debug!(image_url, "no tag suggestions");
            return Ok(Vec::new());
        }

        let translations = self
            .translator
            .translate(&tags, &self.config.source_language, &self.config.target_language)
            .await?;

        Ok(finalize_translations(translations, &self.config.blacklist))
    }
}

/// Union of the lists in order of first occurrence, without empty tags.
pub fn union_tags<I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut seen = BTreeSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Lowercase, drop blacklisted tags, sort and dedupe.
pub fn finalize_translations(translations: Vec<String>, blacklist: &[String]) -> Vec<String> {
    let blacklist: BTreeSet<&str> = blacklist.iter().map(String::as_str).collect();
    translations
        .into_iter()
        .map(|tag| tag.to_lowercase())
        .filter(|tag| !blacklist.contains(tag.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
