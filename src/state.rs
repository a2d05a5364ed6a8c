use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::imaging::{fallback_png, WatermarkSet};
use crate::layout::{compile_layouts, Layout};
use crate::services::{Auth0Service, CipClient, CloudStorage, Elasticsearch, GoogleVision, OxfordVision, Translator};
use crate::tagging::{ElasticsearchTagStore, MotifTagStore, TagSuggester};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

pub struct Inner {
    pub config: AppConfig,
    pub es: Elasticsearch,
    pub cip: CipClient,
    pub storage: CloudStorage,
    pub suggester: TagSuggester,
    pub tag_store: Arc<dyn MotifTagStore>,
    pub auth0: Option<Auth0Service>,
    pub watermarks: WatermarkSet,
    pub watermarked_licenses: BTreeSet<u64>,
    pub layouts: BTreeMap<String, Layout>,
    pub fallback_image: Vec<u8>,
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("collections-online/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let es = Elasticsearch::new(http.clone(), &config.elasticsearch.url);
        let tag_store: Arc<dyn MotifTagStore> = Arc::new(ElasticsearchTagStore::new(
            es.clone(),
            &config.elasticsearch.assets_index,
            config.tagging.typeahead_size,
        ));

        Self::with_tag_store(config, http, tag_store)
    }

    /// Build with a custom motif tag store.
    pub fn with_tag_store(
        config: AppConfig,
        http: reqwest::Client,
        tag_store: Arc<dyn MotifTagStore>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let es = Elasticsearch::new(http.clone(), &config.elasticsearch.url);
        let cip = CipClient::new(http.clone(), &config.cip.base_url);
        let storage = CloudStorage::new(
            http.clone(),
            &config.google.storage_api_url,
            &config.google.storage_download_url,
            config.google.storage_token.clone(),
        );

        let google = GoogleVision::new(
            http.clone(),
            &config.google.vision_url,
            &config.google.api_key,
            config.tagging.max_google_suggestions,
        );
        let oxford = config
            .oxford
            .as_ref()
            .map(|oxford| OxfordVision::new(http.clone(), &oxford.endpoint, &oxford.api_key));
        let translator = Translator::new(http.clone(), &config.google.translate_url, &config.google.api_key);
        let suggester = TagSuggester::new(google, oxford, translator, config.tagging.clone());

        let auth0 = config
            .auth0
            .clone()
            .map(|auth0| Auth0Service::new(http.clone(), auth0));

        let watermarks = WatermarkSet::load(&config.watermarks)?;
        let layouts = compile_layouts(&config)?;
        let fallback_image = fallback_png(config.site.fallback_image.as_deref())?;
        let watermarked_licenses = config.watermarked_license_ids();
        if config.features.watermarks && !watermarked_licenses.is_empty() && watermarks.is_empty() {
            tracing::warn!("licenses ask for watermarks but no watermark images are configured");
        }

        tracing::info!(
            watermarks = watermarks.len(),
            layouts = layouts.len(),
            tag_store = tag_store.name(),
            auth = auth0.is_some(),
            "application state ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                es,
                cip,
                storage,
                suggester,
                tag_store,
                auth0,
                watermarks,
                watermarked_licenses,
                layouts,
                fallback_image,
            }),
        })
    }
}
