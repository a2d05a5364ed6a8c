use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod layout;

pub use layout::{LayoutConfig, RowConfig, SectionConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub cip: CipConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub thumbnails: ThumbnailConfig,
    /// Indexed by license id; `None` marks an unused id.
    pub licenses: Vec<Option<LicenseConfig>>,
    /// Catalog name to watermark image path.
    pub watermarks: BTreeMap<String, PathBuf>,
    pub features: FeatureConfig,
    pub cache: CacheConfig,
    pub google: GoogleConfig,
    pub oxford: Option<OxfordConfig>,
    pub tagging: TaggingConfig,
    pub auth0: Option<Auth0Config>,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub sitemap: SitemapConfig,
    /// Asset type name to page layout.
    pub layouts: BTreeMap<String, LayoutConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub theme_color: String,
    /// PNG served when an image cannot be produced.
    pub fallback_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CipConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub assets_index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Allowed download sizes; empty allows any size.
    pub sizes: Vec<String>,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub url: Option<String>,
    pub watermark: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub watermarks: bool,
    pub thumbnail_caching: bool,
    pub motif_tagging: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub google_storage_bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_key: String,
    pub project_id: String,
    /// OAuth bearer token used for cache uploads.
    pub storage_token: Option<String>,
    pub vision_url: String,
    pub translate_url: String,
    pub storage_api_url: String,
    pub storage_download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OxfordConfig {
    pub api_key: String,
    #[serde(default = "default_oxford_endpoint")]
    pub endpoint: String,
}

fn default_oxford_endpoint() -> String {
    "https://westeurope.api.cognitive.microsoft.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    pub blacklist: Vec<String>,
    pub source_language: String,
    pub target_language: String,
    pub max_google_suggestions: u32,
    pub typeahead_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth0Config {
    pub domain: String,
    pub client_id: String,
    pub callback_url: String,
    /// Read from `AUTH0_CLIENT_SECRET`, never from the config file in production.
    pub client_secret: String,
    /// Overrides `https://{domain}`.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub expiry_hours: u64,
    pub cookie_name: String,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    pub scheme: String,
    pub asset_limit: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Collections Online".to_string(),
            theme_color: "#262626".to_string(),
            fallback_image: None,
        }
    }
}

impl Default for CipConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
        }
    }
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            assets_index: "assets".to_string(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            sizes: Vec::new(),
            jpeg_quality: 85,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            watermarks: true,
            thumbnail_caching: false,
            motif_tagging: true,
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            storage_token: None,
            vision_url: "https://vision.googleapis.com".to_string(),
            translate_url: "https://translation.googleapis.com".to_string(),
            storage_api_url: "https://storage.googleapis.com".to_string(),
            storage_download_url: "https://storage.googleapis.com".to_string(),
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            blacklist: Vec::new(),
            source_language: "en".to_string(),
            target_language: "da".to_string(),
            max_google_suggestions: 10,
            typeahead_size: 10,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            expiry_hours: 24 * 7,
            cookie_name: "collections_session".to_string(),
            secure_cookie: false,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            asset_limit: 3000,
        }
    }
}

/// Session secret of the development preset; refused in any other environment.
pub const DEVELOPMENT_SECRET: &str = "development-secret";

impl Environment {
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_name(env::var("APP_ENV").ok().as_deref());

        let explicit = env::var("COLLECTIONS_CONFIG").ok().map(PathBuf::from);
        let path = explicit.clone().unwrap_or_else(|| PathBuf::from("config.yaml"));
        let file = (explicit.is_some() || path.exists()).then_some(path.as_path());

        Ok(Self::resolve(environment, file)?.with_env_overrides())
    }

    /// The preset for `environment`, with the YAML file at `path` merged over it.
    pub fn resolve(environment: Environment, path: Option<&Path>) -> Result<Self, ConfigError> {
        let preset = Self::preset(environment);
        match path {
            Some(path) => Self::load_over(preset, path),
            None => Ok(preset),
        }
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Read a YAML file; missing keys fall back to the development preset.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_over(Self::development(), path)
    }

    /// Read a YAML file and merge it key by key over `base`.
    pub fn load_over(base: Self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        base.merge_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        Self::development().merge_yaml(raw)
    }

    /// Overlay the mappings in `raw` onto this config. Nested mappings merge;
    /// any other value (lists included) replaces what was there. The
    /// environment always stays the one of `self`.
    pub fn merge_yaml(self, raw: &str) -> Result<Self, serde_yaml::Error> {
        let environment = self.environment;
        let mut merged = serde_yaml::to_value(&self)?;
        let overlay: serde_yaml::Value = serde_yaml::from_str(raw)?;
        if !overlay.is_null() {
            merge_values(&mut merged, overlay);
        }

        let mut config: Self = serde_yaml::from_value(merged)?;
        config.environment = environment;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("COLLECTIONS_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        if let Ok(v) = env::var("ELASTICSEARCH_URL") {
            self.elasticsearch.url = v;
        }
        if let Ok(v) = env::var("ELASTICSEARCH_ASSETS_INDEX") {
            self.elasticsearch.assets_index = v;
        }
        if let Ok(v) = env::var("CIP_BASE_URL") {
            self.cip.base_url = v;
        }

        // Google
        if let Ok(v) = env::var("GOOGLE_API_KEY") {
            self.google.api_key = v;
        }
        if let Ok(v) = env::var("GOOGLE_PROJECT_ID") {
            self.google.project_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_STORAGE_TOKEN") {
            self.google.storage_token = Some(v);
        }
        if let Ok(v) = env::var("OXFORD_API_KEY") {
            match self.oxford.as_mut() {
                Some(oxford) => oxford.api_key = v,
                None => {
                    self.oxford = Some(OxfordConfig {
                        api_key: v,
                        endpoint: default_oxford_endpoint(),
                    })
                }
            }
        }

        // Features
        if let Ok(v) = env::var("FEATURE_WATERMARKS") {
            self.features.watermarks = v.parse().unwrap_or(self.features.watermarks);
        }
        if let Ok(v) = env::var("FEATURE_THUMBNAIL_CACHING") {
            self.features.thumbnail_caching = v.parse().unwrap_or(self.features.thumbnail_caching);
        }
        if let Ok(v) = env::var("FEATURE_MOTIF_TAGGING") {
            self.features.motif_tagging = v.parse().unwrap_or(self.features.motif_tagging);
        }
        if let Ok(v) = env::var("CACHE_BUCKET") {
            self.cache.google_storage_bucket = Some(v);
        }

        // Secrets
        if let Ok(v) = env::var("AUTH0_CLIENT_SECRET") {
            if let Some(auth0) = self.auth0.as_mut() {
                auth0.client_secret = v;
            }
        }
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.session.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRY_HOURS") {
            self.session.expiry_hours = v.parse().unwrap_or(self.session.expiry_hours);
        }

        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.features.thumbnail_caching && self.cache.google_storage_bucket.is_none() {
            return Err(ConfigError::Invalid(
                "thumbnail caching requires cache.google_storage_bucket".to_string(),
            ));
        }

        if let Some(auth0) = &self.auth0 {
            let missing = [
                ("auth0.domain", auth0.domain.is_empty()),
                ("auth0.client_id", auth0.client_id.is_empty()),
                ("auth0.callback_url", auth0.callback_url.is_empty()),
                ("AUTH0_CLIENT_SECRET", auth0.client_secret.is_empty()),
            ];
            if let Some((name, _)) = missing.iter().find(|(_, empty)| *empty) {
                return Err(ConfigError::Invalid(format!("missing {}", name)));
            }
        }

        if self.environment == Environment::Production && self.session.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("SESSION_SECRET must be set in production".to_string()));
        }
        if self.environment != Environment::Development && self.session.jwt_secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::Invalid(
                "the development session secret cannot be used outside development".to_string(),
            ));
        }

        if self.sitemap.asset_limit == 0 {
            return Err(ConfigError::Invalid("sitemap.asset_limit must be positive".to_string()));
        }

        Ok(())
    }

    /// License ids whose mapping asks for a watermark.
    pub fn watermarked_license_ids(&self) -> BTreeSet<u64> {
        self.licenses
            .iter()
            .enumerate()
            .filter(|(_, license)| license.as_ref().map(|l| l.watermark).unwrap_or(false))
            .map(|(id, _)| id as u64)
            .collect()
    }

    pub fn license_url(&self, license_id: u64) -> Option<&str> {
        let index = usize::try_from(license_id).ok()?;
        self.licenses
            .get(index)
            .and_then(|license| license.as_ref())
            .and_then(|license| license.url.as_deref())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            site: SiteConfig::default(),
            cip: CipConfig::default(),
            elasticsearch: ElasticsearchConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            licenses: Vec::new(),
            watermarks: BTreeMap::new(),
            features: FeatureConfig::default(),
            cache: CacheConfig::default(),
            google: GoogleConfig::default(),
            oxford: None,
            tagging: TaggingConfig::default(),
            auth0: None,
            session: SessionConfig {
                jwt_secret: DEVELOPMENT_SECRET.to_string(),
                ..SessionConfig::default()
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
            sitemap: SitemapConfig::default(),
            layouts: BTreeMap::new(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            features: FeatureConfig {
                watermarks: true,
                thumbnail_caching: false,
                motif_tagging: true,
            },
            session: SessionConfig {
                jwt_secret: String::new(),
                expiry_hours: 24,
                secure_cookie: true,
                ..SessionConfig::default()
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            features: FeatureConfig {
                watermarks: true,
                thumbnail_caching: true,
                motif_tagging: true,
            },
            session: SessionConfig {
                jwt_secret: String::new(),
                expiry_hours: 24,
                secure_cookie: true,
                ..SessionConfig::default()
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://collections.example.com".to_string()],
            },
            ..Self::development()
        }
    }
}

fn merge_values(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// Global singleton config for the binaries - initialized once at startup
pub static CONFIG: Lazy<Result<AppConfig, String>> =
    Lazy::new(|| AppConfig::from_env().map_err(|e| e.to_string()));

pub fn config() -> Result<&'static AppConfig, ConfigError> {
    CONFIG
        .as_ref()
        .map_err(|msg| ConfigError::Invalid(msg.clone()))
}
