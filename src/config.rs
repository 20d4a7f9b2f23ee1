use crate::i18n::{
    default_extractors, DirFileTree, Extractor, LanguageTag, Translator, TranslatorBuilder,
    COOKIE_NAME, SESSION_NAME, URL_PREFIX_NAME,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Config {
    // Catalogs
    pub locales_dir: PathBuf,
    pub default_language: String,

    // Runtime
    pub environment: String,
    pub port: u16,

    // Translator
    pub helper_name: String,
    pub cookie_name: String,
    pub session_name: String,
    pub url_prefix_name: String,
    pub url_prefix: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_language =
            std::env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "en-US".to_string());
        LanguageTag::parse(&default_language)
            .context("DEFAULT_LANGUAGE is not a valid language tag")?;

        Ok(Self {
            // Catalogs
            locales_dir: std::env::var("LOCALES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("locales")),
            default_language,

            // Runtime
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            // Translator
            helper_name: std::env::var("I18N_HELPER_NAME").unwrap_or_else(|_| "t".to_string()),
            cookie_name: std::env::var("I18N_COOKIE_NAME").unwrap_or_else(|_| "lang".to_string()),
            session_name: std::env::var("I18N_SESSION_NAME")
                .unwrap_or_else(|_| "lang".to_string()),
            url_prefix_name: std::env::var("I18N_URL_PREFIX_NAME")
                .unwrap_or_else(|_| "lang".to_string()),
            url_prefix: std::env::var("I18N_URL_PREFIX")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
        })
    }

    /// Extractor chain; the URL prefix, when enabled, takes precedence.
    pub fn extractors(&self) -> Vec<Extractor> {
        let mut extractors = Vec::new();
        if self.url_prefix {
            extractors.push(Extractor::url_prefix());
        }
        extractors.extend(default_extractors());
        extractors
    }

    /// Build a translator over `locales_dir`, performing the initial load.
    pub fn translator(&self) -> Result<Translator> {
        TranslatorBuilder::new(Arc::new(DirFileTree::new(&self.locales_dir)), &self.default_language)
            .environment(self.environment.as_str())
            .helper_name(self.helper_name.as_str())
            .extractors(self.extractors())
            .option(COOKIE_NAME, self.cookie_name.as_str())
            .option(SESSION_NAME, self.session_name.as_str())
            .option(URL_PREFIX_NAME, self.url_prefix_name.as_str())
            .build()
            .with_context(|| format!("Failed to load catalogs from {}", self.locales_dir.display()))
    }
}
