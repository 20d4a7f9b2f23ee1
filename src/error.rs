//! Error taxonomy for catalog loading, negotiation and message resolution.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, I18nError>;

/// Everything that can go wrong inside the translator core.
///
/// Load errors (`ReadFile`, `ParseFile`, `UnsupportedFormat`, `UnknownLanguage`,
/// `InvalidMessage`, `Walk`) abort a whole load. `MalformedCount`,
/// `MissingTemplateField`, `MalformedTemplate` and `InvalidTemplateData`
/// abort a single resolution.
/// `MissingOption` / `InvalidOption` are configuration errors that extractors
/// report and then contribute nothing.
#[derive(Debug, thiserror::Error)]
pub enum I18nError {
    #[error("invalid language tag '{input}': {reason}")]
    InvalidLanguage { input: String, reason: String },

    #[error("unable to read locale file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse locale file {}: {reason}", path.display())]
    ParseFile { path: PathBuf, reason: String },

    #[error("no unmarshaller registered for '{extension}' (locale file {})", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("unable to determine the language of locale file {}", path.display())]
    UnknownLanguage { path: PathBuf },

    #[error("invalid message '{id}': {reason}")]
    InvalidMessage { id: String, reason: String },

    #[error("malformed plural count '{value}'")]
    MalformedCount { value: String },

    #[error("message '{message_id}' references unknown template field '{field}'")]
    MissingTemplateField { message_id: String, field: String },

    #[error("message '{message_id}' has a malformed template: {reason}")]
    MalformedTemplate { message_id: String, reason: String },

    #[error("template data must serialize to a map: {reason}")]
    InvalidTemplateData { reason: String },

    #[error("error walking locale files at {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("\"{key}\" is not defined in the extractor options")]
    MissingOption { key: String },

    #[error("extractor option \"{key}\" must be {expected}")]
    InvalidOption { key: String, expected: &'static str },
}

impl I18nError {
    /// Configuration errors are logged by the negotiator instead of surfacing.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            I18nError::MissingOption { .. } | I18nError::InvalidOption { .. }
        )
    }
}
