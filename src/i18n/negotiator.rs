//! Language negotiation: an ordered chain of extractors that turn a request
//! into a preference-ordered list of language tags.
//!
//! Default precedence (highest first): cookie, session, `Accept-Language`.
//! The URL-prefix and weighted-header extractors are opt-in. The configured
//! default language is always appended, so the list is never empty.

use crate::error::{I18nError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::error;

pub const COOKIE_NAME: &str = "CookieName";
pub const SESSION_NAME: &str = "SessionName";
pub const URL_PREFIX_NAME: &str = "URLPrefixName";

const DEFAULT_OPTION_VALUE: &str = "lang";

/// The slice of a request the extractors are allowed to look at.
pub trait RequestContext {
    fn cookie(&self, name: &str) -> Option<String>;
    fn session(&self, key: &str) -> Option<String>;
    fn header(&self, name: &str) -> Option<String>;
    /// A named route parameter.
    fn param(&self, name: &str) -> Option<String>;
    fn path(&self) -> &str;
}

/// Request context backed by plain maps. Useful for background work and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRequestContext {
    cookies: HashMap<String, String>,
    session: HashMap<String, String>,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    path: String,
}

impl StaticRequestContext {
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_session(mut self, key: &str, value: &str) -> Self {
        self.session.insert(key.to_string(), value.to_string());
        self
    }

    /// Header names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

impl RequestContext for StaticRequestContext {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn session(&self, key: &str) -> Option<String> {
        self.session.get(key).cloned()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// Named configuration bag shared by all extractors.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorOptions {
    values: HashMap<String, Value>,
}

impl ExtractorOptions {
    /// An empty bag, without the `"lang"` defaults.
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// A required, non-empty string option.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            None | Some(Value::Null) => Err(I18nError::MissingOption {
                key: key.to_string(),
            }),
            Some(Value::String(s)) if s.is_empty() => Err(I18nError::MissingOption {
                key: key.to_string(),
            }),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(I18nError::InvalidOption {
                key: key.to_string(),
                expected: "a string",
            }),
        }
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        let mut options = Self::empty();
        options.set(COOKIE_NAME, DEFAULT_OPTION_VALUE);
        options.set(SESSION_NAME, DEFAULT_OPTION_VALUE);
        options.set(URL_PREFIX_NAME, DEFAULT_OPTION_VALUE);
        options
    }
}

type ExtractFn = dyn Fn(&ExtractorOptions, &dyn RequestContext) -> Result<Vec<String>> + Send + Sync;

/// A named extractor function. The name keys configuration error reporting.
#[derive(Clone)]
pub struct Extractor {
    name: String,
    func: Arc<ExtractFn>,
}

impl Extractor {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ExtractorOptions, &dyn RequestContext) -> Result<Vec<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extract(&self, options: &ExtractorOptions, ctx: &dyn RequestContext) -> Result<Vec<String>> {
        (self.func)(options, ctx)
    }

    /// One language from the cookie named by `CookieName`.
    pub fn cookie() -> Self {
        Self::new("cookie", |options, ctx| {
            let name = options.get_str(COOKIE_NAME)?;
            Ok(non_empty(ctx.cookie(name)))
        })
    }

    /// One language from the session value named by `SessionName`.
    pub fn session() -> Self {
        Self::new("session", |options, ctx| {
            let key = options.get_str(SESSION_NAME)?;
            Ok(non_empty(ctx.session(key)))
        })
    }

    /// `Accept-Language` candidates in header order; quality values ignored.
    pub fn header() -> Self {
        Self::new("header", |_, ctx| {
            Ok(ctx
                .header("Accept-Language")
                .map(|h| parse_accept_language(&h))
                .unwrap_or_default())
        })
    }

    /// `Accept-Language` candidates sorted by descending quality.
    pub fn weighted_header() -> Self {
        Self::new("weighted_header", |_, ctx| {
            Ok(ctx
                .header("Accept-Language")
                .map(|h| parse_weighted_accept_language(&h))
                .unwrap_or_default())
        })
    }

    /// The route parameter named by `URLPrefixName`, only when the request
    /// path actually starts with that segment.
    pub fn url_prefix() -> Self {
        Self::new("url_prefix", |options, ctx| {
            let param = options.get_str(URL_PREFIX_NAME)?;
            let Some(lang) = ctx.param(param).filter(|l| !l.is_empty()) else {
                return Ok(Vec::new());
            };
            if has_segment_prefix(ctx.path(), &lang) {
                Ok(vec![lang])
            } else {
                Ok(Vec::new())
            }
        })
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Extractor").field(&self.name).finish()
    }
}

/// Cookie, session and header, in that order.
pub fn default_extractors() -> Vec<Extractor> {
    vec![Extractor::cookie(), Extractor::session(), Extractor::header()]
}

fn non_empty(value: Option<String>) -> Vec<String> {
    match value {
        Some(v) if !v.trim().is_empty() => vec![v.trim().to_string()],
        _ => Vec::new(),
    }
}

fn has_segment_prefix(path: &str, segment: &str) -> bool {
    match path.strip_prefix('/').and_then(|p| p.strip_prefix(segment)) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Split an `Accept-Language` value into tags, keeping header order.
///
/// ```
/// use request_i18n::i18n::parse_accept_language;
///
/// assert_eq!(
///     parse_accept_language("fr-FR,en;q=0.8, de"),
///     vec!["fr-FR", "en", "de"]
/// );
/// ```
pub fn parse_accept_language(header: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|part| {
            let tag = part.split(';').next().unwrap_or("").trim();
            (!tag.is_empty()).then(|| tag.to_string())
        })
        .collect()
}

/// Split an `Accept-Language` value and order it by quality, highest first.
///
/// Equal weights keep header order. `q=0` entries and `*` are dropped. A
/// missing or unreadable weight counts as 1.
pub fn parse_weighted_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next().unwrap_or("").trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();

    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
    weighted.into_iter().map(|(tag, _)| tag).collect()
}

/// Runs the extractor chain and appends the default language.
pub struct Negotiator {
    extractors: Vec<Extractor>,
    options: ExtractorOptions,
    default_language: String,
    reported: Mutex<HashSet<(String, String)>>,
}

impl Negotiator {
    pub fn new(extractors: Vec<Extractor>, options: ExtractorOptions, default_language: impl Into<String>) -> Self {
        Self {
            extractors,
            options,
            default_language: default_language.into(),
            reported: Mutex::new(HashSet::new()),
        }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    pub fn extractors(&self) -> &[Extractor] {
        &self.extractors
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Preference list for one request: extractor results in chain order,
    /// then the default language.
    pub fn extract(&self, ctx: &dyn RequestContext) -> Vec<String> {
        let mut languages = Vec::new();

        for extractor in &self.extractors {
            match extractor.extract(&self.options, ctx) {
                Ok(found) => languages.extend(found),
                Err(e) => self.report(extractor, &e),
            }
        }

        languages.push(self.default_language.clone());
        languages
    }

    fn report(&self, extractor: &Extractor, err: &I18nError) {
        let key = match err {
            I18nError::MissingOption { key } | I18nError::InvalidOption { key, .. } => key.clone(),
            _ => {
                error!("Language extractor '{}' failed: {}", extractor.name(), err);
                return;
            }
        };

        if self.reported.lock().insert((extractor.name().to_string(), key)) {
            error!("Language extractor '{}' disabled: {}", extractor.name(), err);
        }
    }
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("extractors", &self.extractors)
            .field("default_language", &self.default_language)
            .finish()
    }
}
