//! Message catalogs: parsing, indexing and atomic publication.
//!
//! # Invariants
//!
//! 1. A load parses every file into a fresh `Catalog` and publishes it with a
//!    single pointer swap. Readers hold an `Arc<Catalog>` snapshot and never
//!    see a mix of old and new languages.
//! 2. A failed load publishes nothing; the previous catalog stays live.
//! 3. Messages injected with `add_translation` are kept in an overlay that is
//!    re-applied on top of every freshly loaded catalog.

use crate::error::{I18nError, Result};
use crate::i18n::language::LanguageTag;
use crate::i18n::plural::PluralCategory;
use crate::i18n::registry::FormatRegistry;
use crate::i18n::source::FileTree;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Top-level document key that declares the language of a file.
pub const LANGUAGE_HEADER: &str = "@language";

const PLURAL_KEYS: [&str; 6] = ["zero", "one", "two", "few", "many", "other"];
const META_KEYS: [&str; 3] = ["id", "description", "hash"];

/// Template text of a message: a single template or CLDR plural forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Plural(BTreeMap<PluralCategory, String>),
}

/// A single translatable message in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub description: Option<String>,
    pub body: MessageBody,
}

impl Message {
    /// A message with one template.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            body: MessageBody::Text(text.into()),
        }
    }

    /// A plural message. The `other` form is mandatory.
    ///
    /// # Example
    /// ```
    /// use request_i18n::i18n::{Message, PluralCategory};
    ///
    /// let message = Message::plural("items", [
    ///     (PluralCategory::One, "{{.PluralCount}} item"),
    ///     (PluralCategory::Other, "{{.PluralCount}} items"),
    /// ])?;
    /// assert!(message.is_plural());
    /// # Ok::<(), request_i18n::I18nError>(())
    /// ```
    pub fn plural<I, S>(id: impl Into<String>, forms: I) -> Result<Self>
    where
        I: IntoIterator<Item = (PluralCategory, S)>,
        S: Into<String>,
    {
        let id = id.into();
        let forms: BTreeMap<PluralCategory, String> =
            forms.into_iter().map(|(c, s)| (c, s.into())).collect();
        if !forms.contains_key(&PluralCategory::Other) {
            return Err(I18nError::InvalidMessage {
                id,
                reason: "plural message has no \"other\" form".to_string(),
            });
        }
        Ok(Self {
            id,
            description: None,
            body: MessageBody::Plural(forms),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_plural(&self) -> bool {
        matches!(self.body, MessageBody::Plural(_))
    }

    /// Template for a plural category, falling back to `other`.
    ///
    /// A text message ignores the category; a plural message with no
    /// category selected uses `other`.
    pub fn template(&self, category: Option<PluralCategory>) -> &str {
        match &self.body {
            MessageBody::Text(text) => text,
            MessageBody::Plural(forms) => category
                .and_then(|c| forms.get(&c))
                .or_else(|| forms.get(&PluralCategory::Other))
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }

    /// Every template text of this message.
    pub fn templates(&self) -> Vec<&str> {
        match &self.body {
            MessageBody::Text(text) => vec![text.as_str()],
            MessageBody::Plural(forms) => forms.values().map(String::as_str).collect(),
        }
    }
}

/// One parsed file that contributed to a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    /// Disambiguating key built from directory and base name (`"fr#messages.yaml"`).
    pub key: String,
    pub path: PathBuf,
    pub language: LanguageTag,
    pub messages: usize,
}

/// An immutable mapping from language to message id to message.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    languages: BTreeMap<LanguageTag, HashMap<String, Message>>,
    sources: Vec<CatalogSource>,
    loaded_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a message in exactly one language.
    pub fn get(&self, language: &LanguageTag, id: &str) -> Option<&Message> {
        self.languages.get(language)?.get(id)
    }

    pub fn has_language(&self, language: &LanguageTag) -> bool {
        self.languages.contains_key(language)
    }

    /// Languages in lexicographic order.
    pub fn languages(&self) -> impl Iterator<Item = &LanguageTag> {
        self.languages.keys()
    }

    pub fn messages(&self, language: &LanguageTag) -> Option<&HashMap<String, Message>> {
        self.languages.get(language)
    }

    pub fn sources(&self) -> &[CatalogSource] {
        &self.sources
    }

    /// When the file-backed part of this catalog was built; `None` if never.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn message_count(&self) -> usize {
        self.languages.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Insert messages, replacing existing ones with the same id.
    pub fn add_messages<I>(&mut self, language: LanguageTag, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        let table = self.languages.entry(language).or_default();
        for message in messages {
            table.insert(message.id.clone(), message);
        }
    }
}

/// A file decoded into a language and its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    pub language: LanguageTag,
    pub messages: Vec<Message>,
}

/// Owns the published catalog and knows how to rebuild it from a file tree.
pub struct CatalogStore {
    tree: Arc<dyn FileTree>,
    formats: FormatRegistry,
    published: RwLock<Arc<Catalog>>,
    overlay: Mutex<BTreeMap<LanguageTag, HashMap<String, Message>>>,
    writer: Mutex<()>,
}

impl CatalogStore {
    /// A store with an empty, never-loaded catalog.
    pub fn new(tree: Arc<dyn FileTree>, formats: FormatRegistry) -> Self {
        Self {
            tree,
            formats,
            published: RwLock::new(Arc::new(Catalog::new())),
            overlay: Mutex::new(BTreeMap::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn tree(&self) -> &dyn FileTree {
        self.tree.as_ref()
    }

    /// The currently published catalog.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.published.read())
    }

    /// Rebuild the catalog from every file in the tree and publish it.
    ///
    /// Files are read and parsed without touching the published catalog;
    /// any single failure aborts the load and leaves the old catalog live.
    pub fn load(&self) -> Result<Arc<Catalog>> {
        let _writer = self.writer.lock();
        self.rebuild()
    }

    /// Load only if `stale` still holds for the published catalog once the
    /// writer lock is taken. `None` means a concurrent load already ran.
    pub fn load_if<F>(&self, stale: F) -> Result<Option<Arc<Catalog>>>
    where
        F: FnOnce(Option<DateTime<Utc>>) -> bool,
    {
        let _writer = self.writer.lock();
        if !stale(self.snapshot().loaded_at()) {
            return Ok(None);
        }
        self.rebuild().map(Some)
    }

    // Caller holds the writer lock.
    fn rebuild(&self) -> Result<Arc<Catalog>> {
        let started = Utc::now();

        let mut catalog = self.build()?;
        for (language, messages) in self.overlay.lock().iter() {
            catalog.add_messages(language.clone(), messages.values().cloned());
        }
        catalog.loaded_at = Some(started);

        info!(
            "Loaded {} messages in {} languages from {} files",
            catalog.message_count(),
            catalog.languages.len(),
            catalog.sources.len()
        );

        let catalog = Arc::new(catalog);
        *self.published.write() = Arc::clone(&catalog);
        Ok(catalog)
    }

    /// Add messages directly, without a file.
    ///
    /// The live catalog is copied, extended and republished, so concurrent
    /// readers keep a consistent snapshot. The messages also survive later
    /// reloads.
    pub fn add_translation(&self, language: LanguageTag, messages: Vec<Message>) -> Result<()> {
        for message in &messages {
            if message.id.trim().is_empty() {
                return Err(I18nError::InvalidMessage {
                    id: message.id.clone(),
                    reason: "message id is empty".to_string(),
                });
            }
        }

        let _writer = self.writer.lock();
        let mut catalog = Catalog::clone(&self.snapshot());
        catalog.add_messages(language.clone(), messages.iter().cloned());
        let mut overlay = self.overlay.lock();
        let table = overlay.entry(language).or_default();
        for message in messages {
            table.insert(message.id.clone(), message);
        }
        *self.published.write() = Arc::new(catalog);
        Ok(())
    }

    /// Number of injected messages re-applied on every load.
    pub fn overlay_len(&self) -> usize {
        self.overlay.lock().values().map(HashMap::len).sum()
    }

    fn build(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();

        for entry in self.tree.walk() {
            let entry = entry?;
            if entry.is_dir {
                continue;
            }
            if is_hidden(&entry.path) {
                debug!("Skipping hidden locale file {}", entry.path.display());
                continue;
            }

            let bytes = self
                .tree
                .read(&entry.path)
                .map_err(|source| I18nError::ReadFile {
                    path: entry.path.clone(),
                    source,
                })?;
            let parsed = self.parse_file(&entry.path, &bytes)?;

            catalog.sources.push(CatalogSource {
                key: source_key(&entry.path),
                path: entry.path.clone(),
                language: parsed.language.clone(),
                messages: parsed.messages.len(),
            });
            catalog.add_messages(parsed.language, parsed.messages);
        }

        Ok(catalog)
    }

    /// Decode one file with the parser registered for its extension.
    pub fn parse_file(&self, path: &Path, bytes: &[u8]) -> Result<ParsedFile> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parser = self
            .formats
            .get(&extension)
            .ok_or_else(|| I18nError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: extension.clone(),
            })?;

        let document = parser(bytes).map_err(|e| I18nError::ParseFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        decode_document(path, document).map_err(|e| match e {
            I18nError::UnknownLanguage { .. } | I18nError::ParseFile { .. } => e,
            other => I18nError::ParseFile {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }
}

/// Key for a file that can never collide with a bare language code.
pub fn source_key(path: &Path) -> String {
    let dir = path
        .parent()
        .map(|p| p.display().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{dir}#{base}")
}

/// Language of a file: declared header, then dotted name segment
/// (`all.en-US.yaml`), then bare stem (`fr.json`), then parent directory
/// (`es/messages.toml`). Names inferred from the path must look like a
/// locale, so `messages` in `fr/app.messages.json` is never mistaken for a tag.
pub fn infer_language(path: &Path, declared: Option<&str>) -> Result<LanguageTag> {
    if let Some(declared) = declared {
        return LanguageTag::parse(declared).map_err(|e| I18nError::ParseFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        });
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(tag) = stem
        .rsplit_once('.')
        .and_then(|(_, segment)| locale_like(segment))
    {
        return Ok(tag);
    }

    if let Some(tag) = locale_like(&stem) {
        return Ok(tag);
    }

    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned());
    if let Some(tag) = parent.as_deref().and_then(locale_like) {
        return Ok(tag);
    }

    Err(I18nError::UnknownLanguage {
        path: path.to_path_buf(),
    })
}

/// A tag with a two-letter primary language or an explicit region.
fn locale_like(candidate: &str) -> Option<LanguageTag> {
    LanguageTag::parse(candidate)
        .ok()
        .filter(|tag| tag.language().len() == 2 || tag.region().is_some())
}

/// `true` if any component of `path` is dot-prefixed.
fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| {
        matches!(c, Component::Normal(name) if name.to_string_lossy().starts_with('.'))
    })
}

/// Turn a generic document tree into a language and a message list.
pub fn decode_document(path: &Path, document: Value) -> Result<ParsedFile> {
    let mut messages = Vec::new();

    let declared = match document {
        Value::Object(mut map) => {
            let declared = match map.remove(LANGUAGE_HEADER) {
                Some(Value::String(s)) => Some(s),
                Some(_) => {
                    return Err(I18nError::ParseFile {
                        path: path.to_path_buf(),
                        reason: format!("\"{LANGUAGE_HEADER}\" must be a string"),
                    })
                }
                None => None,
            };
            for (key, value) in map {
                decode_entry(&key, value, &mut messages)?;
            }
            declared
        }
        Value::Array(items) => {
            for item in items {
                messages.push(decode_list_item(item)?);
            }
            None
        }
        _ => {
            return Err(I18nError::ParseFile {
                path: path.to_path_buf(),
                reason: "expected a mapping or a list of messages".to_string(),
            })
        }
    };

    let language = infer_language(path, declared.as_deref())?;
    Ok(ParsedFile { language, messages })
}

fn decode_entry(id: &str, value: Value, out: &mut Vec<Message>) -> Result<()> {
    match value {
        Value::String(text) => {
            out.push(Message::text(id, text));
            Ok(())
        }
        Value::Object(map) => {
            if is_message_object(&map) {
                out.push(decode_message_object(id, map)?);
            } else {
                for (key, nested) in map {
                    decode_entry(&format!("{id}.{key}"), nested, out)?;
                }
            }
            Ok(())
        }
        other => Err(I18nError::InvalidMessage {
            id: id.to_string(),
            reason: format!("expected text or a mapping, found {}", value_kind(&other)),
        }),
    }
}

fn decode_list_item(item: Value) -> Result<Message> {
    let map = match item {
        Value::Object(map) => map,
        other => {
            return Err(I18nError::InvalidMessage {
                id: String::new(),
                reason: format!("list entries must be mappings, found {}", value_kind(&other)),
            })
        }
    };
    let id = match map.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => {
            return Err(I18nError::InvalidMessage {
                id: String::new(),
                reason: "list entry has no \"id\"".to_string(),
            })
        }
    };
    decode_message_object(&id, map)
}

fn is_message_object(map: &Map<String, Value>) -> bool {
    map.keys()
        .any(|k| PLURAL_KEYS.contains(&k.as_str()) || k == "translation")
}

fn decode_message_object(id: &str, map: Map<String, Value>) -> Result<Message> {
    let invalid = |reason: String| I18nError::InvalidMessage {
        id: id.to_string(),
        reason,
    };

    let mut description = None;
    let mut translation = None;
    let mut forms = Vec::new();

    for (key, value) in map {
        let text = match value {
            Value::String(s) => s,
            other => {
                return Err(invalid(format!(
                    "\"{key}\" must be text, found {}",
                    value_kind(&other)
                )))
            }
        };
        match key.as_str() {
            "description" => description = Some(text),
            "translation" => translation = Some(text),
            k if META_KEYS.contains(&k) => {}
            k => match k.parse::<PluralCategory>() {
                Ok(category) => forms.push((category, text)),
                Err(()) => return Err(invalid(format!("unexpected key \"{k}\""))),
            },
        }
    }

    let message = match (translation, forms.is_empty()) {
        (Some(text), true) => Message::text(id, text),
        (None, false) => Message::plural(id, forms)?,
        (Some(_), false) => {
            return Err(invalid(
                "\"translation\" cannot be combined with plural forms".to_string(),
            ))
        }
        (None, true) => return Err(invalid("message has no text".to_string())),
    };

    Ok(match description {
        Some(d) => message.with_description(d),
        None => message,
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
