//! Unmarshaller registry: maps a file extension to a document parser.
//!
//! Every parser turns raw bytes into a `serde_json::Value` tree; the catalog
//! store then reads messages out of that tree, so adding a format never
//! touches the message model.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A parser from raw bytes to a generic document tree.
pub type UnmarshalFn = Arc<dyn Fn(&[u8]) -> anyhow::Result<serde_json::Value> + Send + Sync>;

/// Registry of parsers keyed by lower-case file extension (without the dot).
#[derive(Clone)]
pub struct FormatRegistry {
    parsers: HashMap<String, UnmarshalFn>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register (or replace) the parser for an extension.
    ///
    /// # Example
    /// ```
    /// use request_i18n::i18n::FormatRegistry;
    ///
    /// let mut registry = FormatRegistry::empty();
    /// registry.register("txt", |bytes: &[u8]| {
    ///     Ok(serde_json::Value::String(String::from_utf8(bytes.to_vec())?))
    /// });
    /// assert!(registry.get("TXT").is_some());
    /// ```
    pub fn register<F>(&mut self, extension: &str, parser: F)
    where
        F: Fn(&[u8]) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.parsers
            .insert(normalize_extension(extension), Arc::new(parser));
    }

    /// Look up the parser for an extension (case-insensitive, leading dot ignored).
    pub fn get(&self, extension: &str) -> Option<&UnmarshalFn> {
        self.parsers.get(&normalize_extension(extension))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.parsers.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for FormatRegistry {
    /// JSON, YAML (`yaml` and `yml`) and TOML.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("json", parse_json);
        registry.register("yaml", parse_yaml);
        registry.register("yml", parse_yaml);
        registry.register("toml", parse_toml);
        registry
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

fn parse_json(bytes: &[u8]) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::from_slice(bytes)?)
}

fn parse_yaml(bytes: &[u8]) -> anyhow::Result<serde_json::Value> {
    // An empty YAML file is a valid, empty catalog
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    Ok(serde_yaml::from_slice(bytes)?)
}

fn parse_toml(bytes: &[u8]) -> anyhow::Result<serde_json::Value> {
    let text = std::str::from_utf8(bytes)?;
    Ok(toml::from_str(text)?)
}
