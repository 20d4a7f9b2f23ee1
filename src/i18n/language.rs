//! Language tag: validated, canonical language identifiers.
//!
//! This module provides the `LanguageTag` type. A tag is parsed once, is
//! immutable afterwards, and always renders in its canonical form
//! (`en-us` and `en_US` both become `en-US`).

use crate::error::{I18nError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use unic_langid::LanguageIdentifier;

/// A validated language tag.
///
/// Equality, hashing and ordering all go through the canonical string so
/// that tags can be used as sorted map keys.
#[derive(Debug, Clone)]
pub struct LanguageTag {
    id: LanguageIdentifier,
    canonical: String,
}

impl LanguageTag {
    /// Parse a language tag.
    ///
    /// # Arguments
    /// * `input` - A BCP 47 style tag such as `"en"`, `"en-US"` or `"zh_Hant_TW"`
    ///
    /// # Returns
    /// * `Ok(LanguageTag)` in canonical form
    /// * `Err(I18nError::InvalidLanguage)` if the input is empty or malformed
    ///
    /// # Example
    /// ```
    /// use request_i18n::i18n::LanguageTag;
    ///
    /// let tag = LanguageTag::parse("en_us")?;
    /// assert_eq!(tag.as_str(), "en-US");
    /// # Ok::<(), request_i18n::I18nError>(())
    /// ```
    pub fn parse(input: &str) -> Result<LanguageTag> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(I18nError::InvalidLanguage {
                input: input.to_string(),
                reason: "empty tag".to_string(),
            });
        }

        let id: LanguageIdentifier =
            trimmed
                .parse()
                .map_err(|e: unic_langid::LanguageIdentifierError| {
                    I18nError::InvalidLanguage {
                        input: input.to_string(),
                        reason: e.to_string(),
                    }
                })?;

        Ok(LanguageTag::from_identifier(id))
    }

    fn from_identifier(id: LanguageIdentifier) -> LanguageTag {
        let canonical = id.to_string();
        LanguageTag { id, canonical }
    }

    /// Canonical string form (e.g. `"en-US"`).
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Primary language subtag (e.g. `"en"` for `"en-US"`).
    ///
    /// Plural rules are selected by this subtag.
    pub fn language(&self) -> &str {
        self.id.language.as_str()
    }

    /// Region subtag, if any.
    pub fn region(&self) -> Option<&str> {
        self.id.region.as_ref().map(|r| r.as_str())
    }

    /// The tag followed by progressively less specific tags.
    ///
    /// `zh-Hant-TW` yields `["zh-Hant-TW", "zh-Hant", "zh"]`; a bare
    /// language yields just itself.
    pub fn fallback_chain(&self) -> Vec<LanguageTag> {
        let mut chain = vec![self.clone()];
        let mut current = self.id.clone();

        if current.variants().len() > 0 {
            current.clear_variants();
            chain.push(LanguageTag::from_identifier(current.clone()));
        }
        if current.region.is_some() {
            current.region = None;
            chain.push(LanguageTag::from_identifier(current.clone()));
        }
        if current.script.is_some() {
            current.script = None;
            chain.push(LanguageTag::from_identifier(current));
        }

        chain
    }
}

impl FromStr for LanguageTag {
    type Err = I18nError;

    fn from_str(s: &str) -> Result<Self> {
        LanguageTag::parse(s)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl PartialEq for LanguageTag {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for LanguageTag {}

impl Hash for LanguageTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for LanguageTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LanguageTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_simple_language() {
        let tag = LanguageTag::parse("en").expect("Should parse");
        assert_eq!(tag.as_str(), "en");
        assert_eq!(tag.language(), "en");
        assert_eq!(tag.region(), None);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let tag = LanguageTag::parse("EN-us").expect("Should parse");
        assert_eq!(tag.as_str(), "en-US");
        assert_eq!(tag.region(), Some("US"));
    }

    #[test]
    fn test_parse_accepts_underscore_separator() {
        let tag = LanguageTag::parse("pt_BR").expect("Should parse");
        assert_eq!(tag.as_str(), "pt-BR");
    }

    #[test]
    fn test_parse_script_and_region() {
        let tag = LanguageTag::parse("zh-hant-tw").expect("Should parse");
        assert_eq!(tag.as_str(), "zh-Hant-TW");
        assert_eq!(tag.language(), "zh");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let tag = LanguageTag::parse("  fr-FR ").expect("Should parse");
        assert_eq!(tag.as_str(), "fr-FR");
    }

    #[test]
    fn test_parse_empty_is_rejected() {
        let result = LanguageTag::parse("");
        assert!(matches!(result, Err(I18nError::InvalidLanguage { .. })));
    }

    #[test]
    fn test_parse_garbage_is_rejected() {
        assert!(LanguageTag::parse("not a language").is_err());
        assert!(LanguageTag::parse("e").is_err());
        assert!(LanguageTag::parse("en-!!").is_err());
    }

    #[test]
    fn test_from_str() {
        let tag: LanguageTag = "de-AT".parse().expect("Should parse");
        assert_eq!(tag.to_string(), "de-AT");
    }

    // ==================== Fallback Chain Tests ====================

    #[test]
    fn test_fallback_chain_region() {
        let tag = LanguageTag::parse("en-US").unwrap();
        let chain: Vec<String> = tag.fallback_chain().iter().map(|t| t.to_string()).collect();
        assert_eq!(chain, vec!["en-US", "en"]);
    }

    #[test]
    fn test_fallback_chain_script_and_region() {
        let tag = LanguageTag::parse("zh-Hant-TW").unwrap();
        let chain: Vec<String> = tag.fallback_chain().iter().map(|t| t.to_string()).collect();
        assert_eq!(chain, vec!["zh-Hant-TW", "zh-Hant", "zh"]);
    }

    #[test]
    fn test_fallback_chain_bare_language() {
        let tag = LanguageTag::parse("fr").unwrap();
        assert_eq!(tag.fallback_chain(), vec![tag.clone()]);
    }

    // ==================== Trait Tests ====================

    #[test]
    fn test_equality_uses_canonical_form() {
        let a = LanguageTag::parse("en-us").unwrap();
        let b = LanguageTag::parse("en_US").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut tags = vec![
            LanguageTag::parse("fr").unwrap(),
            LanguageTag::parse("de").unwrap(),
            LanguageTag::parse("en-US").unwrap(),
        ];
        tags.sort();
        let rendered: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
        assert_eq!(rendered, vec!["de", "en-US", "fr"]);
    }
}
