//! Catalog consistency validation.
//!
//! Every language is compared with a reference language (normally the
//! translator's default) to catch the mistakes that only show up at render
//! time: placeholders that were renamed or dropped in translation, plural
//! categories a language's rules need but the message does not provide, and
//! templates that can never expand.

use crate::i18n::catalog::{Catalog, Message, MessageBody};
use crate::i18n::language::LanguageTag;
use crate::i18n::plural::{categories, PluralCategory};
use crate::i18n::template;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Validation report containing errors and warnings about a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Problems that make a message fail at render time
    pub errors: Vec<String>,

    /// Suspicious differences between a translation and the reference
    pub warnings: Vec<String>,

    /// Number of reference messages each language lacks
    pub missing: BTreeMap<String, usize>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            missing: BTreeMap::new(),
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    ///
    /// Missing messages do not count; they resolve through fallback.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for loaded catalogs.
pub struct CatalogValidator;

impl CatalogValidator {
    /// Validate every language of `catalog` against `reference`.
    ///
    /// This function checks that:
    /// - every template in every language is well formed (error)
    /// - the reference language exists (error)
    /// - each translation uses the same placeholders as the reference (warning)
    /// - plural messages carry every category their language's rules use (warning)
    ///
    /// Messages the reference lacks are counted per language in `missing`.
    pub fn validate(catalog: &Catalog, reference: &LanguageTag) -> ValidationReport {
        let mut report = ValidationReport::new();

        let Some(reference_messages) = catalog.messages(reference) else {
            report
                .errors
                .push(format!("Reference language {} has no messages", reference));
            return report;
        };

        for language in catalog.languages() {
            let Some(messages) = catalog.messages(language) else {
                continue;
            };

            let mut ids: Vec<&String> = messages.keys().collect();
            ids.sort();
            for id in ids {
                let message = &messages[id];
                Self::check_templates(language, message, &mut report);
                Self::check_plural_forms(language, message, &mut report);

                if language == reference {
                    continue;
                }
                if let Some(original) = reference_messages.get(id) {
                    let expected = Self::placeholders(original);
                    let found = Self::placeholders(message);
                    if expected != found {
                        report.warnings.push(format!(
                            "Placeholder mismatch in {} '{}': {} has {:?}, translation has {:?}",
                            language, id, reference, expected, found
                        ));
                    }
                }
            }

            if language != reference {
                let missing = reference_messages
                    .keys()
                    .filter(|id| !messages.contains_key(*id))
                    .count();
                if missing > 0 {
                    report.missing.insert(language.to_string(), missing);
                }
            }
        }

        report
    }

    fn check_templates(language: &LanguageTag, message: &Message, report: &mut ValidationReport) {
        for text in message.templates() {
            if let Err(e) = template::check(&message.id, text) {
                report.errors.push(format!("{}: {}", language, e));
            }
        }
    }

    fn check_plural_forms(language: &LanguageTag, message: &Message, report: &mut ValidationReport) {
        let MessageBody::Plural(forms) = &message.body else {
            return;
        };

        let lacking: Vec<&str> = categories(language.language())
            .iter()
            .filter(|c| !forms.contains_key(*c))
            .map(PluralCategory::as_str)
            .collect();
        if !lacking.is_empty() {
            report.warnings.push(format!(
                "Plural forms missing in {} '{}': {}",
                language,
                message.id,
                lacking.join(", ")
            ));
        }
    }

    fn placeholders(message: &Message) -> BTreeSet<String> {
        message
            .templates()
            .into_iter()
            .flat_map(template::placeholders)
            .collect()
    }
}
