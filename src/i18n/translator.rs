//! The translator facade: one owned instance shared by every unit of work.
//!
//! Per unit of work the flow is: check staleness (development only) and
//! reload if needed, negotiate the preference list, bind a localizer. The
//! result is a `UnitOfWork` that callers keep in their own side state and
//! pass back in, so negotiation happens at most once per unit of work.

use crate::error::{I18nError, Result};
use crate::i18n::catalog::{Catalog, CatalogStore, Message};
use crate::i18n::language::LanguageTag;
use crate::i18n::metrics::TranslationMetrics;
use crate::i18n::negotiator::{default_extractors, Extractor, ExtractorOptions, Negotiator, RequestContext};
use crate::i18n::registry::FormatRegistry;
use crate::i18n::reload::{ReloadSupervisor, DEVELOPMENT};
use crate::i18n::resolver::{Args, Localizer};
use crate::i18n::source::FileTree;
use crate::i18n::validator::{CatalogValidator, ValidationReport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

const DEFAULT_HELPER_NAME: &str = "t";

/// Builder for [`Translator`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use request_i18n::i18n::{MemoryFileTree, TranslatorBuilder};
///
/// let tree = MemoryFileTree::new().with_file("en-US.json", r#"{"hello": "Hello"}"#);
/// let translator = TranslatorBuilder::new(Arc::new(tree), "en-US")
///     .environment("production")
///     .build()?;
/// assert_eq!(translator.available_languages(), vec!["en-US"]);
/// # Ok::<(), request_i18n::I18nError>(())
/// ```
pub struct TranslatorBuilder {
    tree: Arc<dyn FileTree>,
    default_language: String,
    helper_name: String,
    environment: String,
    extractors: Vec<Extractor>,
    options: ExtractorOptions,
    formats: FormatRegistry,
}

impl TranslatorBuilder {
    pub fn new(tree: Arc<dyn FileTree>, default_language: impl Into<String>) -> Self {
        Self {
            tree,
            default_language: default_language.into(),
            helper_name: DEFAULT_HELPER_NAME.to_string(),
            environment: DEVELOPMENT.to_string(),
            extractors: default_extractors(),
            options: ExtractorOptions::default(),
            formats: FormatRegistry::default(),
        }
    }

    /// Name under which the translate helper is exposed to view templates.
    pub fn helper_name(mut self, name: impl Into<String>) -> Self {
        self.helper_name = name.into();
        self
    }

    /// Runtime mode; catalogs are only reloaded in `"development"`.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Replace the extractor chain.
    pub fn extractors(mut self, extractors: Vec<Extractor>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Set one extractor option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Replace the whole extractor option bag.
    pub fn options(mut self, options: ExtractorOptions) -> Self {
        self.options = options;
        self
    }

    /// Register an unmarshaller for a file extension.
    pub fn register_format<F>(mut self, extension: &str, parser: F) -> Self
    where
        F: Fn(&[u8]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.formats.register(extension, parser);
        self
    }

    /// Validate the default language and perform the initial load.
    pub fn build(self) -> Result<Translator> {
        let default_language = LanguageTag::parse(&self.default_language)?;
        let store = Arc::new(CatalogStore::new(self.tree, self.formats));
        let metrics = Arc::new(TranslationMetrics::new());

        store.load()?;
        metrics.record_reload();

        info!(
            "Translator ready (default language {}, environment {})",
            default_language, self.environment
        );

        Ok(Translator {
            store,
            negotiator: Negotiator::new(self.extractors, self.options, default_language.as_str()),
            default_language,
            helper_name: self.helper_name,
            environment: self.environment,
            metrics,
        })
    }
}

/// Per-unit-of-work translation state.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    extracted: Vec<String>,
    localizer: Localizer,
}

impl UnitOfWork {
    /// The current preference list, default language last.
    pub fn languages(&self) -> &[String] {
        self.localizer.languages()
    }

    /// Languages the extractors produced when the unit of work began.
    pub fn extracted_languages(&self) -> &[String] {
        &self.extracted
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// Resolve against this unit of work's preference list.
    pub fn translate(&self, message_id: &str, args: &Args) -> Result<String> {
        self.localizer.localize(message_id, args)
    }
}

/// A translate function bound to one unit of work, under the name view
/// templates know it by.
#[derive(Debug, Clone)]
pub struct TranslateHelper {
    name: String,
    localizer: Localizer,
}

impl TranslateHelper {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, message_id: &str, args: &Args) -> Result<String> {
        self.localizer.localize(message_id, args)
    }
}

/// Owns the catalog store, the negotiator and the metrics.
pub struct Translator {
    store: Arc<CatalogStore>,
    negotiator: Negotiator,
    default_language: LanguageTag,
    helper_name: String,
    environment: String,
    metrics: Arc<TranslationMetrics>,
}

impl Translator {
    pub fn builder(tree: Arc<dyn FileTree>, default_language: impl Into<String>) -> TranslatorBuilder {
        TranslatorBuilder::new(tree, default_language)
    }

    pub fn default_language(&self) -> &LanguageTag {
        &self.default_language
    }

    pub fn helper_name(&self) -> &str {
        &self.helper_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// The published catalog.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.store.snapshot()
    }

    /// `true` when the next unit of work would trigger a reload.
    pub fn is_stale(&self) -> bool {
        ReloadSupervisor::needs_reload(
            &self.environment,
            self.store.snapshot().loaded_at(),
            self.store.tree(),
        )
    }

    /// Reload if the catalog is stale. A failed reload keeps the previous
    /// catalog live and is returned to the caller.
    ///
    /// Staleness is checked again under the writer lock, so requests that
    /// raced on the same change reload once.
    pub fn prepare(&self) -> Result<()> {
        if !self.is_stale() {
            return Ok(());
        }
        let reloaded = self.store.load_if(|loaded_at| {
            ReloadSupervisor::needs_reload(&self.environment, loaded_at, self.store.tree())
        });
        match reloaded {
            Ok(Some(_)) => {
                self.metrics.record_reload();
                Ok(())
            }
            Ok(None) => {
                debug!("Catalog already reloaded by a concurrent unit of work");
                Ok(())
            }
            Err(e) => self.reload_failed(e),
        }
    }

    /// Rebuild the catalog from the file tree unconditionally.
    pub fn reload(&self) -> Result<()> {
        match self.store.load() {
            Ok(_) => {
                self.metrics.record_reload();
                Ok(())
            }
            Err(e) => self.reload_failed(e),
        }
    }

    fn reload_failed(&self, e: I18nError) -> Result<()> {
        self.metrics.record_reload_failure();
        error!("Catalog reload failed, keeping previous catalog: {}", e);
        Err(e)
    }

    /// Start a unit of work: reload if stale, negotiate, bind a localizer.
    pub fn begin(&self, ctx: &dyn RequestContext) -> Result<UnitOfWork> {
        self.prepare()?;
        Ok(self.negotiate(ctx))
    }

    /// Negotiate and bind a localizer without the staleness check.
    ///
    /// For callers that run `prepare` themselves, e.g. on a blocking thread.
    pub fn negotiate(&self, ctx: &dyn RequestContext) -> UnitOfWork {
        let extracted = self.negotiator.extract(ctx);
        UnitOfWork {
            localizer: self.localizer(extracted.clone()),
            extracted,
        }
    }

    /// Start a unit of work only if `slot` does not already hold one.
    pub fn ensure<'a>(
        &self,
        slot: &'a mut Option<UnitOfWork>,
        ctx: &dyn RequestContext,
    ) -> Result<&'a mut UnitOfWork> {
        let uow = match slot.take() {
            Some(uow) => uow,
            None => self.begin(ctx)?,
        };
        Ok(slot.insert(uow))
    }

    /// Resolve within a unit of work.
    pub fn translate(&self, uow: &UnitOfWork, message_id: &str, args: &Args) -> Result<String> {
        uow.translate(message_id, args)
    }

    /// Resolve in one language, falling back to the default language only.
    pub fn translate_with_lang(&self, lang: &str, message_id: &str, args: &Args) -> Result<String> {
        let preferences = vec![lang.to_string(), self.default_language.to_string()];
        self.localizer(preferences).localize(message_id, args)
    }

    /// Put `new_lang` ahead of the extracted languages and rebind the
    /// localizer. Extractors are not run again.
    pub fn refresh(&self, uow: &mut UnitOfWork, new_lang: &str) {
        let mut preferences = Vec::with_capacity(uow.extracted.len() + 1);
        preferences.push(new_lang.to_string());
        preferences.extend(uow.extracted.iter().cloned());
        uow.localizer = self.localizer(preferences);
    }

    /// Every language in the catalog, sorted and unique.
    pub fn available_languages(&self) -> Vec<String> {
        self.store
            .snapshot()
            .languages()
            .map(LanguageTag::to_string)
            .collect()
    }

    /// Inject messages without a file. They survive reloads.
    pub fn add_translation(&self, lang: &str, messages: Vec<Message>) -> Result<()> {
        let language = LanguageTag::parse(lang)?;
        self.store.add_translation(language, messages)
    }

    /// Compare every language with the default language.
    pub fn validate(&self) -> ValidationReport {
        CatalogValidator::validate(&self.store.snapshot(), &self.default_language)
    }

    /// The translate helper for view templates, bound to a unit of work.
    pub fn helper(&self, uow: &UnitOfWork) -> TranslateHelper {
        TranslateHelper {
            name: self.helper_name.clone(),
            localizer: uow.localizer.clone(),
        }
    }

    fn localizer(&self, preferences: Vec<String>) -> Localizer {
        Localizer::new(Arc::clone(&self.store), Arc::clone(&self.metrics), preferences)
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("default_language", &self.default_language)
            .field("environment", &self.environment)
            .field("helper_name", &self.helper_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::negotiator::StaticRequestContext;
    use crate::i18n::source::MemoryFileTree;
    use chrono::{Duration, Utc};

    fn tree() -> Arc<MemoryFileTree> {
        let earlier = Utc::now() - Duration::seconds(60);
        let tree = MemoryFileTree::new();
        tree.insert_at(
            "en-US.json",
            r#"{"hello": "Hello", "items": {"one": "{{.PluralCount}} item", "other": "{{.PluralCount}} items"}}"#,
            earlier,
        );
        tree.insert_at("es.yaml", "hello: Hola\n", earlier);
        tree.insert_at("fr/messages.toml", "hello = \"Bonjour\"\n", earlier);
        Arc::new(tree)
    }

    fn translator(tree: Arc<MemoryFileTree>) -> Translator {
        TranslatorBuilder::new(tree, "en-US")
            .build()
            .expect("Should build translator")
    }

    fn header(value: &str) -> StaticRequestContext {
        StaticRequestContext::new().with_header("Accept-Language", value)
    }

    // ==================== Builder Tests ====================

    #[test]
    fn test_builder_defaults() {
        let t = translator(tree());
        assert_eq!(t.helper_name(), "t");
        assert_eq!(t.environment(), "development");
        assert_eq!(t.default_language().as_str(), "en-US");
        assert_eq!(t.metrics().reloads(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_default_language() {
        let result = TranslatorBuilder::new(tree(), "not a tag").build();
        assert!(matches!(result, Err(I18nError::InvalidLanguage { .. })));
    }

    #[test]
    fn test_builder_fails_on_bad_file() {
        let tree = tree();
        tree.insert("de.json", "{ nope");
        let result = TranslatorBuilder::new(tree, "en-US").build();
        assert!(matches!(result, Err(I18nError::ParseFile { .. })));
    }

    #[test]
    fn test_custom_format() {
        let tree = tree();
        tree.insert("it.kv", "hello=Ciao\n");
        let t = TranslatorBuilder::new(tree, "en-US")
            .register_format("kv", |bytes| {
                let text = std::str::from_utf8(bytes)?;
                let mut map = serde_json::Map::new();
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    let (k, v) = line
                        .split_once('=')
                        .ok_or_else(|| anyhow::anyhow!("expected key=value"))?;
                    map.insert(k.trim().to_string(), Value::from(v.trim()));
                }
                Ok(Value::Object(map))
            })
            .build()
            .expect("Should build translator");
        assert_eq!(t.translate_with_lang("it", "hello", &Args::None).unwrap(), "Ciao");
    }

    // ==================== Unit Of Work Tests ====================

    #[test]
    fn test_begin_negotiates_and_translates() {
        let t = translator(tree());
        let uow = t.begin(&header("es, fr")).expect("Should begin");
        assert_eq!(uow.languages(), ["es", "fr", "en-US"]);
        assert_eq!(t.translate(&uow, "hello", &Args::None).unwrap(), "Hola");
    }

    #[test]
    fn test_fallback_reaches_default_language() {
        let t = translator(tree());
        let uow = t.begin(&header("ja, ko")).expect("Should begin");
        assert_eq!(uow.translate("items", &Args::count(2)).unwrap(), "2 items");
    }

    #[test]
    fn test_ensure_reuses_existing_state() {
        let t = translator(tree());
        let mut slot = None;
        t.ensure(&mut slot, &header("fr")).expect("Should begin");
        let first = slot.as_ref().map(|u| u.languages().to_vec());

        t.ensure(&mut slot, &header("es")).expect("Should reuse");
        let second = slot.as_ref().map(|u| u.languages().to_vec());
        assert_eq!(first, second);
    }

    #[test]
    fn test_refresh_prepends_without_reextracting() {
        let t = translator(tree());
        let mut uow = t.begin(&header("fr")).expect("Should begin");
        assert_eq!(uow.translate("hello", &Args::None).unwrap(), "Bonjour");

        t.refresh(&mut uow, "es");
        assert_eq!(uow.languages(), ["es", "fr", "en-US"]);
        assert_eq!(uow.extracted_languages(), ["fr", "en-US"]);
        assert_eq!(uow.translate("hello", &Args::None).unwrap(), "Hola");
    }

    #[test]
    fn test_translate_with_lang() {
        let t = translator(tree());
        assert_eq!(t.translate_with_lang("fr", "hello", &Args::None).unwrap(), "Bonjour");
        assert_eq!(
            t.translate_with_lang("fr", "items", &Args::count(1)).unwrap(),
            "1 item"
        );
        assert_eq!(t.translate_with_lang("fr", "unknown", &Args::None).unwrap(), "unknown");
    }

    #[test]
    fn test_helper_uses_configured_name() {
        let t = TranslatorBuilder::new(tree(), "en-US")
            .helper_name("tr")
            .build()
            .expect("Should build translator");
        let uow = t.begin(&header("es")).expect("Should begin");
        let helper = t.helper(&uow);
        assert_eq!(helper.name(), "tr");
        assert_eq!(helper.call("hello", &Args::None).unwrap(), "Hola");
    }

    // ==================== Catalog Tests ====================

    #[test]
    fn test_available_languages_sorted() {
        let t = translator(tree());
        t.add_translation("de", vec![Message::text("hello", "Hallo")])
            .expect("Should add");
        assert_eq!(t.available_languages(), vec!["de", "en-US", "es", "fr"]);
    }

    #[test]
    fn test_add_translation_rejects_bad_tag() {
        let t = translator(tree());
        assert!(t.add_translation("", vec![Message::text("a", "b")]).is_err());
    }

    #[test]
    fn test_reload_on_change_in_development() {
        let tree = tree();
        let t = translator(tree.clone());
        assert!(!t.is_stale());

        tree.insert_at(
            "es.yaml",
            "hello: Buenas\n",
            Utc::now() + Duration::seconds(5),
        );
        assert!(t.is_stale());

        let uow = t.begin(&header("es")).expect("Should begin");
        assert_eq!(uow.translate("hello", &Args::None).unwrap(), "Buenas");
        assert_eq!(t.metrics().reloads(), 2);
    }

    #[test]
    fn test_no_reload_in_production() {
        let tree = tree();
        let t = TranslatorBuilder::new(tree.clone(), "en-US")
            .environment("production")
            .build()
            .expect("Should build translator");

        tree.insert_at("es.yaml", "hello: Buenas\n", Utc::now() + Duration::seconds(5));
        let uow = t.begin(&header("es")).expect("Should begin");
        assert_eq!(uow.translate("hello", &Args::None).unwrap(), "Hola");
    }

    #[test]
    fn test_failed_reload_keeps_previous_catalog() {
        let tree = tree();
        let t = translator(tree.clone());

        tree.insert_at("es.yaml", "hello: [unclosed\n", Utc::now() + Duration::seconds(5));
        assert!(t.begin(&header("es")).is_err());
        assert_eq!(t.metrics().reload_failures(), 1);
        assert_eq!(t.translate_with_lang("es", "hello", &Args::None).unwrap(), "Hola");

        tree.insert_at("es.yaml", "hello: Hola otra vez\n", Utc::now() + Duration::seconds(10));
        t.prepare().expect("Should reload");
        assert_eq!(
            t.translate_with_lang("es", "hello", &Args::None).unwrap(),
            "Hola otra vez"
        );
    }

    #[test]
    fn test_concurrent_prepare_reloads_once() {
        let tree = tree();
        let t = translator(tree.clone());
        std::thread::sleep(std::time::Duration::from_millis(5));
        tree.insert("es.yaml", "hello: Buenas\n");
        assert!(t.is_stale());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| t.prepare().expect("Should prepare"));
            }
        });

        assert!(!t.is_stale());
        assert_eq!(t.metrics().reloads(), 2);
        assert_eq!(t.translate_with_lang("es", "hello", &Args::None).unwrap(), "Buenas");
    }

    #[test]
    fn test_validate_reports_against_default() {
        let t = translator(tree());
        t.add_translation("fr", vec![Message::text("items", "{{.Nombre}} articles")])
            .expect("Should add");
        let report = t.validate();
        assert!(report.has_warnings());
        assert_eq!(report.missing.get("es"), Some(&1));
    }
}
