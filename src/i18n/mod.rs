//! Internationalization (i18n) module: request-scoped message translation.
//!
//! # Architecture
//!
//! - `language`: Language tags, canonical form and fallback chains
//! - `source`: Read-only file trees the catalogs are loaded from
//! - `registry`: Unmarshallers keyed by file extension
//! - `catalog`: Messages, catalogs and the atomically published catalog store
//! - `plural`: CLDR plural operands and per-language rules
//! - `template`: `{{.Name}}` placeholder expansion
//! - `resolver`: Preference-ordered lookup (`Localizer`)
//! - `negotiator`: Extractor chain building the language preference list
//! - `reload`: Staleness checks for development mode
//! - `translator`: The facade tying everything together per unit of work
//! - `validator`: Cross-language catalog consistency
//! - `metrics`: Translation observability and metrics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use request_i18n::i18n::{Args, MemoryFileTree, StaticRequestContext, TranslatorBuilder};
//!
//! let tree = MemoryFileTree::new()
//!     .with_file("en.json", r#"{"items": {"one": "{{.PluralCount}} item", "other": "{{.PluralCount}} items"}}"#)
//!     .with_file("es.json", r#"{"items": {"one": "{{.PluralCount}} artículo", "other": "{{.PluralCount}} artículos"}}"#);
//! let translator = TranslatorBuilder::new(Arc::new(tree), "en").build()?;
//!
//! let request = StaticRequestContext::new().with_header("Accept-Language", "es-MX, en;q=0.5");
//! let uow = translator.begin(&request)?;
//! assert_eq!(uow.translate("items", &Args::count(1))?, "1 artículo");
//! assert_eq!(uow.translate("items", &Args::count(5))?, "5 artículos");
//! # Ok::<(), request_i18n::I18nError>(())
//! ```

mod catalog;
mod language;
mod metrics;
mod negotiator;
mod plural;
mod registry;
mod reload;
mod resolver;
mod source;
mod template;
mod translator;
mod validator;

pub use catalog::{
    decode_document, infer_language, source_key, Catalog, CatalogSource, CatalogStore, Message,
    MessageBody, ParsedFile, LANGUAGE_HEADER,
};
pub use language::LanguageTag;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use negotiator::{
    default_extractors, parse_accept_language, parse_weighted_accept_language, Extractor,
    ExtractorOptions, Negotiator, RequestContext, StaticRequestContext, COOKIE_NAME, SESSION_NAME,
    URL_PREFIX_NAME,
};
pub use plural::{categories, plural_category, PluralCategory, PluralOperands};
pub use registry::{FormatRegistry, UnmarshalFn};
pub use reload::{ReloadSupervisor, DEVELOPMENT};
pub use resolver::{template_data, Args, Localizer, PluralCount, TemplateData, COUNT_KEY, PLURAL_COUNT_KEY};
pub use source::{DirFileTree, FileEntry, FileTree, MemoryFileTree};
pub use template::{expand, placeholders};
pub use translator::{TranslateHelper, Translator, TranslatorBuilder, UnitOfWork};
pub use validator::{CatalogValidator, ValidationReport};
