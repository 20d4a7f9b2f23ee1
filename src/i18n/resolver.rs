//! Message resolution: preference-ordered lookup, plural selection and
//! template expansion.

use crate::error::{I18nError, Result};
use crate::i18n::catalog::{CatalogStore, Message};
use crate::i18n::language::LanguageTag;
use crate::i18n::metrics::TranslationMetrics;
use crate::i18n::plural::{plural_category, PluralCategory, PluralOperands};
use crate::i18n::template;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Template data: named values addressed by placeholders.
pub type TemplateData = Map<String, Value>;

/// Template data key that carries an explicit plural count.
pub const PLURAL_COUNT_KEY: &str = "PluralCount";

/// Template data key that may carry the count when none is passed explicitly.
pub const COUNT_KEY: &str = "Count";

/// Serialize any struct-like value into template data.
///
/// # Example
/// ```
/// use request_i18n::i18n::template_data;
///
/// #[derive(serde::Serialize)]
/// struct Greeting { #[serde(rename = "Name")] name: &'static str }
///
/// let data = template_data(&Greeting { name: "Ada" })?;
/// assert_eq!(data["Name"], "Ada");
/// # Ok::<(), request_i18n::I18nError>(())
/// ```
pub fn template_data<T: Serialize>(value: &T) -> Result<TemplateData> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(I18nError::InvalidTemplateData {
            reason: format!("got {other}"),
        }),
        Err(e) => Err(I18nError::InvalidTemplateData {
            reason: e.to_string(),
        }),
    }
}

/// A plural count: an integer, a float, or a decimal string such as `"1.5"`.
#[derive(Debug, Clone, PartialEq)]
pub enum PluralCount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl PluralCount {
    /// CLDR operands; malformed text is an error.
    pub fn operands(&self) -> Result<PluralOperands> {
        match self {
            PluralCount::Int(n) => Ok(PluralOperands::from_i64(*n)),
            PluralCount::Float(f) => PluralOperands::from_f64(*f),
            PluralCount::Text(s) => PluralOperands::parse(s),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            PluralCount::Int(n) => Value::from(*n),
            PluralCount::Float(f) => Value::from(*f),
            PluralCount::Text(s) => Value::from(s.clone()),
        }
    }

    /// A count carried in template data: a number or a decimal string.
    fn from_value(value: &Value) -> Option<PluralCount> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(PluralCount::Int(i)),
                None => n.as_f64().map(PluralCount::Float),
            },
            Value::String(s) => Some(PluralCount::Text(s.clone())),
            _ => None,
        }
    }
}

macro_rules! plural_count_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for PluralCount {
            fn from(value: $t) -> Self {
                PluralCount::Int(i64::from(value))
            }
        })*
    };
}

plural_count_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for PluralCount {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(PluralCount::Int)
            .unwrap_or_else(|_| PluralCount::Text(value.to_string()))
    }
}

impl From<usize> for PluralCount {
    fn from(value: usize) -> Self {
        PluralCount::from(value as u64)
    }
}

impl From<f32> for PluralCount {
    fn from(value: f32) -> Self {
        PluralCount::Float(f64::from(value))
    }
}

impl From<f64> for PluralCount {
    fn from(value: f64) -> Self {
        PluralCount::Float(value)
    }
}

impl From<&str> for PluralCount {
    fn from(value: &str) -> Self {
        PluralCount::Text(value.to_string())
    }
}

impl From<String> for PluralCount {
    fn from(value: String) -> Self {
        PluralCount::Text(value)
    }
}

/// Arguments to a translation call.
///
/// * `None` - plain lookup, no expansion, no plural logic
/// * `Count` - plural count; the count is exposed to the template as `PluralCount`
/// * `Data` - template data; a numeric `Count` field drives plural selection
/// * `CountAndData` - both
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Args {
    #[default]
    None,
    Count(PluralCount),
    Data(TemplateData),
    CountAndData(PluralCount, TemplateData),
}

impl Args {
    pub fn count(count: impl Into<PluralCount>) -> Self {
        Args::Count(count.into())
    }

    pub fn data(data: TemplateData) -> Self {
        Args::Data(data)
    }

    pub fn count_and_data(count: impl Into<PluralCount>, data: TemplateData) -> Self {
        Args::CountAndData(count.into(), data)
    }

    /// Template data serialized from a struct-like value.
    pub fn with<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Args::Data(template_data(value)?))
    }

    fn explicit_count(&self) -> Option<&PluralCount> {
        match self {
            Args::Count(c) | Args::CountAndData(c, _) => Some(c),
            _ => None,
        }
    }
}

impl From<TemplateData> for Args {
    fn from(data: TemplateData) -> Self {
        Args::Data(data)
    }
}

/// A localizer bound to one preference list and a catalog store.
///
/// Cloning is cheap; every call reads a single catalog snapshot.
#[derive(Clone)]
pub struct Localizer {
    store: Arc<CatalogStore>,
    metrics: Arc<TranslationMetrics>,
    preferences: Vec<String>,
    search: Vec<LanguageTag>,
}

impl Localizer {
    /// Bind a preference list. Entries that are not valid tags are skipped;
    /// every valid entry is expanded through its fallback chain.
    pub fn new(
        store: Arc<CatalogStore>,
        metrics: Arc<TranslationMetrics>,
        preferences: Vec<String>,
    ) -> Self {
        let mut search = Vec::new();
        for preference in &preferences {
            match LanguageTag::parse(preference) {
                Ok(tag) => search.extend(tag.fallback_chain()),
                Err(e) => debug!("Ignoring preferred language: {}", e),
            }
        }

        Self {
            store,
            metrics,
            preferences,
            search,
        }
    }

    /// The preference list this localizer was bound to.
    pub fn languages(&self) -> &[String] {
        &self.preferences
    }

    /// Tags in the order they are searched.
    pub fn search_order(&self) -> &[LanguageTag] {
        &self.search
    }

    /// Resolve `message_id` against the preference list.
    ///
    /// # Returns
    /// * `Ok(text)` from the first language that has the message
    /// * `Ok(message_id)` if no language has it
    /// * `Err(MalformedCount)` if an explicit count cannot be read, even when
    ///   the message is missing
    /// * `Err(MissingTemplateField | MalformedTemplate)` on expansion errors
    pub fn localize(&self, message_id: &str, args: &Args) -> Result<String> {
        let explicit = args
            .explicit_count()
            .map(|count| count.operands().map(|op| (count, op)))
            .transpose()?;

        let catalog = self.store.snapshot();
        let found = self
            .search
            .iter()
            .find_map(|tag| catalog.get(tag, message_id).map(|message| (tag, message)));

        let (tag, message) = match found {
            Some(hit) => hit,
            None => {
                self.metrics.record_missing();
                debug!(
                    "No translation for '{}' in {:?}, returning the id",
                    message_id, self.preferences
                );
                return Ok(message_id.to_string());
            }
        };
        self.metrics.record_resolved();

        let category = self.category(tag, message, args, explicit.as_ref().map(|(_, op)| op))?;
        let template = message.template(category);

        match args {
            Args::None => Ok(template.to_string()),
            Args::Count(_) => {
                let mut data = TemplateData::new();
                if let Some((count, _)) = &explicit {
                    data.insert(PLURAL_COUNT_KEY.to_string(), count.to_value());
                }
                template::expand(message_id, template, Some(&data))
            }
            Args::Data(data) => template::expand(message_id, template, Some(data)),
            Args::CountAndData(count, data) => {
                if data.contains_key(PLURAL_COUNT_KEY) {
                    template::expand(message_id, template, Some(data))
                } else {
                    let mut data = data.clone();
                    data.insert(PLURAL_COUNT_KEY.to_string(), count.to_value());
                    template::expand(message_id, template, Some(&data))
                }
            }
        }
    }

    fn category(
        &self,
        tag: &LanguageTag,
        message: &Message,
        args: &Args,
        explicit: Option<&PluralOperands>,
    ) -> Result<Option<PluralCategory>> {
        if !message.is_plural() {
            return Ok(None);
        }

        let operands = match (explicit, args) {
            (Some(op), _) => Some(*op),
            (None, Args::Data(data)) => {
                let implicit = data
                    .get(COUNT_KEY)
                    .or_else(|| data.get(PLURAL_COUNT_KEY))
                    .and_then(PluralCount::from_value);
                match implicit {
                    Some(count) => Some(count.operands()?),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(operands.map(|op| plural_category(tag.language(), &op)))
    }
}

impl std::fmt::Debug for Localizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizer")
            .field("preferences", &self.preferences)
            .finish()
    }
}
