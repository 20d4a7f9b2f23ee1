//! Integration tests for the translator facade
//!
//! These tests load catalogs from real directories and in-memory trees and
//! drive the full flow: negotiation, resolution, refresh and reload.

use proptest::prelude::*;
use request_i18n::i18n::{
    Args, LanguageTag, MemoryFileTree, Message, StaticRequestContext, Translator,
    TranslatorBuilder,
};
use request_i18n::I18nError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

// ==================== Test Helpers ====================

/// Write a locale file, creating parent directories as needed
fn write_locale(dir: &TempDir, relative: &str, contents: &str) {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create locale dir");
    }
    std::fs::write(&path, contents).expect("Failed to write locale file");
}

/// Push a file's modification time into the future so it is newer than any load
fn touch_future(path: &Path) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open locale file");
    file.set_modified(SystemTime::now() + Duration::from_secs(30))
        .expect("Failed to set mtime");
}

fn locale_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_locale(
        &dir,
        "en-US.yaml",
        r#"
welcome: Welcome
only_default: Only in the default language
greeting: "Hello, {{.Name}}!"
items:
  one: "{{.PluralCount}} item"
  other: "{{.PluralCount}} items"
"#,
    );
    write_locale(
        &dir,
        "fr/messages.toml",
        r#"
welcome = "Bienvenue"

[items]
one = "{{.PluralCount}} article"
other = "{{.PluralCount}} articles"
"#,
    );
    write_locale(
        &dir,
        "all.de.json",
        r#"[{"id": "welcome", "translation": "Willkommen"}]"#,
    );
    dir
}

fn translator(dir: &TempDir) -> Translator {
    TranslatorBuilder::new(
        Arc::new(request_i18n::i18n::DirFileTree::new(dir.path())),
        "en-US",
    )
    .build()
    .expect("Should build translator")
}

fn accept(value: &str) -> StaticRequestContext {
    StaticRequestContext::new().with_header("Accept-Language", value)
}

// ==================== Loading Tests ====================

#[test]
fn test_loads_every_layout() {
    let dir = locale_dir();
    let t = translator(&dir);

    assert_eq!(t.available_languages(), vec!["de", "en-US", "fr"]);
    assert_eq!(
        t.translate_with_lang("de", "welcome", &Args::None).unwrap(),
        "Willkommen"
    );
    assert_eq!(
        t.translate_with_lang("fr", "welcome", &Args::None).unwrap(),
        "Bienvenue"
    );

    let keys: Vec<String> = t.catalog().sources().iter().map(|s| s.key.clone()).collect();
    assert!(keys.contains(&"fr#messages.toml".to_string()));
}

#[test]
fn test_unreadable_catalog_aborts_construction() {
    let dir = locale_dir();
    write_locale(&dir, "es.json", "{ broken");

    let result = TranslatorBuilder::new(
        Arc::new(request_i18n::i18n::DirFileTree::new(dir.path())),
        "en-US",
    )
    .build();
    assert!(matches!(result, Err(I18nError::ParseFile { .. })));
}

// ==================== Resolution Tests ====================

#[test]
fn test_fallback_reaches_default_language() {
    let t = translator(&locale_dir());
    let uow = t.begin(&accept("ja, ko")).expect("Should begin");
    assert_eq!(
        uow.translate("only_default", &Args::None).unwrap(),
        "Only in the default language"
    );
}

#[test]
fn test_missing_id_returns_id() {
    let t = translator(&locale_dir());
    let uow = t.begin(&accept("fr")).expect("Should begin");
    assert_eq!(uow.translate("no.such.message", &Args::None).unwrap(), "no.such.message");
    assert_eq!(t.metrics().missing(), 1);
}

#[test]
fn test_plural_selection() {
    let t = translator(&locale_dir());
    let uow = t.begin(&accept("en")).expect("Should begin");

    assert_eq!(uow.translate("items", &Args::count(1)).unwrap(), "1 item");
    assert_eq!(uow.translate("items", &Args::count(5)).unwrap(), "5 items");
    assert!(matches!(
        uow.translate("items", &Args::count("abc")),
        Err(I18nError::MalformedCount { .. })
    ));
}

#[test]
fn test_template_data_from_struct() {
    #[derive(serde::Serialize)]
    struct Greeting {
        #[serde(rename = "Name")]
        name: &'static str,
    }

    let t = translator(&locale_dir());
    let uow = t.begin(&accept("en-US")).expect("Should begin");
    let args = Args::with(&Greeting { name: "Ada" }).expect("Should serialize");
    assert_eq!(uow.translate("greeting", &args).unwrap(), "Hello, Ada!");
}

// ==================== Negotiation Tests ====================

#[test]
fn test_header_order_is_preserved() {
    let t = translator(&locale_dir());
    let uow = t.begin(&accept("fr-FR,en;q=0.8, de")).expect("Should begin");
    assert_eq!(uow.languages(), ["fr-FR", "en", "de", "en-US"]);
    assert_eq!(uow.translate("welcome", &Args::None).unwrap(), "Bienvenue");
}

#[test]
fn test_cookie_beats_header() {
    let t = translator(&locale_dir());
    let ctx = accept("fr").with_cookie("lang", "de");
    let uow = t.begin(&ctx).expect("Should begin");
    assert_eq!(uow.translate("welcome", &Args::None).unwrap(), "Willkommen");
}

#[test]
fn test_refresh_applies_to_later_calls() {
    let t = translator(&locale_dir());
    let mut uow = t.begin(&accept("fr")).expect("Should begin");

    t.refresh(&mut uow, "de");
    assert_eq!(uow.languages(), ["de", "fr", "en-US"]);
    for _ in 0..3 {
        assert_eq!(uow.translate("welcome", &Args::None).unwrap(), "Willkommen");
    }
    // Not in German, so the previously extracted French still applies
    assert_eq!(uow.translate("items", &Args::count(2)).unwrap(), "2 articles");
}

// ==================== Catalog Tests ====================

#[test]
fn test_available_languages_include_injected() {
    let t = translator(&locale_dir());
    t.add_translation("es", vec![Message::text("welcome", "Bienvenido")])
        .expect("Should add");
    t.add_translation("es", vec![Message::text("bye", "Adiós")])
        .expect("Should add");

    let languages = t.available_languages();
    assert_eq!(languages, vec!["de", "en-US", "es", "fr"]);
    let mut sorted = languages.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(languages, sorted);
}

#[test]
fn test_injected_translations_survive_reload() {
    let dir = locale_dir();
    let t = translator(&dir);
    t.add_translation("es", vec![Message::text("welcome", "Bienvenido")])
        .expect("Should add");

    t.reload().expect("Should reload");
    assert_eq!(
        t.translate_with_lang("es", "welcome", &Args::None).unwrap(),
        "Bienvenido"
    );
}

#[test]
fn test_changed_file_is_reloaded_in_development() {
    let dir = locale_dir();
    let t = translator(&dir);
    assert!(!t.is_stale());

    write_locale(&dir, "fr/messages.toml", "welcome = \"Salut\"\n");
    touch_future(&dir.path().join("fr/messages.toml"));

    let uow = t.begin(&accept("fr")).expect("Should begin");
    assert_eq!(uow.translate("welcome", &Args::None).unwrap(), "Salut");
    assert_eq!(t.metrics().reloads(), 2);
}

#[test]
fn test_broken_reload_keeps_previous_catalog() {
    let dir = locale_dir();
    let t = translator(&dir);

    write_locale(&dir, "fr/messages.toml", "welcome = ");
    touch_future(&dir.path().join("fr/messages.toml"));

    assert!(t.begin(&accept("fr")).is_err());
    assert_eq!(
        t.translate_with_lang("fr", "welcome", &Args::None).unwrap(),
        "Bienvenue"
    );
    assert_eq!(t.metrics().reload_failures(), 1);
}

// ==================== Concurrency Tests ====================

#[test]
fn test_reload_swap_is_atomic_for_readers() {
    let tree = Arc::new(MemoryFileTree::new());
    tree.insert("en.json", r#"{"first": "v0", "second": "v0"}"#);
    let t = Arc::new(
        TranslatorBuilder::new(tree.clone(), "en")
            .environment("production")
            .build()
            .expect("Should build translator"),
    );
    let en = LanguageTag::parse("en").expect("Should parse");

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for version in 1..=50 {
                tree.insert(
                    "en.json",
                    format!(r#"{{"first": "v{version}", "second": "v{version}"}}"#),
                );
                t.reload().expect("Should reload");
            }
        });

        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..500 {
                    let catalog = t.catalog();
                    let first = catalog.get(&en, "first").expect("first").template(None);
                    let second = catalog.get(&en, "second").expect("second").template(None);
                    assert_eq!(first, second, "observed a half-swapped catalog");

                    let resolved = t
                        .translate_with_lang("en", "first", &Args::None)
                        .expect("Should resolve");
                    assert!(resolved.starts_with('v'));
                }
            });
        }
    });

    assert_eq!(
        t.translate_with_lang("en", "second", &Args::None).unwrap(),
        "v50"
    );
}

// ==================== Property Tests ====================

proptest! {
    #[test]
    fn prop_language_tag_round_trip(tag in "[a-z]{2,3}(-[A-Z][a-z]{3})?(-[A-Z]{2})?") {
        let parsed = LanguageTag::parse(&tag).expect("Should parse generated tag");
        prop_assert_eq!(parsed.to_string(), tag.clone());

        let reparsed = LanguageTag::parse(parsed.as_str()).expect("Should reparse");
        prop_assert_eq!(reparsed, parsed);
    }

    #[test]
    fn prop_header_extraction_keeps_order(tags in proptest::collection::vec("[a-z]{2}", 1..6)) {
        let header = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| format!("{};q=0.{}", tag, 9 - i))
            .collect::<Vec<_>>()
            .join(", ");
        prop_assert_eq!(request_i18n::i18n::parse_accept_language(&header), tags);
    }
}
