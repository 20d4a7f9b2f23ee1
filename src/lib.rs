//! Request-scoped localization: message catalogs, language negotiation,
//! plural-aware resolution and development-mode hot reload, with an axum
//! adapter.

pub mod config;
pub mod error;
pub mod http;
pub mod i18n;

pub use error::{I18nError, Result};
