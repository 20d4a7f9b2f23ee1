//! axum adapter for the translator.
//!
//! `i18n_middleware` runs the per-request flow and stores the resulting
//! `UnitOfWork` in the request extensions, where handlers pick it up with
//! `Extension<UnitOfWork>`.

use crate::i18n::{RequestContext, TranslateHelper, Translator, UnitOfWork};
use axum::{
    extract::{RawPathParams, Request, State},
    http::{header::COOKIE, Extensions, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Per-client session values, shared through request extensions.
///
/// Whatever session layer the application uses inserts one of these into
/// the request before the i18n middleware runs.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

/// A [`RequestContext`] over the parts of an axum request.
pub struct HttpRequestContext<'a> {
    headers: &'a HeaderMap,
    uri: &'a Uri,
    extensions: &'a Extensions,
    params: Vec<(String, String)>,
}

impl<'a> HttpRequestContext<'a> {
    pub fn new(headers: &'a HeaderMap, uri: &'a Uri, extensions: &'a Extensions) -> Self {
        Self {
            headers,
            uri,
            extensions,
            params: Vec::new(),
        }
    }

    pub fn from_request(req: &'a Request) -> Self {
        Self::new(req.headers(), req.uri(), req.extensions())
    }

    /// Attach matched route parameters.
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }
}

impl RequestContext for HttpRequestContext<'_> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| parse_cookie_value(cookies, name))
    }

    fn session(&self, key: &str) -> Option<String> {
        self.extensions.get::<SessionStore>()?.get(key)
    }

    fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        (!values.is_empty()).then(|| values.join(","))
    }

    fn param(&self, name: &str) -> Option<String> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn path(&self) -> &str {
        self.uri.path()
    }
}

/// Value of the cookie `name` in a `Cookie` header.
pub fn parse_cookie_value(cookies: &str, name: &str) -> Option<String> {
    for part in cookies.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

/// `Set-Cookie` value remembering a language choice.
pub fn language_cookie(name: &str, lang: &str) -> String {
    format!("{}={}; Path=/; SameSite=Lax", name, lang)
}

/// Per-request translator flow.
///
/// Checks staleness on a blocking thread (a reload reads files), negotiates
/// the preference list and inserts the `UnitOfWork` along with a
/// `TranslateHelper` under the configured helper name. A request that already
/// carries one is passed through untouched. A failed reload is a 500.
///
/// Apply with `route_layer` so route parameters are available to the
/// URL-prefix extractor.
pub async fn i18n_middleware(
    State(translator): State<Arc<Translator>>,
    params: Option<RawPathParams>,
    mut req: Request,
    next: Next,
) -> Response {
    let reused = req
        .extensions()
        .get::<UnitOfWork>()
        .map(|uow| translator.helper(uow));
    if let Some(helper) = reused {
        if req.extensions().get::<TranslateHelper>().is_none() {
            req.extensions_mut().insert(helper);
        }
        return next.run(req).await;
    }

    let reloader = Arc::clone(&translator);
    match tokio::task::spawn_blocking(move || reloader.prepare()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Failed to reload translations: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
        Err(e) => {
            error!("Translation reload task failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let params = params
        .map(|p| {
            p.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let uow = {
        let ctx = HttpRequestContext::from_request(&req).with_params(params);
        translator.negotiate(&ctx)
    };
    let helper = translator.helper(&uow);
    req.extensions_mut().insert(uow);
    req.extensions_mut().insert(helper);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn request(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Should build request")
    }

    // ==================== Cookie Tests ====================

    #[test]
    fn test_parse_cookie_value() {
        let cookies = "session=abc; lang=fr; theme=dark";
        assert_eq!(parse_cookie_value(cookies, "lang"), Some("fr".to_string()));
        assert_eq!(parse_cookie_value(cookies, "missing"), None);
        assert_eq!(parse_cookie_value("lang=\"es\"", "lang"), Some("es".to_string()));
        assert_eq!(parse_cookie_value("language=de", "lang"), None);
    }

    #[test]
    fn test_language_cookie() {
        assert_eq!(language_cookie("lang", "es"), "lang=es; Path=/; SameSite=Lax");
    }

    // ==================== Context Tests ====================

    #[test]
    fn test_context_reads_cookie_across_headers() {
        let mut req = request("/items");
        req.headers_mut()
            .append(COOKIE, HeaderValue::from_static("a=1"));
        req.headers_mut()
            .append(COOKIE, HeaderValue::from_static("lang=it"));

        let ctx = HttpRequestContext::from_request(&req);
        assert_eq!(ctx.cookie("lang"), Some("it".to_string()));
        assert_eq!(ctx.path(), "/items");
    }

    #[test]
    fn test_context_reads_session_extension() {
        let mut req = request("/");
        let session = SessionStore::new();
        session.insert("lang", "pt");
        req.extensions_mut().insert(session);

        let ctx = HttpRequestContext::from_request(&req);
        assert_eq!(ctx.session("lang"), Some("pt".to_string()));
        assert_eq!(ctx.session("other"), None);
    }

    #[test]
    fn test_context_without_session() {
        let req = request("/");
        let ctx = HttpRequestContext::from_request(&req);
        assert_eq!(ctx.session("lang"), None);
    }

    #[test]
    fn test_context_headers_and_params() {
        let mut req = request("/fr/items");
        req.headers_mut().insert(
            "accept-language",
            HeaderValue::from_static("fr-FR,en;q=0.8"),
        );

        let ctx = HttpRequestContext::from_request(&req)
            .with_params(vec![("lang".to_string(), "fr".to_string())]);
        assert_eq!(ctx.header("Accept-Language"), Some("fr-FR,en;q=0.8".to_string()));
        assert_eq!(ctx.param("lang"), Some("fr".to_string()));
        assert_eq!(ctx.param("id"), None);
    }
}
