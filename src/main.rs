use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use request_i18n::{
    config::Config,
    http::{i18n_middleware, language_cookie},
    i18n::{template_data, Args, LanguageTag, Translator, UnitOfWork},
    I18nError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    translator: Arc<Translator>,
    cookie_name: String,
    url_prefix: bool,
}

struct AppError(I18nError);

impl From<I18nError> for AppError {
    fn from(err: I18nError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            I18nError::InvalidLanguage { .. } | I18nError::MalformedCount { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_i18n=info".parse()?),
        )
        .init();

    info!("Starting request-i18n demo server");

    let config = Config::from_env()?;
    let translator = Arc::new(config.translator()?);

    let report = translator.validate();
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    for error in &report.errors {
        warn!("{}", error);
    }
    info!("Available languages: {:?}", translator.available_languages());

    let state = AppState {
        translator,
        cookie_name: config.cookie_name.clone(),
        url_prefix: config.url_prefix,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/items/:count", get(items))
        .route("/languages", get(languages))
        .route("/language/:lang", post(change_language))
        .route("/metrics", get(metrics));

    if state.url_prefix {
        router = router
            .route("/:lang", get(index))
            .route("/:lang/items/:count", get(items));
    }

    router
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.translator),
            i18n_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(Extension(uow): Extension<UnitOfWork>) -> Result<Json<Value>, AppError> {
    let message = uow.translate("welcome", &Args::None)?;
    Ok(Json(json!({
        "message": message,
        "languages": uow.languages(),
    })))
}

async fn items(
    Extension(uow): Extension<UnitOfWork>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let count = params.get("count").cloned().unwrap_or_default();
    let message = uow.translate("items", &Args::count(count))?;
    Ok(Json(json!({ "message": message })))
}

async fn languages(
    State(state): State<AppState>,
    Extension(uow): Extension<UnitOfWork>,
) -> Json<Value> {
    Json(json!({
        "available": state.translator.available_languages(),
        "preferred": uow.languages(),
    }))
}

async fn change_language(
    State(state): State<AppState>,
    Extension(mut uow): Extension<UnitOfWork>,
    Path(lang): Path<String>,
) -> Result<Response, AppError> {
    let tag = LanguageTag::parse(&lang)?;
    state.translator.refresh(&mut uow, tag.as_str());

    let data = template_data(&json!({ "Language": tag.as_str() }))?;
    let message = uow.translate("language_changed", &Args::data(data))?;
    let cookie = language_cookie(&state.cookie_name, tag.as_str());

    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({
            "message": message,
            "languages": uow.languages(),
        })),
    )
        .into_response())
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "metrics": state.translator.metrics().report(),
        "validation": state.translator.validate(),
    }))
}
