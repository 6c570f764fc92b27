use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::models::RecipeParams;
use crate::sanitize::SanitizePolicy;
use crate::{auth, fetch};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a request needs, built once at startup. Read-only afterwards,
/// so handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sanitizer: Arc<SanitizePolicy>,
    pub http: reqwest::Client,
    pub gemini: GeminiClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let gemini = GeminiClient::new(&config.gemini_base_url, &config.google_api_key);
        Self {
            config: Arc::new(config),
            sanitizer: Arc::new(SanitizePolicy::ugc()),
            http: reqwest::Client::new(),
            gemini,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Routing on `post` rejects other methods with 405.
        .route("/recepie", post(recipe_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// The request pipeline: auth → body decode → fetch → sanitize → extract.
/// Each stage is terminal on failure; errors map to a coarse status with no
/// body and are logged with context here.
async fn recipe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RecipeParams>, JsonRejection>,
) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        tracing::warn!("missing or malformed authorization header");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let claims = match auth::verify(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "authorization rejected");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let Json(params) = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    tracing::info!(
        url = %params.url,
        subject = claims.sub.as_deref().unwrap_or("-"),
        "extracting ingredients"
    );

    let html = match fetch::fetch_html(&state.http, &params.url).await {
        Ok(html) => html,
        Err(e) => {
            tracing::error!(error = %e, url = %params.url, "failed to fetch html");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let sanitized = state.sanitizer.sanitize(&html);

    match state.gemini.extract(&sanitized).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, url = %params.url, "ingredient extraction failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
