use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State, rejection::JsonRejection},
    http::{
        HeaderValue, Method, StatusCode,
        header::{self, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use eatthis_core::models::{
    ImportSummary, IngredientSuggestion, NewRecipe, RecipeCard, RecipeDetail, TimerStats,
    validate_time_seconds,
};
use eatthis_core::seed::SeedSummary;
use eatthis_core::service::{
    DEFAULT_AUTOCOMPLETE_LIMIT, DEFAULT_SEARCH_LIMIT, RecipeService, normalize_query,
    search_cache_key,
};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB
const SEARCH_CACHE_CONTROL: &str = "s-maxage=30, stale-while-revalidate=120";
const DETAIL_CACHE_CONTROL: &str = "s-maxage=60, stale-while-revalidate=300";

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<RecipeService>>,
    admin_token: Arc<str>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, RecipeService> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    ingredients: Vec<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<RecipeCard>,
}

#[derive(Deserialize)]
struct AutocompleteQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct AutocompleteResponse {
    suggestions: Vec<IngredientSuggestion>,
}

/// `ids` is kept loose: anything other than an array of integers yields no recipes.
#[derive(Deserialize)]
struct BatchBody {
    #[serde(default)]
    ids: serde_json::Value,
}

impl BatchBody {
    fn ids(&self) -> Vec<i64> {
        self.ids
            .as_array()
            .map(|ids| ids.iter().filter_map(serde_json::Value::as_i64).collect())
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct BatchResponse {
    recipes: Vec<RecipeCard>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerBody {
    time_seconds: Option<f64>,
}

#[derive(Serialize)]
struct TimerRecorded {
    success: bool,
    #[serde(flatten)]
    stats: TimerStats,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportBody {
    Bare(Vec<NewRecipe>),
    Wrapped {
        recipes: Vec<NewRecipe>,
        #[serde(default, rename = "dryRun")]
        dry_run: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    dry_run: bool,
    #[serde(flatten)]
    summary: ImportSummary,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    /// A body extractor refused the request with its own status (413, 415, ...).
    Rejected { status: StatusCode, message: String },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// The data store failed; the message chain is returned to the caller.
    Upstream { error: String, details: String },
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, plain(msg)),
            Self::Rejected { status, message } => (status, plain(message)),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, plain(msg)),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, plain(msg)),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, plain(msg)),
            Self::Upstream { error, details } => {
                error!(%details, "{error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error,
                        details: Some(details),
                    },
                )
            }
            Self::Internal(err) => {
                error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    plain("Internal server error".to_string()),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn plain(error: String) -> ErrorResponse {
    ErrorResponse {
        error,
        details: None,
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn store_error(err: anyhow::Error) -> ApiError {
    ApiError::Upstream {
        error: "Database query failed".to_string(),
        details: format!("{err:#}"),
    }
}

/// Malformed or mistyped JSON is a 400; other rejections keep their status.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            ApiError::BadRequest(rejection.body_text())
        }
        _ => ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        },
    })
}

fn parse_recipe_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid recipe id '{raw}'")))
}

// --- Middleware ---

async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        None => ApiError::Unauthorized("Missing authorization header".to_string()).into_response(),
        Some(token) if token != &*state.admin_token => {
            warn!("rejected admin request with a wrong token");
            ApiError::Forbidden("Invalid authorization token".to_string()).into_response()
        }
        Some(_) => next.run(request).await,
    }
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_body(body)?;
    if body.ingredients.is_empty() {
        return Err(ApiError::BadRequest(
            "ingredients must be a non-empty array".to_string(),
        ));
    }
    let limit = body.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let normalized = normalize_query(&body.ingredients);
    if normalized.is_empty() {
        return Ok(Json(SearchResponse {
            results: Vec::new(),
        })
        .into_response());
    }

    let results = state
        .service()
        .search_normalized(&normalized, limit)
        .map_err(store_error)?;

    let mut response = Json(SearchResponse { results }).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(SEARCH_CACHE_CONTROL),
    );
    if let Ok(key) = HeaderValue::from_bytes(search_cache_key(&normalized, limit).as_bytes()) {
        headers.insert("x-cache-key", key);
    }
    Ok(response)
}

async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_AUTOCOMPLETE_LIMIT);
    let suggestions = state
        .service()
        .autocomplete(&query.q, limit)
        .map_err(store_error)?;
    Ok(Json(AutocompleteResponse { suggestions }))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_recipe_id(&id)?;
    let detail = state.service().recipe_detail(id).map_err(store_error)?;
    let Some(detail) = detail else {
        return Err(ApiError::NotFound(format!("Recipe {id} not found")));
    };
    let mut response = Json::<RecipeDetail>(detail).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(DETAIL_CACHE_CONTROL),
    );
    Ok(response)
}

async fn recipes_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchBody>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let body = json_body(body)?;
    let recipes = state
        .service()
        .recipes_by_ids(&body.ids())
        .map_err(store_error)?;
    Ok(Json(BatchResponse { recipes }))
}

async fn get_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimerStats>, ApiError> {
    let id = parse_recipe_id(&id)?;
    let stats = state.service().time_stats(id).map_err(store_error)?;
    Ok(Json(stats))
}

async fn record_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TimerBody>, JsonRejection>,
) -> Result<Json<TimerRecorded>, ApiError> {
    let id = parse_recipe_id(&id)?;
    let body = json_body(body)?;
    let seconds = body
        .time_seconds
        .ok_or_else(|| ApiError::BadRequest("timeSeconds is required".to_string()))?;
    validate_time_seconds(seconds).map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;

    let service = state.service();
    if !service.recipe_exists(id).map_err(store_error)? {
        return Err(ApiError::NotFound(format!("Recipe {id} not found")));
    }
    let stats = service.record_time(id, seconds).map_err(store_error)?;
    Ok(Json(TimerRecorded {
        success: true,
        stats,
    }))
}

async fn admin_seed(State(state): State<AppState>) -> Result<Json<SeedSummary>, ApiError> {
    let summary = state.service().seed_demo()?;
    Ok(Json(summary))
}

async fn admin_import(
    State(state): State<AppState>,
    body: Result<Json<ImportBody>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let (recipes, dry_run) = match json_body(body)? {
        ImportBody::Wrapped { recipes, dry_run } => (recipes, dry_run),
        ImportBody::Bare(recipes) => (recipes, false),
    };
    for (idx, recipe) in recipes.iter().enumerate() {
        eatthis_core::models::validate_new_recipe(recipe)
            .map_err(|e| ApiError::BadRequest(format!("Recipe #{} is invalid: {e:#}", idx + 1)))?;
    }
    let summary = state.service().import_recipes(&recipes, dry_run)?;
    Ok(Json(ImportResponse { dry_run, summary }))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/admin/seed", post(admin_seed))
        .route("/api/admin/import", post(admin_import))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/search", post(search))
        .route("/api/autocomplete", get(autocomplete))
        .route("/api/recipes/batch", post(recipes_batch))
        .route("/api/recipes/{id}", get(get_recipe))
        .route("/api/recipes/{id}/timer", get(get_timer).post(record_timer))
        .merge(admin)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

fn token_hint(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// The full token is shown only on the run that generated it.
fn admin_token_banner(token: &str, newly_created: bool) -> String {
    if newly_created {
        format!(
            "Generated admin token: {token}\nUse it as 'Authorization: Bearer <token>' on /api/admin/* (saved to the admin_token file in the data directory)"
        )
    } else {
        format!(
            "Admin token: {} (see admin_token file in data directory)",
            token_hint(token)
        )
    }
}

pub async fn start_server(
    service: RecipeService,
    port: u16,
    bind: &str,
    admin_token: &str,
    new_admin_token: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        admin_token: Arc::from(admin_token),
    };

    let app = build_router(state);

    eprintln!("{}", admin_token_banner(admin_token, new_admin_token));

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
