//! Sync gateway
//!
//! HTTP boundary between clients and the durable store. Requests are
//! deserialized, handed to the store unchanged and the store's errors mapped
//! to status codes. No roster logic lives here.

use axum::{
    extract::{
        rejection::JsonRejection, DefaultBodyLimit, FromRequest, FromRequestParts, Path, Request,
        State,
    },
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use roster_common::{AddChampion, ChampionPatch, ChampionRecord, RosterError};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::database::{champion_count, insert_champion, list_champions, update_champion};
use crate::error::ServerError;

/// Default request body limit (16 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Gateway settings that are not the database itself
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Bearer token required on POST/PUT; `None` leaves writes open
    pub write_token: Option<String>,
    pub body_limit: usize,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            write_token: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl From<&ServerConfig> for GatewayOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            write_token: config.active_write_token().map(str::to_string),
            body_limit: config.body_limit_bytes(),
        }
    }
}

/// Shared application state (thread-safe database connection + write token)
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    write_token: Option<Arc<str>>,
}

impl AppState {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ServerError> {
        self.db.lock().map_err(|_| ServerError::LockPoisoned)
    }
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl ApiResponse<()> {
    fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            code: None,
        }
    }

    fn failure(code: &'static str, error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            code: Some(code),
        }
    }
}

#[derive(Serialize)]
struct CreatedId {
    id: String,
}

#[derive(Serialize)]
struct Health {
    champions: i64,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Roster(err) => {
                let status = match err {
                    RosterError::Validation(_) => StatusCode::BAD_REQUEST,
                    RosterError::DuplicateId(_) => StatusCode::CONFLICT,
                    RosterError::NotFound(_) => StatusCode::NOT_FOUND,
                    RosterError::Unauthorized => StatusCode::UNAUTHORIZED,
                    RosterError::Transport(_) => StatusCode::BAD_GATEWAY,
                };
                (status, ApiResponse::failure(err.code(), err.detail()))
            }
            ServerError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiResponse::failure("VALIDATION_ERROR", self.to_string()),
            ),
            _ => {
                log::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failure(
                        "INTERNAL_ERROR",
                        "An unexpected error occurred".to_string(),
                    ),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// A `Json<T>` wrapper that turns body rejections into validation errors,
/// so clients always receive the JSON error envelope
struct GatewayJson<T>(T);

impl<S, T> FromRequest<S> for GatewayJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(GatewayJson(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ServerError::PayloadTooLarge)
            }
            Err(rejection) => Err(RosterError::Validation(rejection.body_text()).into()),
        }
    }
}

/// Proof that the request may write. Checks `Authorization: Bearer <token>`
/// when a write token is configured.
struct WriteAccess;

impl FromRequestParts<AppState> for WriteAccess {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.write_token.as_deref() else {
            return Ok(WriteAccess);
        };

        let provided = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match provided {
            Some(token) if token == expected => Ok(WriteAccess),
            _ => {
                log::warn!("Rejected {} {} without valid write token", parts.method, parts.uri);
                Err(RosterError::Unauthorized.into())
            }
        }
    }
}

/// GET /api/health
async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Health>>, ServerError> {
    let conn = state.lock()?;
    let champions = champion_count(&conn)?;
    Ok(Json(ApiResponse::ok(Health { champions })))
}

/// GET /api/champions
async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChampionRecord>>>, ServerError> {
    let conn = state.lock()?;
    let champions = list_champions(&conn)?;
    log::debug!("Listing {} champions", champions.len());
    Ok(Json(ApiResponse::ok(champions)))
}

/// POST /api/champions
async fn add_handler(
    State(state): State<AppState>,
    _access: WriteAccess,
    GatewayJson(request): GatewayJson<AddChampion>,
) -> Result<Json<ApiResponse<CreatedId>>, ServerError> {
    let record = request.into_record();
    let mut conn = state.lock()?;
    insert_champion(&mut conn, &record)?;
    Ok(Json(ApiResponse::ok(CreatedId { id: record.id })))
}

/// PUT /api/champions/{id}
async fn update_handler(
    State(state): State<AppState>,
    _access: WriteAccess,
    Path(id): Path<String>,
    GatewayJson(patch): GatewayJson<ChampionPatch>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    let mut conn = state.lock()?;
    update_champion(&mut conn, &id, &patch)?;
    Ok(Json(ApiResponse::done()))
}

/// Build the gateway router
pub fn create_router(db: Arc<Mutex<Connection>>, options: GatewayOptions) -> Router {
    let state = AppState {
        db,
        write_token: options.write_token.map(Arc::from),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/champions", get(list_handler).post(add_handler))
        .route("/api/champions/{id}", put(update_handler))
        .layer(DefaultBodyLimit::max(options.body_limit))
        .layer(cors)
        .with_state(state)
}

/// Serve the gateway on an already bound listener
pub async fn serve_on(
    listener: TcpListener,
    db: Arc<Mutex<Connection>>,
    options: GatewayOptions,
) -> std::io::Result<()> {
    let app = create_router(db, options);
    axum::serve(listener, app).await
}

/// Start the gateway (async)
///
/// Binds to the configured address; 0.0.0.0 by default to work with Docker
/// port mapping.
pub async fn serve(
    db: Arc<Mutex<Connection>>,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Sync gateway listening on {}", addr);

    serve_on(listener, db, GatewayOptions::from(config)).await?;
    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
