//! HTTP server exposing sessions and the analysis engine.
//!
//! This module provides an HTTP server that:
//! - Manages sessions and their recorded samples per calling clinician
//! - Runs analyses through the `SessionAnalyzer`
//! - Serves stored results and exportable screening reports
//!
//! Callers identify themselves with `Authorization: Bearer <caller-id>`.
//!
//! # Architecture
//!
//! ```text
//! Recorder ──→ POST /sessions/:id/samples ──→ MemoryStore
//!                                                 ↓
//! Clinician ──→ POST /sessions/:id/analyze ──→ SessionAnalyzer ──→ result
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::audit::{ActivityLog, SharedActivityLog};
use crate::core::{ReportBuilder, ScreeningReport, SessionAnalyzer};
use crate::error::AnalysisError;
use crate::session::{
    AnalysisResult, CallerId, MemoryStore, NewSession, NewStimulus, Sample, Session, SessionId,
    Stimulus, StimulusCategory,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Directory for the session snapshot and activity log; in-memory only when `None`
    pub data_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn new(port: u16, data_path: Option<PathBuf>) -> Self {
        Self { port, data_path }
    }
}

/// Shared server state
pub struct ServerState {
    store: Arc<MemoryStore>,
    analyzer: SessionAnalyzer<Arc<MemoryStore>, Arc<MemoryStore>>,
    activity: SharedActivityLog,
    reports: ReportBuilder,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let (store, activity) = match config.data_path {
            Some(ref dir) => (
                MemoryStore::with_persistence(dir.join("sessions.json")),
                ActivityLog::with_persistence(dir.join("audit.json")),
            ),
            None => (MemoryStore::new(), ActivityLog::new()),
        };
        Self::with_store(Arc::new(store), Arc::new(activity))
    }

    pub fn with_store(store: Arc<MemoryStore>, activity: SharedActivityLog) -> Self {
        Self {
            analyzer: SessionAnalyzer::new(store.clone(), store.clone()),
            store,
            activity,
            reports: ReportBuilder::new(),
        }
    }

    fn save_activity(&self) {
        if let Err(e) = self.activity.save() {
            tracing::warn!("Failed to save activity log: {}", e);
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Response from the samples endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub recorded: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct StimulusQuery {
    pub category: Option<StimulusCategory>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn reject(err: AnalysisError) -> ApiError {
    let status = match err {
        AnalysisError::Unauthorized => StatusCode::UNAUTHORIZED,
        AnalysisError::AccessDenied(_) => StatusCode::FORBIDDEN,
        AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
        AnalysisError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
        }),
    )
}

/// Run store work on the blocking pool; persisted mutations rewrite the snapshot file.
async fn blocking<T, F>(state: &Arc<ServerState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&ServerState) -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| reject(AnalysisError::Storage(format!("store task failed: {e}"))))?
        .map_err(reject)
}

/// Resolve the caller from the bearer token.
fn authenticate(headers: &HeaderMap) -> Result<CallerId, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    CallerId::authenticate(token).map_err(reject)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /sessions
async fn create_session(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(new): Json<NewSession>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let caller = authenticate(&headers)?;
    let session = blocking(&state, move |s| s.store.create_session(&caller, new)).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /sessions
async fn list_sessions(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Session>> {
    let caller = authenticate(&headers)?;
    state.store.list_sessions(&caller).map(Json).map_err(reject)
}

/// GET /sessions/:id
async fn get_session(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    let caller = authenticate(&headers)?;
    state
        .store
        .get_session(&caller, &SessionId::new(id))
        .map(Json)
        .map_err(reject)
}

/// POST /sessions/:id/complete
async fn complete_session(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    let caller = authenticate(&headers)?;
    blocking(&state, move |s| {
        s.store.complete_session(&caller, &SessionId::new(id))
    })
    .await
    .map(Json)
}

/// POST /sessions/:id/samples
async fn record_samples(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(samples): Json<Vec<Sample>>,
) -> ApiResult<RecordResponse> {
    let caller = authenticate(&headers)?;
    let id = SessionId::new(id);

    blocking(&state, move |s| {
        let recorded = s.store.record_samples(&caller, &id, samples)?;
        let total = s.store.sample_count(&caller, &id)?;

        s.activity.record_samples(recorded as u64);
        s.save_activity();

        Ok(RecordResponse { recorded, total })
    })
    .await
    .map(Json)
}

/// POST /sessions/:id/analyze
async fn analyze_session(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<AnalysisResult> {
    let caller = authenticate(&headers)?;

    blocking(&state, move |s| {
        let outcome = s.analyzer.analyze(&caller, &SessionId::new(id));
        match &outcome {
            Ok(_) => s.activity.record_analysis_completed(),
            Err(AnalysisError::InsufficientData(_)) => s.activity.record_analysis_refused(),
            Err(_) => {}
        }
        s.save_activity();
        outcome
    })
    .await
    .map(Json)
}

/// GET /sessions/:id/analysis
async fn get_analysis(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Option<AnalysisResult>> {
    let caller = authenticate(&headers)?;
    state
        .analyzer
        .get_result(&caller, &SessionId::new(id))
        .map(Json)
        .map_err(reject)
}

/// GET /sessions/:id/report
async fn get_report(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ScreeningReport> {
    let caller = authenticate(&headers)?;
    let session = state
        .store
        .get_session(&caller, &SessionId::new(id))
        .map_err(reject)?;

    let result = session.analysis_results.as_ref().ok_or_else(|| {
        reject(AnalysisError::InvalidInput(format!(
            "session {} has not been analyzed",
            session.id
        )))
    })?;
    let report = state.reports.build(&session, result);

    blocking(&state, |s| {
        s.activity.record_report_exported();
        s.save_activity();
        Ok(())
    })
    .await?;

    Ok(Json(report))
}

/// GET /stimuli
async fn list_stimuli(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<StimulusQuery>,
) -> ApiResult<Vec<Stimulus>> {
    authenticate(&headers)?;
    state
        .store
        .active_stimuli(query.category)
        .map(Json)
        .map_err(reject)
}

/// POST /stimuli
async fn register_stimulus(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(new): Json<NewStimulus>,
) -> Result<(StatusCode, Json<Stimulus>), ApiError> {
    authenticate(&headers)?;
    let stimulus = blocking(&state, move |s| s.store.register_stimulus(new)).await?;
    Ok((StatusCode::CREATED, Json(stimulus)))
}

/// Build the router over an existing state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/complete", post(complete_session))
        .route("/sessions/:id/samples", post(record_samples))
        .route("/sessions/:id/analyze", post(analyze_session))
        .route("/sessions/:id/analysis", get(get_analysis))
        .route("/sessions/:id/report", get(get_report))
        .route("/stimuli", get(list_stimuli).post(register_stimulus))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Ocular screen server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
