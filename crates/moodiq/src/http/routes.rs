//! HTTP API routes and handlers

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use moodiq_engine::QueryError;
use moodiq_store::NewMoodEvent;
use std::sync::Arc;
use tracing::{debug, error};

use super::AppState;
use super::types::*;

type SharedState = Arc<AppState>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the router with all API endpoints
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/query", post(query))
        .route("/insights", get(insights))
        .route("/suggestions", get(suggestions))
        .route("/rebuild", post(rebuild))
        .route("/events", post(record_event))
        .with_state(state)
}

fn bad_request(error: &str, code: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

// ============================================
// Health & Stats
// ============================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn stats(State(state): State<SharedState>) -> Result<Json<StatsResponse>, ApiError> {
    let engine_stats = state.engine.stats();

    match state.store.event_count() {
        Ok(store_events) => Ok(Json(StatsResponse {
            capability: engine_stats.capability.as_str().to_string(),
            store_events,
            cached_events: engine_stats.cached_events,
            indexed_documents: engine_stats.indexed_documents,
        })),
        Err(e) => {
            error!("Failed to get stats: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to get stats".to_string(),
                    code: "STATS_ERROR".to_string(),
                }),
            ))
        }
    }
}

// ============================================
// Query
// ============================================

async fn query(
    State(state): State<SharedState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("Question cannot be empty", "INVALID_QUESTION"));
    }
    if question.len() > 500 {
        return Err(bad_request(
            "Question exceeds maximum length of 500 characters",
            "QUESTION_TOO_LONG",
        ));
    }

    debug!(question = %question, actor = ?req.actor, "HTTP query request");

    match state.engine.query(question, req.actor.as_deref()) {
        Ok(answer) => Ok(Json(QueryResponse { answer })),
        Err(QueryError::EmptyQuestion) => {
            Err(bad_request("Question cannot be empty", "INVALID_QUESTION"))
        }
        Err(QueryError::InvalidActor) => {
            Err(bad_request("Actor filter cannot be empty", "INVALID_ACTOR"))
        }
    }
}

// ============================================
// Insights & suggestions
// ============================================

async fn insights(
    State(state): State<SharedState>,
    Query(params): Query<InsightsParams>,
) -> Json<InsightsResponse> {
    debug!(actor = ?params.actor, "HTTP insights request");
    Json(InsightsResponse {
        report: state.engine.insights(params.actor.as_deref()),
    })
}

async fn suggestions(State(state): State<SharedState>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: state.engine.suggestions(),
    })
}

// ============================================
// Rebuild
// ============================================

async fn rebuild(State(state): State<SharedState>) -> Json<RebuildResponse> {
    let success = state.engine.rebuild_index();
    let engine_stats = state.engine.stats();

    Json(RebuildResponse {
        success,
        cached_events: engine_stats.cached_events,
        indexed_documents: engine_stats.indexed_documents,
    })
}

// ============================================
// Events
// ============================================

async fn record_event(
    State(state): State<SharedState>,
    Json(req): Json<RecordEventRequest>,
) -> Result<Json<RecordEventResponse>, ApiError> {
    if req.display_name.is_some() || req.group.is_some() {
        if let Err(e) = state.store.upsert_actor(
            &req.actor_id,
            req.display_name.as_deref().unwrap_or(&req.actor_id),
            req.group.as_deref().unwrap_or("Unknown"),
        ) {
            return Err(bad_request(&e.to_string(), "INVALID_ACTOR"));
        }
    }

    let event = NewMoodEvent {
        actor_id: req.actor_id,
        emotion: req.emotion,
        confidence: req.confidence,
        detection_method: req.detection_method,
        notes: req.notes,
        timestamp: None,
    };

    match state.store.record_event(&event) {
        Ok(id) => Ok(Json(RecordEventResponse { id })),
        Err(e) => Err(bad_request(&e.to_string(), "INVALID_EVENT")),
    }
}
