//! HTTP API request and response types

use serde::{Deserialize, Serialize};

// ============================================
// Query
// ============================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

// ============================================
// Insights & suggestions
// ============================================

#[derive(Debug, Deserialize)]
pub struct InsightsParams {
    pub actor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub report: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

// ============================================
// Rebuild
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub success: bool,
    pub cached_events: usize,
    pub indexed_documents: usize,
}

// ============================================
// Events (collaborator write path)
// ============================================

#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub actor_id: String,
    pub emotion: String,
    pub confidence: f64,
    pub detection_method: Option<String>,
    pub notes: Option<String>,
    pub display_name: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordEventResponse {
    pub id: i64,
}

// ============================================
// Stats
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub capability: String,
    pub store_events: usize,
    pub cached_events: usize,
    pub indexed_documents: usize,
}

// ============================================
// Health
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============================================
// Error
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
