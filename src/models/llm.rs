use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trend::{ChangeEvent, NoSignalReason};

/// Structured result extracted from a free-text AI answer, or produced by
/// the template fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    pub title: Option<String>,
    pub message: String,
    pub recommendation: Option<String>,
}

/// Where an analysis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Ai,
    Cache,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedAnalysis {
    #[serde(flatten)]
    pub analysis: StructuredAnalysis,
    pub source: AnalysisSource,
}

/// Response of the on-demand analysis endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysisResponse {
    pub keyword: String,
    pub series_len: usize,
    pub change: Option<ChangeEvent>,
    pub no_signal_reason: Option<NoSignalReason>,
    pub significant: bool,
    pub threshold_percent: f64,
    pub analysis: Option<ComposedAnalysis>,
}

// ==============================================================================
// Chat Assistant
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub degraded: bool,
}
