use ai_llm_service::HealthStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every backend probe passed, `degraded` otherwise.
    pub status: &'static str,
    pub providers: Vec<HealthStatus>,
    pub sessions: usize,
}
