use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Selectable models in selector order.
    pub models: Vec<String>,
    /// What a new session starts with, per role.
    pub defaults: RoleDefaults,
    pub limits: Limits,
}

#[derive(Debug, Serialize)]
pub struct RoleDefaults {
    pub generic: String,
    pub service: String,
    pub aggregation: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct Limits {
    pub num_retrieved_chunks: Bounds<u32>,
    pub num_chat_messages: Bounds<usize>,
}

#[derive(Debug, Serialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
    pub default: T,
}
