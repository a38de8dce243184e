pub mod cortex_service;
pub mod ollama_service;
pub mod open_ai_service;
