use contextor::ChatVariant;
use serde::Deserialize;

/// Body of POST /sessions; an empty body picks the server's default variant.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub variant: Option<ChatVariant>,
}
