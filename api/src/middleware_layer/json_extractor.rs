//! Wraps axum's plain-text client errors (unmatched routes, bad path ids,
//! wrong methods) into the JSON envelope and tags every response with an
//! `X-Request-Id`.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

const REQUEST_ID: &str = "X-Request-Id";
const KNOWN_FIELDS: &[&str] = &[
    "question",
    "variant",
    "selected_service",
    "num_retrieved_chunks",
    "num_chat_messages",
    "model_generic",
    "model_service",
    "model_aggregation",
    "model_summary",
];

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn guess_path_from_msg(msg: &str) -> Option<String> {
    KNOWN_FIELDS
        .iter()
        .find(|k| msg.contains(*k))
        .map(|k| k.to_string())
}

fn request_id(req: &Request<Body>) -> String {
    if let Some(v) = req.headers().get(REQUEST_ID).and_then(|h| h.to_str().ok()) {
        if !v.trim().is_empty() {
            return v.to_string();
        }
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    format!("req-{nanos}")
}

fn code_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        _ => "BAD_REQUEST",
    }
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let id = request_id(&req);
    let mut res = next.run(req).await;
    let id_header = HeaderValue::from_str(&id).ok();

    if !res.status().is_client_error() {
        if let Some(h) = id_header {
            res.headers_mut().insert(REQUEST_ID, h);
        }
        return res;
    }

    let status = res.status();
    let (mut parts, bytes) = take_body(res).await;
    if let Some(h) = id_header {
        parts.headers.insert(REQUEST_ID, h);
    }
    if is_json(&parts) {
        return Response::from_parts(parts, bytes.into());
    }

    let original = String::from_utf8_lossy(&bytes);
    let message = if original.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request rejected")
            .to_string()
    } else {
        original.trim().to_string()
    };
    let details = guess_path_from_msg(&message)
        .map(|p| ApiErrorDetail {
            path: Some(p),
            hint: None,
        })
        .into_iter()
        .collect();

    let envelope = ApiResponse::<()>::error(code_for(status), message, details);
    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_guess_finds_fields() {
        assert_eq!(
            guess_path_from_msg("missing field `question`").as_deref(),
            Some("question")
        );
        assert_eq!(
            guess_path_from_msg("invalid type for num_chat_messages").as_deref(),
            Some("num_chat_messages")
        );
        assert_eq!(guess_path_from_msg("nothing here"), None);
    }

    #[test]
    fn status_codes_have_stable_names() {
        assert_eq!(code_for(StatusCode::NOT_FOUND), "NOT_FOUND");
        assert_eq!(code_for(StatusCode::BAD_REQUEST), "BAD_REQUEST");
    }
}
