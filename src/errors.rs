// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkinError {
    #[error("Server misconfigured: {detail}")]
    Misconfigured { detail: String },

    #[error("Image is required: {detail}")]
    ImageRequired { detail: String },

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    /// Non-2xx answer from the upstream API.
    #[error("Upstream error {status}: {detail}")]
    Upstream {
        code: &'static str,
        status: u16,
        detail: String,
        raw_detail: Option<String>,
    },

    #[error("Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(String),

    /// 2xx answer whose body does not hold the expected JSON.
    #[error("Invalid model output: {detail}")]
    InvalidModelOutput {
        detail: String,
        pass: Option<bool>,
        raw: Option<Value>,
    },

    #[error("Image edit response held no image")]
    InvalidImageOutput,
}

impl SkinError {
    pub fn code(&self) -> &'static str {
        match self {
            SkinError::Misconfigured { .. } => "server_misconfigured",
            SkinError::ImageRequired { .. } => "image_required",
            SkinError::InvalidForm(_) => "invalid_form",
            SkinError::InvalidImage(_) => "invalid_image",
            SkinError::ImageProcessing(_) => "image_processing_error",
            SkinError::Upstream { code, .. } => *code,
            SkinError::UpstreamTimeout(_) => "upstream_timeout",
            SkinError::UpstreamUnreachable(_) => "upstream_unreachable",
            SkinError::InvalidModelOutput { .. } => "invalid_model_output",
            SkinError::InvalidImageOutput => "invalid_image_output",
        }
    }

    fn detail(&self) -> String {
        match self {
            SkinError::Misconfigured { detail }
            | SkinError::ImageRequired { detail }
            | SkinError::Upstream { detail, .. }
            | SkinError::InvalidModelOutput { detail, .. } => detail.clone(),
            SkinError::InvalidForm(msg)
            | SkinError::InvalidImage(msg)
            | SkinError::ImageProcessing(msg)
            | SkinError::UpstreamTimeout(msg)
            | SkinError::UpstreamUnreachable(msg) => msg.clone(),
            SkinError::InvalidImageOutput => "image edit response held no image".to_string(),
        }
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if let SkinError::InvalidModelOutput { pass: Some(pass), .. } = self {
            body.insert("pass".to_string(), json!(pass));
        }
        body.insert("error".to_string(), json!(self.code()));
        body.insert("detail".to_string(), json!(self.detail()));
        match self {
            SkinError::Upstream {
                raw_detail: Some(raw),
                ..
            } => {
                body.insert("raw_detail".to_string(), json!(raw));
            }
            SkinError::InvalidModelOutput { raw: Some(raw), .. } => {
                body.insert("raw".to_string(), raw.clone());
            }
            _ => {}
        }
        Value::Object(body)
    }
}

impl ResponseError for SkinError {
    fn status_code(&self) -> StatusCode {
        match self {
            SkinError::Misconfigured { .. } | SkinError::ImageProcessing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            SkinError::ImageRequired { .. }
            | SkinError::InvalidForm(_)
            | SkinError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            SkinError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            SkinError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SkinError::UpstreamUnreachable(_)
            | SkinError::InvalidModelOutput { .. }
            | SkinError::InvalidImageOutput => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let err = SkinError::Upstream {
            code: "openai_error",
            status: 429,
            detail: "rate limited".to_string(),
            raw_detail: None,
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.body()["error"], "openai_error");
        assert_eq!(err.body()["detail"], "rate limited");
        assert!(err.body().get("raw_detail").is_none());
    }

    #[test]
    fn bogus_upstream_status_becomes_bad_gateway() {
        let err = SkinError::Upstream {
            code: "openai_error",
            status: 42,
            detail: String::new(),
            raw_detail: Some("raw".to_string()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.body()["raw_detail"], "raw");
    }

    #[test]
    fn precheck_parse_failure_carries_pass_false() {
        let err = SkinError::InvalidModelOutput {
            detail: "parse failed".to_string(),
            pass: Some(false),
            raw: None,
        };
        let body = err.body();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(body["pass"], false);
        assert_eq!(body["error"], "invalid_model_output");
    }

    #[test]
    fn local_failures_map_to_client_or_server_status() {
        let missing = SkinError::Misconfigured {
            detail: "OPENAI_API_KEY is missing".to_string(),
        };
        assert_eq!(missing.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.code(), "server_misconfigured");

        let no_image = SkinError::ImageRequired {
            detail: "image is required".to_string(),
        };
        assert_eq!(no_image.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SkinError::UpstreamTimeout("slow".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
