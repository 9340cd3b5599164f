//! REST API handlers grouped by domain.

pub mod session;
pub mod stats;

use axum::Json;
use axum::http::StatusCode;
use pyro_pipeline::{CommandError, RenderError};
use serde_json::{Value, json};

use crate::services::ServiceError;

type ApiError = (StatusCode, Json<Value>);

/// Standard error response.
pub fn err_json(status: u16, message: &str) -> ApiError {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({ "status": "error", "error": message })),
    )
}

/// Map a service failure to its HTTP status. Missing images are an expected
/// precondition, not a fault.
pub fn service_err(err: ServiceError) -> ApiError {
    match &err {
        ServiceError::Render(RenderError::Decode(e)) => {
            tracing::debug!("Upload could not be decoded: {e}");
            err_json(422, "send a valid image (PNG, JPEG or BMP)")
        }
        ServiceError::Command(CommandError::MissingImage) => {
            tracing::debug!("Command needs an image first");
            err_json(409, &err.to_string())
        }
        ServiceError::Command(_) | ServiceError::BadRequest(_) => err_json(400, &err.to_string()),
        ServiceError::Throttled => err_json(429, &err.to_string()),
        ServiceError::Timeout(_) => {
            tracing::warn!("{err}");
            err_json(504, &err.to_string())
        }
        ServiceError::Render(_) | ServiceError::Db(_) | ServiceError::Join(_) => {
            tracing::error!("Request failed: {err}");
            err_json(500, &err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status_of(err: ServiceError) -> u16 {
        service_err(err).0.as_u16()
    }

    #[test]
    fn maps_service_errors_to_statuses() {
        assert_eq!(status_of(CommandError::MissingImage.into()), 409);
        assert_eq!(status_of(CommandError::UnknownCommand("x".into()).into()), 400);
        assert_eq!(status_of(CommandError::InvalidDelta("x".into()).into()), 400);
        assert_eq!(status_of(ServiceError::BadRequest("gif".into())), 400);
        assert_eq!(status_of(ServiceError::Throttled), 429);
        assert_eq!(status_of(ServiceError::Timeout(Duration::from_secs(1))), 504);
        assert_eq!(
            status_of(RenderError::InvalidTarget("0x0".into()).into()),
            500
        );
        let decode = pyro_pipeline::decode(b"nope").unwrap_err();
        assert_eq!(status_of(decode.into()), 422);
    }

    #[test]
    fn error_body_shape() {
        let (_, Json(body)) = err_json(409, "send a photo first");
        assert_eq!(body, json!({ "status": "error", "error": "send a photo first" }));
    }
}
