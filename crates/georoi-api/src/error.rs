use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use georoi_core::error::GeoroiError;
use serde::Serialize;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GeoroiError> for ApiError {
    fn from(err: GeoroiError) -> Self {
        match &err {
            GeoroiError::RoiNotFound { .. } => {
                Self::not_found("ROI not found").with_details(err.to_string())
            }
            GeoroiError::IntersectionNotFound { .. } => {
                Self::not_found("Intersection not computed").with_details(err.to_string())
            }
            GeoroiError::InvalidGeometry { reason } => {
                Self::bad_request("Invalid GeoJSON").with_details(reason.clone())
            }
            GeoroiError::InvalidParameter { .. } => {
                Self::unprocessable("Invalid parameter").with_details(err.to_string())
            }
            GeoroiError::Remote(_) => {
                tracing::error!(error = %err, "Imagery request failed");
                Self::internal("Imagery request failed").with_details(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "Request failed");
                Self::internal("Internal error").with_details(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: "Invalid request body".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: "Invalid query parameters".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GeoroiError::RoiNotFound { roi_id: "x".into() }, StatusCode::NOT_FOUND),
            (GeoroiError::IntersectionNotFound { roi_id: "x".into() }, StatusCode::NOT_FOUND),
            (
                GeoroiError::InvalidGeometry {
                    reason: "empty".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                GeoroiError::InvalidParameter {
                    field: "year".into(),
                    reason: "r".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (GeoroiError::Remote("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_invalid_geometry_details_carry_reason() {
        let err = ApiError::from(GeoroiError::InvalidGeometry {
            reason: "geometry is empty".into(),
        });
        assert_eq!(err.details.as_deref(), Some("geometry is empty"));
    }
}
