use crate::error::{ServiceError, StoreError, WizardError};
use crate::validation::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message("OK", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Handler failure, rendered as an envelope with `success: false`
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        ApiError(ServiceError::Wizard(err))
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add("request", message);
        ApiError(ServiceError::Validation(errors))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound { .. } | ServiceError::Store(StoreError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Conflict(_) | ServiceError::Wizard(_) => StatusCode::CONFLICT,
            ServiceError::Csv(_) | ServiceError::Store(StoreError::InvalidDocument(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }

        let (message, errors) = match self.0 {
            ServiceError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ServiceError::Wizard(WizardError::Busy(kind)) => {
                (format!("Another {kind} is already in progress"), None)
            }
            other => (format!("Error: {}", other), None),
        };
        let body = ApiResponse::<()> {
            success: false,
            message,
            data: None,
            errors,
        };
        (status, Json(body)).into_response()
    }
}
