use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skybook_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    UnprocessableEntity(String),
    NotFoundError(String),
    ConflictError(String),
    ServiceUnavailable(String),
    GatewayTimeout(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Backend unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::FlightNotFound | BookingError::CustomerNotFound => AppError::NotFoundError(message),
            BookingError::CustomerInactive | BookingError::InvalidFlightState(_) => {
                AppError::UnprocessableEntity(message)
            }
            BookingError::InvalidRequest(_) => AppError::ValidationError(message),
            BookingError::NoAvailableSeats | BookingError::OrderCreationFailed(_) => AppError::ConflictError(message),
            BookingError::DeadlineExceeded => AppError::GatewayTimeout(message),
            BookingError::TransportFailure(_) => AppError::ServiceUnavailable(message),
        }
    }
}
