use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::SchedulerError;

/// [ApiError] envuelve [SchedulerError] para convertirlo en respuesta de axum.
/// El cuerpo siempre es el error serializado (`{"code": ...}`).
#[derive(Debug)]
pub struct ApiError(pub SchedulerError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            SchedulerError::UnregisteredWorker { .. } => StatusCode::FORBIDDEN,
            SchedulerError::NoTaskAvailable => StatusCode::SERVICE_UNAVAILABLE,
            SchedulerError::JobDone => StatusCode::GONE,
            SchedulerError::OutOfBounds { .. } => StatusCode::NOT_FOUND,
            SchedulerError::WrongWorker { .. } => StatusCode::CONFLICT,
            SchedulerError::InvalidState { .. } => StatusCode::CONFLICT,
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(error: SchedulerError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.0)).into_response()
    }
}
