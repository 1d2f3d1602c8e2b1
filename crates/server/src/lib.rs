use axum::{
    Json,
    http::{StatusCode, header},
    response::IntoResponse,
};
use engine::EngineError;

use api_types::ErrorBody;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod auth;
mod categories;
mod server;
mod statistics;
mod transactions;

pub enum ServerError {
    Engine(EngineError),
    /// No bearer token on a protected route.
    Unauthenticated,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::DuplicateAccount(_)
        | EngineError::ExistingKey(_)
        | EngineError::CategoryInUse(_) => StatusCode::CONFLICT,
        EngineError::InvalidCredentials
        | EngineError::TokenExpired
        | EngineError::TokenInvalid(_)
        | EngineError::AccountNotFound(_) => StatusCode::UNAUTHORIZED,
        EngineError::WrongPassword => StatusCode::BAD_REQUEST,
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Hashing(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Hashing(detail) => {
            tracing::error!("password hashing error: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
        };

        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(ErrorBody { error }),
            )
                .into_response()
        } else {
            (status, Json(ErrorBody { error })).into_response()
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
