pub mod learn;

use axum::{http::StatusCode, response::IntoResponse};
use tracing::warn;

use crate::{errors::LearnError, models::UserId};

pub(crate) fn check_user_id(user_id: Option<UserId>) -> Result<UserId, LearnError> {
    match user_id {
        Some(user_id) if !user_id.0.is_empty() => Ok(user_id),
        _ => {
            warn!("Request without an authenticated user, rejecting");
            Err(LearnError::Unauthenticated)
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
