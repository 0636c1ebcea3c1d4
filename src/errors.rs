//! Error handling for the API
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Failure reported by a review store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Safe to retry: pool exhaustion, I/O, lock or serialization conflicts.
    #[error("transient storage error: {0}")]
    Transient(#[source] sqlx::Error),

    #[error("storage error: {0}")]
    Fatal(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_transient(&e) {
            Self::Transient(e)
        } else {
            Self::Fatal(e)
        }
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        // serialization_failure, deadlock_detected, lock_not_available
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001" | "40P01" | "55P03"))
        }
        _ => false,
    }
}

#[derive(Error, Debug)]
pub enum LearnError {
    #[error("Review quality {0} is outside 1..=5")]
    InvalidQuality(i32),

    #[error("Learning has not been initialized for this deck")]
    DeckNotInitialized,

    #[error("Deck not found")]
    DeckNotFound,

    #[error("Flashcard not found")]
    FlashcardNotFound,

    #[error("User not found or unauthorized")]
    Unauthenticated,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LearnError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidQuality(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DeckNotInitialized => StatusCode::CONFLICT,
            Self::DeckNotFound | Self::FlashcardNotFound => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Storage(StoreError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(StoreError::Fatal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LearnError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Storage(StoreError::Transient(ref e)) => {
                error!("Transient storage failure: {}", e);
                (status, [(header::RETRY_AFTER, "1")], self.to_string()).into_response()
            }
            Self::Storage(StoreError::Fatal(ref e)) => {
                error!("Storage failure: {}", e);
                (status, self.to_string()).into_response()
            }
            _ => (status, self.to_string()).into_response(),
        }
    }
}
