use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::LearnError,
    models::{ReviewOutcome, ReviewRequest},
    router::AppState,
    routes::check_user_id,
    session::NextCard,
    store::ReviewStore,
};

// POST learn/{deck_id}/init
pub async fn init_learning<S: ReviewStore>(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState<S>>>,
    Path(deck_id): Path<i32>,
) -> Result<impl IntoResponse, LearnError> {
    let user_id = check_user_id(user_id)?;
    state
        .learn
        .init(&user_id, deck_id, Utc::now().naive_utc())
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

// GET learn/{deck_id}/next, `null` when nothing is due
pub async fn next_card<S: ReviewStore>(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState<S>>>,
    Path(deck_id): Path<i32>,
) -> Result<impl IntoResponse, LearnError> {
    let user_id = check_user_id(user_id)?;
    let card = match state
        .learn
        .next_card(&user_id, deck_id, Utc::now().naive_utc())
        .await?
    {
        NextCard::Due(card) => Some(card),
        NextCard::NoneDue(_) => None,
    };
    Ok(Json(card))
}

// GET learn/{deck_id}/next-date, naive UTC timestamp
pub async fn next_date<S: ReviewStore>(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState<S>>>,
    Path(deck_id): Path<i32>,
) -> Result<impl IntoResponse, LearnError> {
    let user_id = check_user_id(user_id)?;
    let next_date = state.learn.next_date(&user_id, deck_id).await?;
    Ok(Json(next_date))
}

// GET learn/{deck_id}/stats
pub async fn deck_stats<S: ReviewStore>(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState<S>>>,
    Path(deck_id): Path<i32>,
) -> Result<impl IntoResponse, LearnError> {
    let user_id = check_user_id(user_id)?;
    let stats = state
        .learn
        .stats(&user_id, deck_id, Utc::now().naive_utc())
        .await?;
    Ok(Json(stats))
}

// POST learn/{flashcard_id}/review
pub async fn review_card<S: ReviewStore>(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState<S>>>,
    Path(flashcard_id): Path<i32>,
    Json(review): Json<ReviewRequest>,
) -> Result<impl IntoResponse, LearnError> {
    let user_id = check_user_id(user_id)?;
    let updated = state
        .learn
        .review(
            &user_id,
            flashcard_id,
            review.quality,
            Utc::now().naive_utc(),
        )
        .await?;
    Ok(Json(ReviewOutcome::from(updated)))
}
