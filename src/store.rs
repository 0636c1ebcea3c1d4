//! Persistence seam for review scheduling state.
pub mod memory;
pub mod postgres;

use std::{future::Future, time::Duration};

use chrono::NaiveDateTime;
use tracing::warn;

pub use crate::errors::StoreError;
use crate::models::{CardSide, ReviewState, UserId};
pub use memory::MemoryReviewStore;
pub use postgres::PgReviewStore;

/// Storage operations the learning flow needs.
///
/// Deck membership and card content belong to the catalog; the store only
/// reads them. Review states are owned here and keyed by `(user, flashcard)`.
pub trait ReviewStore: Send + Sync + 'static {
    /// True when the deck exists and is public or owned by `user_id`.
    fn can_access_deck(
        &self,
        deck_id: i32,
        user_id: &UserId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Creates a fresh state for every card of the deck the user has none for.
    /// Existing states are left alone. Returns the number of rows created.
    fn insert_missing_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
        now: NaiveDateTime,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// The user's states for cards currently in the deck.
    fn deck_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<ReviewState>, StoreError>> + Send;

    fn flashcard_exists(
        &self,
        flashcard_id: i32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Front and back side of a card.
    fn card_content(
        &self,
        flashcard_id: i32,
    ) -> impl Future<Output = Result<Option<(CardSide, CardSide)>, StoreError>> + Send;

    /// Reads the state for `(user_id, flashcard_id)`, creating a fresh one if
    /// missing, applies `transition` and stores the result. The whole step is
    /// atomic per card; on error nothing is written.
    fn apply_review<F>(
        &self,
        user_id: &UserId,
        flashcard_id: i32,
        now: NaiveDateTime,
        transition: F,
    ) -> impl Future<Output = Result<ReviewState, StoreError>> + Send
    where
        F: FnOnce(ReviewState) -> ReviewState + Send;

    fn is_token_revoked(&self, token: &str)
    -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Exponential backoff for read paths.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what, attempt, self.attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
