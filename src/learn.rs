//! Learning flow: initialise a deck, fetch the next card, record reviews.
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::{
    errors::LearnError,
    models::{CardToLearn, DeckStats, ReviewState, UserId},
    session::{self, NextCard, Selection},
    srs::{self, Quality},
    store::{RetryPolicy, ReviewStore},
};

pub struct LearnService<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: ReviewStore> LearnService<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn ensure_deck_access(&self, deck_id: i32, user_id: &UserId) -> Result<(), LearnError> {
        let store = &*self.store;
        let accessible = self
            .retry
            .run("deck access", move || store.can_access_deck(deck_id, user_id))
            .await?;
        if !accessible {
            debug!("Deck {} not accessible for user {}", deck_id, user_id);
            return Err(LearnError::DeckNotFound);
        }
        Ok(())
    }

    async fn deck_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
    ) -> Result<Vec<ReviewState>, LearnError> {
        self.ensure_deck_access(deck_id, user_id).await?;
        let store = &*self.store;
        let states = self
            .retry
            .run("deck states", move || store.deck_states(deck_id, user_id))
            .await?;
        Ok(states)
    }

    /// Creates review states for the deck's cards the user has not seen yet.
    /// Safe to call repeatedly; existing progress is kept.
    pub async fn init(
        &self,
        user_id: &UserId,
        deck_id: i32,
        now: NaiveDateTime,
    ) -> Result<u64, LearnError> {
        self.ensure_deck_access(deck_id, user_id).await?;
        let created = self
            .store
            .insert_missing_states(deck_id, user_id, now)
            .await?;
        info!(
            "Initialized deck {} for user {}: {} new cards",
            deck_id, user_id, created
        );
        Ok(created)
    }

    pub async fn next_card(
        &self,
        user_id: &UserId,
        deck_id: i32,
        now: NaiveDateTime,
    ) -> Result<NextCard, LearnError> {
        let states = self.deck_states(deck_id, user_id).await?;
        match session::select_next(&states, now)? {
            Selection::Due(state) => {
                let store = &*self.store;
                let flashcard_id = state.flashcard_id;
                let (front, back) = self
                    .retry
                    .run("card content", move || store.card_content(flashcard_id))
                    .await?
                    .ok_or(LearnError::FlashcardNotFound)?;
                Ok(NextCard::Due(CardToLearn::new(state, front, back)))
            }
            Selection::NoneDue(next_date) => {
                debug!("No card due in deck {} before {}", deck_id, next_date);
                Ok(NextCard::NoneDue(next_date))
            }
        }
    }

    pub async fn next_date(
        &self,
        user_id: &UserId,
        deck_id: i32,
    ) -> Result<NaiveDateTime, LearnError> {
        let states = self.deck_states(deck_id, user_id).await?;
        session::earliest_review(&states).ok_or(LearnError::DeckNotInitialized)
    }

    /// Applies a review of `quality` to the user's state for the card.
    /// Nothing is written when the quality is out of range.
    pub async fn review(
        &self,
        user_id: &UserId,
        flashcard_id: i32,
        quality: i32,
        now: NaiveDateTime,
    ) -> Result<ReviewState, LearnError> {
        let quality = Quality::try_from(quality)?;

        let store = &*self.store;
        let exists = self
            .retry
            .run("flashcard lookup", move || store.flashcard_exists(flashcard_id))
            .await?;
        if !exists {
            return Err(LearnError::FlashcardNotFound);
        }

        let state = self
            .store
            .apply_review(user_id, flashcard_id, now, move |current| {
                srs::schedule(&current, quality, now)
            })
            .await?;
        info!(
            "Reviewed flashcard {} as {} for user {}: next in {} days (efactor {:.2})",
            flashcard_id, quality, user_id, state.interval_days, state.efactor
        );
        Ok(state)
    }

    pub async fn stats(
        &self,
        user_id: &UserId,
        deck_id: i32,
        now: NaiveDateTime,
    ) -> Result<DeckStats, LearnError> {
        let states = self.deck_states(deck_id, user_id).await?;
        Ok(session::deck_stats(&states, now))
    }
}
