use chrono::NaiveDateTime;
use dashmap::{DashMap, DashSet, mapref::entry::Entry};

use super::{ReviewStore, StoreError};
use crate::models::{CardSide, ReviewState, UserId};

#[derive(Clone, Debug)]
struct DeckRecord {
    owner_id: UserId,
    public: bool,
    flashcards: Vec<i32>,
}

/// In-process store. Each `(user, flashcard)` entry is updated under its
/// shard lock, so review transitions are atomic per card.
#[derive(Default)]
pub struct MemoryReviewStore {
    decks: DashMap<i32, DeckRecord>,
    cards: DashMap<i32, (CardSide, CardSide)>,
    states: DashMap<(UserId, i32), ReviewState>,
    revoked_tokens: DashSet<String>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_deck(&self, deck_id: i32, owner_id: impl Into<UserId>, public: bool) {
        self.decks.insert(
            deck_id,
            DeckRecord {
                owner_id: owner_id.into(),
                public,
                flashcards: Vec::new(),
            },
        );
    }

    /// Registers a card and puts it in `deck_id`. Side ids are derived from
    /// the card id.
    pub fn add_card(&self, deck_id: i32, flashcard_id: i32, front: &str, back: &str) {
        self.cards.entry(flashcard_id).or_insert_with(|| {
            (
                CardSide {
                    id: flashcard_id * 2,
                    content: front.to_string(),
                },
                CardSide {
                    id: flashcard_id * 2 + 1,
                    content: back.to_string(),
                },
            )
        });
        if let Some(mut deck) = self.decks.get_mut(&deck_id) {
            if !deck.flashcards.contains(&flashcard_id) {
                deck.flashcards.push(flashcard_id);
            }
        }
    }

    pub fn remove_card_from_deck(&self, deck_id: i32, flashcard_id: i32) {
        if let Some(mut deck) = self.decks.get_mut(&deck_id) {
            deck.flashcards.retain(|id| *id != flashcard_id);
        }
    }

    pub fn revoke_token(&self, token: &str) {
        self.revoked_tokens.insert(token.to_string());
    }

    pub fn state(&self, user_id: &UserId, flashcard_id: i32) -> Option<ReviewState> {
        self.states
            .get(&(user_id.clone(), flashcard_id))
            .map(|s| s.value().clone())
    }

    fn deck_cards(&self, deck_id: i32) -> Vec<i32> {
        self.decks
            .get(&deck_id)
            .map(|d| d.flashcards.clone())
            .unwrap_or_default()
    }
}

impl ReviewStore for MemoryReviewStore {
    async fn can_access_deck(&self, deck_id: i32, user_id: &UserId) -> Result<bool, StoreError> {
        Ok(self
            .decks
            .get(&deck_id)
            .is_some_and(|d| d.public || &d.owner_id == user_id))
    }

    async fn insert_missing_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
        now: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        let mut created = 0;
        for flashcard_id in self.deck_cards(deck_id) {
            if let Entry::Vacant(slot) = self.states.entry((user_id.clone(), flashcard_id)) {
                slot.insert(ReviewState::new(flashcard_id, user_id.clone(), now));
                created += 1;
            }
        }
        Ok(created)
    }

    async fn deck_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
    ) -> Result<Vec<ReviewState>, StoreError> {
        let mut states: Vec<ReviewState> = self
            .deck_cards(deck_id)
            .into_iter()
            .filter_map(|id| self.state(user_id, id))
            .collect();
        states.sort_by_key(|s| (s.next_review_date, s.flashcard_id));
        Ok(states)
    }

    async fn flashcard_exists(&self, flashcard_id: i32) -> Result<bool, StoreError> {
        Ok(self.cards.contains_key(&flashcard_id))
    }

    async fn card_content(
        &self,
        flashcard_id: i32,
    ) -> Result<Option<(CardSide, CardSide)>, StoreError> {
        Ok(self.cards.get(&flashcard_id).map(|c| c.value().clone()))
    }

    async fn apply_review<F>(
        &self,
        user_id: &UserId,
        flashcard_id: i32,
        now: NaiveDateTime,
        transition: F,
    ) -> Result<ReviewState, StoreError>
    where
        F: FnOnce(ReviewState) -> ReviewState + Send,
    {
        let mut entry = self
            .states
            .entry((user_id.clone(), flashcard_id))
            .or_insert_with(|| ReviewState::new(flashcard_id, user_id.clone(), now));
        let next = transition(entry.value().clone());
        *entry = next.clone();
        Ok(next)
    }

    async fn is_token_revoked(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.revoked_tokens.contains(token))
    }
}
