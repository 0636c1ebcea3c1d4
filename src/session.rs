//! Picking the next card of a deck.
use chrono::NaiveDateTime;

use crate::{
    errors::LearnError,
    models::{CardToLearn, DeckStats, ReviewState},
};

/// Outcome of asking for the next card.
#[derive(Debug, Clone, PartialEq)]
pub enum NextCard {
    Due(CardToLearn),
    /// Nothing is due yet; the earliest upcoming review.
    NoneDue(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    Due(&'a ReviewState),
    NoneDue(NaiveDateTime),
}

/// Most overdue state first, lowest flashcard id on ties.
pub fn select_next(states: &[ReviewState], now: NaiveDateTime) -> Result<Selection<'_>, LearnError> {
    let due = states
        .iter()
        .filter(|s| s.is_due(now))
        .min_by_key(|s| (s.next_review_date, s.flashcard_id));

    match due {
        Some(state) => Ok(Selection::Due(state)),
        None => earliest_review(states)
            .map(Selection::NoneDue)
            .ok_or(LearnError::DeckNotInitialized),
    }
}

/// Earliest `next_review_date` across the states, due or not.
pub fn earliest_review(states: &[ReviewState]) -> Option<NaiveDateTime> {
    states.iter().map(|s| s.next_review_date).min()
}

pub fn deck_stats(states: &[ReviewState], now: NaiveDateTime) -> DeckStats {
    let due = states.iter().filter(|s| s.is_due(now)).count();
    DeckStats {
        total: states.len(),
        due,
        unseen: states.iter().filter(|s| s.last_review_date.is_none()).count(),
        scheduled: states.len() - due,
    }
}
