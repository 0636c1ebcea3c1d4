use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Starting easiness factor for a card nobody has reviewed yet.
pub const INITIAL_EFACTOR: f64 = 2.5;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub(crate) String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 3 chars from start and 9 from the end, cut on char boundaries
        if self.0.chars().count() <= 12 {
            return write!(f, "{}", self.0);
        }
        let head: String = self.0.chars().take(3).collect();
        let tail_start = self
            .0
            .char_indices()
            .rev()
            .nth(8)
            .map_or(0, |(i, _)| i);
        write!(f, "{}...{}", head, &self.0[tail_start..])
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Scheduling record for one user and one flashcard.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewState {
    pub flashcard_id: i32,
    pub user_id: UserId,
    pub efactor: f64,
    pub interval_days: i32,
    pub repetition_count: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub last_review_date: Option<NaiveDateTime>,
    pub next_review_date: NaiveDateTime,
}

impl ReviewState {
    /// A never-reviewed card, due immediately.
    pub fn new(flashcard_id: i32, user_id: UserId, now: NaiveDateTime) -> Self {
        Self {
            flashcard_id,
            user_id,
            efactor: INITIAL_EFACTOR,
            interval_days: 0,
            repetition_count: 0,
            correct_answers: 0,
            incorrect_answers: 0,
            last_review_date: None,
            next_review_date: now,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_review_date <= now
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CardSide {
    pub id: i32,
    pub content: String,
}

/// Payload of `GET learn/{deck}/next`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CardToLearn {
    pub id: i32,
    pub last_review_date: Option<NaiveDateTime>,
    pub next_review_date: NaiveDateTime,
    pub efactor: f64,
    pub front_side: CardSide,
    pub back_side: CardSide,
}

impl CardToLearn {
    pub fn new(state: &ReviewState, front_side: CardSide, back_side: CardSide) -> Self {
        Self {
            id: state.flashcard_id,
            last_review_date: state.last_review_date,
            next_review_date: state.next_review_date,
            efactor: state.efactor,
            front_side,
            back_side,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ReviewRequest {
    pub quality: i32,
}

/// Payload of `POST learn/{flashcard}/review`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub id: i32,
    pub last_review_date: Option<NaiveDateTime>,
    pub next_review_date: NaiveDateTime,
    pub efactor: f64,
    pub interval_days: i32,
    pub repetition_count: i32,
}

impl From<ReviewState> for ReviewOutcome {
    fn from(state: ReviewState) -> Self {
        Self {
            id: state.flashcard_id,
            last_review_date: state.last_review_date,
            next_review_date: state.next_review_date,
            efactor: state.efactor,
            interval_days: state.interval_days,
            repetition_count: state.repetition_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeckStats {
    pub total: usize,
    pub due: usize,
    pub unseen: usize,
    pub scheduled: usize,
}
