//! SM-2 scheduling.
//!
//! A review of quality 3 or better counts as a successful recall and grows the
//! interval; anything lower resets the card to a one day interval. The easiness
//! factor moves with every review and never drops below [`MIN_EFACTOR`].

use std::fmt::Display;

use chrono::{NaiveDateTime, TimeDelta};

use crate::{errors::LearnError, models::ReviewState};

pub const MIN_EFACTOR: f64 = 1.3;

/// Upper bound on a single interval, keeps date arithmetic in range.
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

/// A review rating, one of the five buttons offered to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }
}

impl TryFrom<i32> for Quality {
    type Error = LearnError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(LearnError::InvalidQuality(value))
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}", self.0)
    }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
pub fn next_efactor(efactor: f64, quality: Quality) -> f64 {
    let miss = 5.0 - f64::from(quality.value());
    (efactor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EFACTOR)
}

fn next_interval(repetition_count: i32, interval_days: i32, efactor: f64) -> i32 {
    match repetition_count {
        1 => 1,
        2 => 6,
        _ => {
            let grown = (f64::from(interval_days) * efactor).round();
            (grown as i32).min(MAX_INTERVAL_DAYS)
        }
    }
}

/// Computes the state that follows `state` after a review at `now`.
///
/// Past the second repetition the interval is `round(interval * EF')`, capped at
/// [`MAX_INTERVAL_DAYS`]. The cap only changes the result for intervals of about
/// a hundred years.
pub fn schedule(state: &ReviewState, quality: Quality, now: NaiveDateTime) -> ReviewState {
    let efactor = next_efactor(state.efactor, quality);
    let mut next = state.clone();

    if quality.is_pass() {
        next.repetition_count = state.repetition_count + 1;
        next.interval_days = next_interval(next.repetition_count, state.interval_days, efactor);
        next.correct_answers = state.correct_answers + 1;
    } else {
        next.repetition_count = 0;
        next.interval_days = 1;
        next.incorrect_answers = state.incorrect_answers + 1;
    }

    next.efactor = efactor;
    next.last_review_date = Some(now);
    next.next_review_date = now
        .checked_add_signed(TimeDelta::days(i64::from(next.interval_days)))
        .unwrap_or(NaiveDateTime::MAX);
    next
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{INITIAL_EFACTOR, UserId};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn fresh() -> ReviewState {
        ReviewState::new(1, UserId::from("alice"), t0())
    }

    fn q(value: i32) -> Quality {
        Quality::try_from(value).unwrap()
    }

    #[test]
    fn rejects_out_of_range_quality() {
        for bad in [0, 6, -1, 100] {
            assert!(matches!(
                Quality::try_from(bad),
                Err(LearnError::InvalidQuality(v)) if v == bad
            ));
        }
        assert_eq!(q(1).value(), 1);
        assert_eq!(q(5).value(), 5);
    }

    #[test]
    fn efactor_update_matches_sm2() {
        assert!((next_efactor(2.5, q(5)) - 2.6).abs() < 1e-9);
        assert!((next_efactor(2.5, q(4)) - 2.5).abs() < 1e-9);
        assert!((next_efactor(2.5, q(3)) - 2.36).abs() < 1e-9);
        assert!((next_efactor(2.0, q(1)) - 1.46).abs() < 1e-9);
        assert_eq!(next_efactor(1.3, q(1)), MIN_EFACTOR);
    }

    #[test]
    fn good_reviews_grow_interval() {
        let first = schedule(&fresh(), q(4), t0());
        let second = schedule(&first, q(4), t0());
        let third = schedule(&second, q(4), t0());

        assert_eq!(first.interval_days, 1);
        assert_eq!(second.interval_days, 6);
        assert_eq!(
            third.interval_days,
            (6.0 * third.efactor).round() as i32
        );
        assert_eq!(third.interval_days, 15);
        assert_eq!(third.repetition_count, 3);
        assert_eq!(third.correct_answers, 3);
    }

    #[test]
    fn failed_review_resets_progress() {
        let mut state = fresh();
        state.repetition_count = 7;
        state.interval_days = 120;
        state.efactor = 2.8;

        for quality in [1, 2] {
            let next = schedule(&state, q(quality), t0());
            assert_eq!(next.repetition_count, 0);
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.incorrect_answers, 1);
            assert!(next.efactor < state.efactor);
            assert_eq!(next.next_review_date, t0() + TimeDelta::days(1));
        }
    }

    #[test]
    fn efactor_never_drops_below_floor() {
        let mut state = fresh();
        for _ in 0..50 {
            state = schedule(&state, q(1), t0());
            assert!(state.efactor >= MIN_EFACTOR);
        }
        assert_eq!(state.efactor, MIN_EFACTOR);

        for quality in [3, 1, 3, 2, 3, 3] {
            state = schedule(&state, q(quality), t0());
            assert!(state.efactor >= MIN_EFACTOR);
        }
    }

    #[test]
    fn review_stamps_dates() {
        let later = t0() + TimeDelta::hours(5);
        let next = schedule(&fresh(), q(5), later);
        assert_eq!(next.last_review_date, Some(later));
        assert_eq!(next.next_review_date, later + TimeDelta::days(1));
        assert!(next.efactor > INITIAL_EFACTOR);
    }

    #[test]
    fn interval_is_non_decreasing_while_passing() {
        let mut state = fresh();
        let mut previous = 0;
        for quality in [3, 5, 3, 4, 3, 3, 5, 3] {
            state = schedule(&state, q(quality), t0());
            assert!(state.interval_days >= previous);
            previous = state.interval_days;
        }
    }

    #[test]
    fn cap_leaves_long_intervals_alone() {
        let mut state = fresh();
        state.repetition_count = 5;
        state.interval_days = 10_000;
        state.efactor = 2.5;
        let next = schedule(&state, q(4), t0());
        assert_eq!(next.interval_days, 25_000);
    }

    #[test]
    fn interval_is_capped() {
        let mut state = fresh();
        for _ in 0..60 {
            state = schedule(&state, q(5), t0());
        }
        assert_eq!(state.interval_days, MAX_INTERVAL_DAYS);
        assert!(state.next_review_date > t0());
    }
}
