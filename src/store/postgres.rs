use chrono::NaiveDateTime;
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{ReviewStore, StoreError};
use crate::models::{CardSide, INITIAL_EFACTOR, ReviewState, UserId};

const STATE_COLUMNS: &str = "p.flashcard_id, p.user_id, p.efactor, p.interval_days, \
     p.repetition_count, p.correct_answers, p.incorrect_answers, \
     p.last_review_date, p.next_review_date";

#[derive(Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReviewStore for PgReviewStore {
    async fn can_access_deck(&self, deck_id: i32, user_id: &UserId) -> Result<bool, StoreError> {
        let accessible = sqlx::query_scalar::<_, bool>(
            "SELECT public OR owner_id = $2 FROM deck WHERE id = $1",
        )
        .bind(deck_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(accessible.unwrap_or(false))
    }

    async fn insert_missing_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
        now: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        // The (user_id, flashcard_id) constraint makes concurrent inits collapse
        // into one row per card.
        let result = sqlx::query(
            r#"
            INSERT INTO progress (user_id, flashcard_id, efactor, next_review_date)
            SELECT $1, df.flashcard_id, $3, $4
            FROM deck_flashcard df
            WHERE df.deck_id = $2
            ON CONFLICT (user_id, flashcard_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(deck_id)
        .bind(INITIAL_EFACTOR)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn deck_states(
        &self,
        deck_id: i32,
        user_id: &UserId,
    ) -> Result<Vec<ReviewState>, StoreError> {
        let states = sqlx::query_as::<_, ReviewState>(&format!(
            r#"
            SELECT {STATE_COLUMNS}
            FROM progress p
            INNER JOIN deck_flashcard df ON df.flashcard_id = p.flashcard_id
            WHERE df.deck_id = $1 AND p.user_id = $2
            ORDER BY p.next_review_date, p.flashcard_id
            "#
        ))
        .bind(deck_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(states)
    }

    async fn flashcard_exists(&self, flashcard_id: i32) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM flashcard WHERE id = $1")
            .bind(flashcard_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn card_content(
        &self,
        flashcard_id: i32,
    ) -> Result<Option<(CardSide, CardSide)>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                fs.id AS front_id, fs.content AS front_content,
                bs.id AS back_id, bs.content AS back_content
            FROM flashcard f
            INNER JOIN flashcard_side fs ON fs.id = f.front_side_id
            INNER JOIN flashcard_side bs ON bs.id = f.back_side_id
            WHERE f.id = $1
            "#,
        )
        .bind(flashcard_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let front = CardSide {
            id: row.try_get("front_id")?,
            content: row.try_get("front_content")?,
        };
        let back = CardSide {
            id: row.try_get("back_id")?,
            content: row.try_get("back_content")?,
        };
        Ok(Some((front, back)))
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
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO progress (user_id, flashcard_id, efactor, next_review_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, flashcard_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(flashcard_id)
        .bind(INITIAL_EFACTOR)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let current = sqlx::query_as::<_, ReviewState>(&format!(
            "SELECT {STATE_COLUMNS} FROM progress p \
             WHERE p.user_id = $1 AND p.flashcard_id = $2 FOR UPDATE"
        ))
        .bind(user_id)
        .bind(flashcard_id)
        .fetch_one(&mut *tx)
        .await?;

        let next = transition(current);

        let saved = sqlx::query_as::<_, ReviewState>(&format!(
            r#"
            UPDATE progress p
            SET efactor = $3,
                interval_days = $4,
                repetition_count = $5,
                correct_answers = $6,
                incorrect_answers = $7,
                last_review_date = $8,
                next_review_date = $9
            WHERE p.user_id = $1 AND p.flashcard_id = $2
            RETURNING {STATE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(flashcard_id)
        .bind(next.efactor)
        .bind(next.interval_days)
        .bind(next.repetition_count)
        .bind(next.correct_answers)
        .bind(next.incorrect_answers)
        .bind(next.last_review_date)
        .bind(next.next_review_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(
            "Stored review state for flashcard {} and user {}",
            flashcard_id, user_id
        );
        Ok(saved)
    }

    async fn is_token_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM expire_tokens WHERE token_value = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
