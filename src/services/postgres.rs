use crate::models::{CreditTransaction, GeneratedMap, TransactionStatus, User};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// PostgreSQL client for accounts, the credit ledger, and generated-map
/// records
///
/// Credit mutations are single-statement conditional updates so concurrent
/// requests from the same user cannot lose updates.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a user account with one free starting credit
    pub async fn create_user(&self, email: &str) -> Result<User, PostgresError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email)
            VALUES ($1)
            RETURNING id, email, credits, created_at
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created user {} ({})", user.id, user.email);

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, PostgresError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, credits, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PostgresError::NotFound(format!("User {} not found", user_id)))
    }

    /// Deduct one credit if the balance allows it
    ///
    /// The conditional UPDATE makes deduction atomic under concurrent
    /// requests; returns the remaining balance.
    pub async fn deduct_credit(&self, user_id: Uuid) -> Result<i32, PostgresError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET credits = credits - 1
            WHERE id = $1 AND credits >= 1
            RETURNING credits
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((credits,)) => {
                tracing::debug!("Deducted 1 credit from {}, {} remaining", user_id, credits);
                Ok(credits)
            }
            None => {
                // Distinguish a missing user from an empty balance
                self.get_user(user_id).await?;
                Err(PostgresError::InsufficientCredits)
            }
        }
    }

    /// Return one credit after a failed generation; returns the new balance
    pub async fn refund_credit(&self, user_id: Uuid) -> Result<i32, PostgresError> {
        let (credits,): (i32,) = sqlx::query_as(
            r#"
            UPDATE users
            SET credits = credits + 1
            WHERE id = $1
            RETURNING credits
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Refunded 1 credit to {}, balance now {}", user_id, credits);

        Ok(credits)
    }

    /// Persist the record of a generated map artifact
    pub async fn record_map(
        &self,
        user_id: Uuid,
        filename: &str,
        bbox: &str,
        settings: serde_json::Value,
    ) -> Result<GeneratedMap, PostgresError> {
        let map = sqlx::query_as::<_, GeneratedMap>(
            r#"
            INSERT INTO generated_maps (user_id, filename, bbox, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, filename, bbox, settings, created_at
            "#,
        )
        .bind(user_id)
        .bind(filename)
        .bind(bbox)
        .bind(settings)
        .fetch_one(&self.pool)
        .await?;

        Ok(map)
    }

    /// List a user's generated maps, newest first
    pub async fn list_maps(&self, user_id: Uuid) -> Result<Vec<GeneratedMap>, PostgresError> {
        let maps = sqlx::query_as::<_, GeneratedMap>(
            r#"
            SELECT id, user_id, filename, bbox, settings, created_at
            FROM generated_maps
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(maps)
    }

    /// Look up a map by filename, scoped to its owner
    pub async fn find_map(
        &self,
        filename: &str,
        user_id: Uuid,
    ) -> Result<Option<GeneratedMap>, PostgresError> {
        let map = sqlx::query_as::<_, GeneratedMap>(
            r#"
            SELECT id, user_id, filename, bbox, settings, created_at
            FROM generated_maps
            WHERE filename = $1 AND user_id = $2
            "#,
        )
        .bind(filename)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(map)
    }

    /// Record a pending credit purchase
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        payment_intent_id: &str,
        credits: i32,
        amount_cents: i32,
    ) -> Result<CreditTransaction, PostgresError> {
        let tx = sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO transactions (user_id, payment_intent_id, credits_purchased, amount_cents, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING id, user_id, payment_intent_id, credits_purchased, amount_cents, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(payment_intent_id)
        .bind(credits)
        .bind(amount_cents)
        .fetch_one(&self.pool)
        .await?;

        Ok(tx)
    }

    /// Complete a pending transaction and add the purchased credits
    ///
    /// Runs inside one database transaction so the status flip and the
    /// balance update commit together; completing twice is a no-op error.
    pub async fn complete_transaction(
        &self,
        payment_intent_id: &str,
        user_id: Uuid,
    ) -> Result<i32, PostgresError> {
        let mut db_tx = self.pool.begin().await?;

        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE transactions
            SET status = 'completed'
            WHERE payment_intent_id = $1 AND user_id = $2 AND status = 'pending'
            RETURNING credits_purchased
            "#,
        )
        .bind(payment_intent_id)
        .bind(user_id)
        .fetch_optional(&mut *db_tx)
        .await?;

        let Some((purchased,)) = row else {
            db_tx.rollback().await?;
            return Err(PostgresError::NotFound(format!(
                "No pending transaction {} for user {}",
                payment_intent_id, user_id
            )));
        };

        let (credits,): (i32,) = sqlx::query_as(
            r#"
            UPDATE users
            SET credits = credits + $2
            WHERE id = $1
            RETURNING credits
            "#,
        )
        .bind(user_id)
        .bind(purchased)
        .fetch_one(&mut *db_tx)
        .await?;

        db_tx.commit().await?;

        tracing::info!(
            "Completed transaction {}: +{} credits for {}, balance now {}",
            payment_intent_id,
            purchased,
            user_id,
            credits
        );

        Ok(credits)
    }

    /// Mark a pending transaction failed
    pub async fn fail_transaction(&self, payment_intent_id: &str) -> Result<(), PostgresError> {
        sqlx::query(
            "UPDATE transactions SET status = 'failed' WHERE payment_intent_id = $1 AND status = 'pending'",
        )
        .bind(payment_intent_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_status_serde_names() {
        let status = TransactionStatus::Pending;
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"pending\"");
    }

    #[test]
    fn test_insufficient_credits_message() {
        let err = PostgresError::InsufficientCredits;
        assert_eq!(err.to_string(), "Insufficient credits");
    }
}
