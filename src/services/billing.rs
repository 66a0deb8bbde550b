use crate::services::postgres::{PostgresClient, PostgresError};
use std::future::Future;
use uuid::Uuid;

/// The credit operations the charge policy needs from a backing store
pub trait CreditLedger {
    fn deduct_credit(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<i32, PostgresError>> + Send;
    fn refund_credit(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<i32, PostgresError>> + Send;
}

impl CreditLedger for PostgresClient {
    async fn deduct_credit(&self, user_id: Uuid) -> Result<i32, PostgresError> {
        PostgresClient::deduct_credit(self, user_id).await
    }

    async fn refund_credit(&self, user_id: Uuid) -> Result<i32, PostgresError> {
        PostgresClient::refund_credit(self, user_id).await
    }
}

/// Outcome of a charged operation
#[derive(Debug)]
pub enum ChargeError<E> {
    /// Deduction failed; the operation never ran
    Ledger(PostgresError),
    /// The operation failed after deduction; the credit was returned
    Operation(E),
}

/// Run an operation that costs one credit
///
/// Deducts up front, runs the operation, and refunds on failure so the
/// balance ends where it started. A refund error is logged but does not
/// replace the operation's own error. Returns the operation's output with
/// the post-deduction balance.
pub async fn charge<L, F, Fut, T, E>(
    ledger: &L,
    user_id: Uuid,
    op: F,
) -> Result<(T, i32), ChargeError<E>>
where
    L: CreditLedger,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let remaining = ledger
        .deduct_credit(user_id)
        .await
        .map_err(ChargeError::Ledger)?;

    match op().await {
        Ok(value) => Ok((value, remaining)),
        Err(e) => {
            if let Err(refund_err) = ledger.refund_credit(user_id).await {
                tracing::error!("Refund failed for {}: {}", user_id, refund_err);
            }
            Err(ChargeError::Operation(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct MemoryLedger {
        credits: Mutex<i32>,
    }

    impl MemoryLedger {
        fn with_credits(credits: i32) -> Self {
            Self {
                credits: Mutex::new(credits),
            }
        }

        fn balance(&self) -> i32 {
            *self.credits.lock().unwrap()
        }
    }

    impl CreditLedger for MemoryLedger {
        async fn deduct_credit(&self, _user_id: Uuid) -> Result<i32, PostgresError> {
            let mut credits = self.credits.lock().unwrap();
            if *credits >= 1 {
                *credits -= 1;
                Ok(*credits)
            } else {
                Err(PostgresError::InsufficientCredits)
            }
        }

        async fn refund_credit(&self, _user_id: Uuid) -> Result<i32, PostgresError> {
            let mut credits = self.credits.lock().unwrap();
            *credits += 1;
            Ok(*credits)
        }
    }

    #[tokio::test]
    async fn test_charge_success_leaves_n_minus_one() {
        let ledger = MemoryLedger::with_credits(3);
        let user = Uuid::new_v4();

        let result = charge(&ledger, user, || async { Ok::<_, ()>("map.png") }).await;

        let (value, remaining) = result.unwrap();
        assert_eq!(value, "map.png");
        assert_eq!(remaining, 2);
        assert_eq!(ledger.balance(), 2);
    }

    #[tokio::test]
    async fn test_charge_failure_restores_balance() {
        let ledger = MemoryLedger::with_credits(3);
        let user = Uuid::new_v4();

        let result = charge(&ledger, user, || async { Err::<(), _>("tiles unavailable") }).await;

        assert!(matches!(result, Err(ChargeError::Operation("tiles unavailable"))));
        assert_eq!(ledger.balance(), 3);
    }

    #[tokio::test]
    async fn test_charge_empty_balance_never_runs_operation() {
        let ledger = MemoryLedger::with_credits(0);
        let user = Uuid::new_v4();
        let ran = AtomicBool::new(false);

        let result = charge(&ledger, user, || async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, ()>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(ChargeError::Ledger(PostgresError::InsufficientCredits))
        ));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(ledger.balance(), 0);
    }

    #[tokio::test]
    async fn test_charge_repeated_failures_never_drift_balance() {
        let ledger = MemoryLedger::with_credits(2);
        let user = Uuid::new_v4();

        for _ in 0..5 {
            let _ = charge(&ledger, user, || async { Err::<(), _>("boom") }).await;
        }

        assert_eq!(ledger.balance(), 2);
    }
}
