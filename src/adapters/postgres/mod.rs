pub mod inventory_ledger;
pub mod loan_store;

// パブリックに型を再エクスポート
pub use inventory_ledger::InventoryLedger as PostgresInventoryLedger;
pub use loan_store::LoanStore as PostgresLoanStore;

use crate::ports::StoreError;
use crate::ports::store_error::Result;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

/// SQLSTATE codes that indicate the operation may succeed on retry
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "57014", // query_canceled (statement_timeout)
];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let transient = match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
            sqlx::Error::Database(db) => db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())),
            _ => false,
        };

        if transient {
            StoreError::transient(err)
        } else {
            StoreError::backend(err)
        }
    }
}

/// `lock_timeout` に渡す値（ミリ秒、切り上げ）
///
/// PostgreSQLでは 0 が「無制限」になるため、最小値は 1ms。
fn lock_timeout_setting(lock_timeout: Duration) -> String {
    let millis = lock_timeout.as_micros().div_ceil(1000).max(1);
    format!("{}ms", millis)
}

/// コミットする。失敗は`Backend`とし、再試行しない
///
/// 接続断でもサーバー側では確定している場合がある。
pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit().await.map_err(commit_error)
}

fn commit_error(err: sqlx::Error) -> StoreError {
    StoreError::backend(err)
}

/// トランザクションを開始し、行ロック待ちの上限を設定する
///
/// `lock_timeout` を超えた待ちは 55P03 となり、一時的エラーとして扱われる。
pub(crate) async fn begin(
    pool: &PgPool,
    lock_timeout: Duration,
) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(lock_timeout_setting(lock_timeout))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_setting_never_disables_timeout() {
        assert_eq!(lock_timeout_setting(Duration::from_millis(2000)), "2000ms");
        assert_eq!(lock_timeout_setting(Duration::from_micros(500)), "1ms");
        assert_eq!(lock_timeout_setting(Duration::from_micros(1500)), "2ms");
        assert_eq!(lock_timeout_setting(Duration::ZERO), "1ms");
    }

    #[test]
    fn test_io_error_is_transient_except_on_commit() {
        let io = || sqlx::Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reset"));

        assert!(StoreError::from(io()).is_transient());
        assert!(!commit_error(io()).is_transient());
        assert!(matches!(commit_error(io()), StoreError::Backend(_)));
    }
}
