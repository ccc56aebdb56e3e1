use crate::adapters::retry::RetryPolicy;
use crate::domain::{
    self, BookTitle, LoanId, MemberId, RenewCount,
    loan::{ActiveLoan, Loan, LoanCore, ReturnedLoan},
    policy::DatePolicy,
};
use crate::ports::StoreError;
use crate::ports::loan_store::{LoanStore as LoanStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use std::time::Duration;

use super::{
    begin, commit,
    inventory_ledger::{decrement_in, increment_in},
};

/// PostgreSQLの行データを貸出レコードに変換する
///
/// renew_countのi16からRenewCountへの変換と、
/// returned_atの有無による状態の判別を行う。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let renew_count_i16: i16 = row.try_get("renew_count")?;
    let renew_count = u8::try_from(renew_count_i16)
        .ok()
        .and_then(|count| RenewCount::try_from(count).ok())
        .ok_or_else(|| {
            StoreError::backend(format!("renew_count out of range: {}", renew_count_i16))
        })?;

    let member_id: String = row.try_get("member_id")?;
    let book_title: String = row.try_get("book_title")?;

    let core = LoanCore {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        member_id: MemberId::parse(member_id).map_err(StoreError::backend)?,
        book_title: BookTitle::parse(book_title).map_err(StoreError::backend)?,
        borrowed_at: row.try_get("borrowed_at")?,
        renew_count,
    };

    let returned_at: Option<DateTime<Utc>> = row.try_get("returned_at")?;
    Ok(match returned_at {
        None => Loan::Active(ActiveLoan { core }),
        Some(returned_at) => Loan::Returned(ReturnedLoan { core, returned_at }),
    })
}

/// 行ロックを取得して貸出レコードを読む
async fn select_for_update(
    conn: &mut PgConnection,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<Option<Loan>> {
    let row = sqlx::query(
        r#"
        SELECT loan_id, member_id, book_title, borrowed_at, returned_at, renew_count
        FROM loans
        WHERE member_id = $1 AND book_title = $2
        FOR UPDATE
        "#,
    )
    .bind(member_id.as_str())
    .bind(title.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_row_to_loan).transpose()
}

/// LoanStoreのPostgreSQL実装
///
/// 1回の論理操作を1トランザクションで実行する。
/// 貸出レコードは(member_id, book_title)の主キーで行ロックされ、
/// 在庫数は同じトランザクション内の条件付きUPDATEで変更される。
pub struct LoanStore {
    pool: PgPool,
    policy: Arc<dyn DatePolicy>,
    lock_timeout: Duration,
    retry: RetryPolicy,
}

impl LoanStore {
    pub fn new(
        pool: PgPool,
        policy: Arc<dyn DatePolicy>,
        lock_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            policy,
            lock_timeout,
            retry,
        }
    }

    async fn create_once(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        borrowed_at: DateTime<Utc>,
    ) -> Result<ActiveLoan> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;

        let existing = select_for_update(&mut tx, member_id, title).await?;
        let active = domain::loan::borrow_book(
            existing.as_ref(),
            member_id.clone(),
            title.clone(),
            borrowed_at,
        )?;

        decrement_in(&mut tx, title).await?;

        // 返却済みレコードのみ上書きする。並行する貸出が先に確定した場合は0行
        let result = sqlx::query(
            r#"
            INSERT INTO loans (loan_id, member_id, book_title, borrowed_at, returned_at, renew_count)
            VALUES ($1, $2, $3, $4, NULL, $5)
            ON CONFLICT (member_id, book_title)
            DO UPDATE SET
                loan_id = EXCLUDED.loan_id,
                borrowed_at = EXCLUDED.borrowed_at,
                returned_at = NULL,
                renew_count = EXCLUDED.renew_count
            WHERE loans.returned_at IS NOT NULL
            "#,
        )
        .bind(active.loan_id.value())
        .bind(member_id.as_str())
        .bind(title.as_str())
        .bind(active.borrowed_at)
        .bind(active.renew_count.value() as i16)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // txのdropでロールバックされ、在庫の減算も取り消される
            return Err(StoreError::DuplicateActiveLoan);
        }

        commit(tx).await?;
        Ok(active)
    }

    async fn renew_once(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ActiveLoan> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;

        let active = select_for_update(&mut tx, member_id, title)
            .await?
            .and_then(Loan::into_active)
            .ok_or(StoreError::LoanNotFound)?;
        let renewed = domain::loan::renew_loan(active, now, self.policy.as_ref())?;

        sqlx::query(
            r#"
            UPDATE loans
            SET borrowed_at = $3, renew_count = $4
            WHERE member_id = $1 AND book_title = $2
            "#,
        )
        .bind(member_id.as_str())
        .bind(title.as_str())
        .bind(renewed.borrowed_at)
        .bind(renewed.renew_count.value() as i16)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;
        Ok(renewed)
    }

    async fn return_once(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ReturnedLoan> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;

        let active = select_for_update(&mut tx, member_id, title)
            .await?
            .and_then(Loan::into_active)
            .ok_or(StoreError::LoanNotFound)?;
        let returned = domain::loan::return_book(active, now, self.policy.as_ref());

        sqlx::query(
            r#"
            UPDATE loans
            SET returned_at = $3
            WHERE member_id = $1 AND book_title = $2
            "#,
        )
        .bind(member_id.as_str())
        .bind(title.as_str())
        .bind(returned.returned_at)
        .execute(&mut *tx)
        .await?;

        increment_in(&mut tx, title).await?;

        commit(tx).await?;
        Ok(returned)
    }

    async fn delete_once(&self, member_id: &MemberId, title: &BookTitle) -> Result<ReturnedLoan> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;

        let loan = select_for_update(&mut tx, member_id, title)
            .await?
            .ok_or(StoreError::LoanNotFound)?;
        let returned = domain::loan::ensure_deletable(loan)?;

        sqlx::query("DELETE FROM loans WHERE member_id = $1 AND book_title = $2")
            .bind(member_id.as_str())
            .bind(title.as_str())
            .execute(&mut *tx)
            .await?;

        commit(tx).await?;
        Ok(returned)
    }

    async fn get_once(&self, member_id: &MemberId, title: &BookTitle) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, member_id, book_title, borrowed_at, returned_at, renew_count
            FROM loans
            WHERE member_id = $1 AND book_title = $2
            "#,
        )
        .bind(member_id.as_str())
        .bind(title.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn find_by_member_once(&self, member_id: &MemberId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, member_id, book_title, borrowed_at, returned_at, renew_count
            FROM loans
            WHERE member_id = $1
            ORDER BY borrowed_at DESC
            "#,
        )
        .bind(member_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }
}

#[async_trait]
impl LoanStoreTrait for LoanStore {
    async fn create_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        borrowed_at: DateTime<Utc>,
    ) -> Result<ActiveLoan> {
        self.retry
            .run("create_loan", move || {
                self.create_once(member_id, title, borrowed_at)
            })
            .await
    }

    async fn renew_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ActiveLoan> {
        self.retry
            .run("renew_loan", move || self.renew_once(member_id, title, now))
            .await
    }

    async fn return_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ReturnedLoan> {
        self.retry
            .run("return_loan", move || self.return_once(member_id, title, now))
            .await
    }

    async fn delete_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<ReturnedLoan> {
        self.retry
            .run("delete_loan", move || self.delete_once(member_id, title))
            .await
    }

    async fn get_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<Option<Loan>> {
        self.retry
            .run("get_loan", move || self.get_once(member_id, title))
            .await
    }

    async fn find_by_member(&self, member_id: &MemberId) -> Result<Vec<Loan>> {
        self.retry
            .run("find_by_member", move || self.find_by_member_once(member_id))
            .await
    }
}
