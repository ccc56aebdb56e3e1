use crate::adapters::retry::RetryPolicy;
use crate::domain::{
    self, BookTitle, MemberId,
    loan::{ActiveLoan, Loan, ReturnedLoan},
    policy::DatePolicy,
};
use crate::ports::StoreError;
use crate::ports::loan_store::{LoanStore as LoanStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::Database;

/// In-memory implementation of LoanStore
///
/// Shares its `Database` with the in-memory ledger, so the loan record and
/// the stock count change inside one lock acquisition.
pub struct LoanStore {
    db: Database,
    policy: Arc<dyn DatePolicy>,
    retry: RetryPolicy,
}

impl LoanStore {
    pub fn new(db: Database, policy: Arc<dyn DatePolicy>, retry: RetryPolicy) -> Self {
        Self { db, policy, retry }
    }
}

fn key(member_id: &MemberId, title: &BookTitle) -> (MemberId, BookTitle) {
    (member_id.clone(), title.clone())
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
            .run("create_loan", move || async move {
                let mut tables = self.db.lock().await?;
                let key = key(member_id, title);

                let active = domain::loan::borrow_book(
                    tables.loans.get(&key),
                    member_id.clone(),
                    title.clone(),
                    borrowed_at,
                )?;
                tables.decrement(title)?;
                tables.loans.insert(key, Loan::Active(active.clone()));

                Ok(active)
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
            .run("renew_loan", move || async move {
                let mut tables = self.db.lock().await?;
                let key = key(member_id, title);

                let active = tables
                    .loans
                    .get(&key)
                    .cloned()
                    .and_then(Loan::into_active)
                    .ok_or(StoreError::LoanNotFound)?;
                let renewed = domain::loan::renew_loan(active, now, self.policy.as_ref())?;
                tables.loans.insert(key, Loan::Active(renewed.clone()));

                Ok(renewed)
            })
            .await
    }

    async fn return_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ReturnedLoan> {
        self.retry
            .run("return_loan", move || async move {
                let mut tables = self.db.lock().await?;
                let key = key(member_id, title);

                let active = tables
                    .loans
                    .get(&key)
                    .cloned()
                    .and_then(Loan::into_active)
                    .ok_or(StoreError::LoanNotFound)?;
                let returned = domain::loan::return_book(active, now, self.policy.as_ref());
                // 在庫を戻せなければレコードも変更しない
                tables.increment(title)?;
                tables.loans.insert(key, Loan::Returned(returned.clone()));

                Ok(returned)
            })
            .await
    }

    async fn delete_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<ReturnedLoan> {
        self.retry
            .run("delete_loan", move || async move {
                let mut tables = self.db.lock().await?;
                let key = key(member_id, title);

                let loan = tables
                    .loans
                    .get(&key)
                    .cloned()
                    .ok_or(StoreError::LoanNotFound)?;
                let returned = domain::loan::ensure_deletable(loan)?;
                tables.loans.remove(&key);

                Ok(returned)
            })
            .await
    }

    async fn get_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<Option<Loan>> {
        self.retry
            .run("get_loan", move || async move {
                let tables = self.db.lock().await?;
                Ok(tables.loans.get(&key(member_id, title)).cloned())
            })
            .await
    }

    async fn find_by_member(&self, member_id: &MemberId) -> Result<Vec<Loan>> {
        self.retry
            .run("find_by_member", move || async move {
                let tables = self.db.lock().await?;
                let mut loans: Vec<Loan> = tables
                    .loans
                    .values()
                    .filter(|loan| &loan.core().member_id == member_id)
                    .cloned()
                    .collect();
                loans.sort_by(|a, b| b.core().borrowed_at.cmp(&a.core().borrowed_at));
                Ok(loans)
            })
            .await
    }
}
