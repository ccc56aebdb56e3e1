pub mod inventory_ledger;
pub mod loan_store;

pub use inventory_ledger::InventoryLedger as MemoryInventoryLedger;
pub use loan_store::LoanStore as MemoryLoanStore;

use crate::domain::{Book, BookTitle, MemberId, Stock, loan::Loan};
use crate::ports::{StoreError, store_error::Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// 既定のロック待ち上限
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// 蔵書テーブルと貸出テーブル
///
/// 1つのロックで両方を保護するため、貸出レコードと在庫数の変更は
/// 同じクリティカルセクション内で確定する。
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) books: BTreeMap<BookTitle, Book>,
    pub(crate) loans: HashMap<(MemberId, BookTitle), Loan>,
}

impl Tables {
    pub(crate) fn decrement(&mut self, title: &BookTitle) -> Result<Stock> {
        let book = self
            .books
            .get_mut(title)
            .ok_or_else(|| StoreError::BookNotFound(title.clone()))?;
        book.stock = book.stock.take()?;
        Ok(book.stock)
    }

    pub(crate) fn increment(&mut self, title: &BookTitle) -> Result<Stock> {
        let book = self
            .books
            .get_mut(title)
            .ok_or_else(|| StoreError::BookNotFound(title.clone()))?;
        book.stock = book.stock.restore()?;
        Ok(book.stock)
    }
}

/// In-process store shared by the in-memory ledger and loan store.
///
/// Lock acquisition is bounded by `lock_timeout`; a timeout surfaces as
/// `StoreError::Transient`.
#[derive(Debug, Clone)]
pub struct Database {
    tables: Arc<Mutex<Tables>>,
    lock_timeout: Duration,
}

impl Database {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            lock_timeout,
        }
    }

    pub(crate) async fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        tokio::time::timeout(self.lock_timeout, self.tables.lock())
            .await
            .map_err(StoreError::transient)
    }

    #[cfg(test)]
    pub(crate) fn tables(&self) -> &Arc<Mutex<Tables>> {
        &self.tables
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
