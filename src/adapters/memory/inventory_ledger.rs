use crate::adapters::retry::RetryPolicy;
use crate::domain::{Book, BookTitle, CategoryFilter, Stock};
use crate::ports::inventory_ledger::{InventoryLedger as InventoryLedgerTrait, Result};
use crate::ports::StoreError;
use async_trait::async_trait;

use super::Database;

/// In-memory implementation of InventoryLedger
pub struct InventoryLedger {
    db: Database,
    retry: RetryPolicy,
}

impl InventoryLedger {
    pub fn new(db: Database, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl InventoryLedgerTrait for InventoryLedger {
    async fn add_book(&self, book: Book) -> Result<()> {
        let book = &book;
        self.retry
            .run("add_book", move || async move {
                let mut tables = self.db.lock().await?;
                if tables.books.contains_key(&book.title) {
                    return Err(StoreError::DuplicateBook(book.title.clone()));
                }
                tables.books.insert(book.title.clone(), book.clone());
                Ok(())
            })
            .await
    }

    async fn get_book(&self, title: &BookTitle) -> Result<Option<Book>> {
        self.retry
            .run("get_book", move || async move {
                let tables = self.db.lock().await?;
                Ok(tables.books.get(title).cloned())
            })
            .await
    }

    async fn list_books(&self, filter: &CategoryFilter) -> Result<Vec<Book>> {
        self.retry
            .run("list_books", move || async move {
                let tables = self.db.lock().await?;
                Ok(tables
                    .books
                    .values()
                    .filter(|book| filter.matches(book))
                    .cloned()
                    .collect())
            })
            .await
    }

    async fn decrement(&self, title: &BookTitle) -> Result<Stock> {
        self.retry
            .run("decrement", move || async move {
                self.db.lock().await?.decrement(title)
            })
            .await
    }

    async fn increment(&self, title: &BookTitle) -> Result<Stock> {
        self.retry
            .run("increment", move || async move {
                self.db.lock().await?.increment(title)
            })
            .await
    }
}
