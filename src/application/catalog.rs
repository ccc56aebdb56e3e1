use crate::domain::{Book, BookTitle, CategoryFilter};
use crate::ports::StoreError;
use crate::ports::store_error::Result;

use super::loan::ServiceDependencies;

/// 蔵書を登録する（管理者操作）
///
/// 在庫数の不変条件は`Stock`の生成時点で保証済み。
pub async fn add_book(deps: &ServiceDependencies, book: Book) -> Result<()> {
    let title = book.title.clone();
    let copies = book.stock.copies();

    match deps.inventory_ledger.add_book(book).await {
        Ok(()) => {
            tracing::info!(book_title = %title, copies, "book added to catalog");
            Ok(())
        }
        Err(err @ StoreError::DuplicateBook(_)) => {
            tracing::warn!(book_title = %title, "book already in catalog");
            Err(err)
        }
        Err(err) => {
            tracing::error!(book_title = %title, error.cause_chain = ?err, "failed to add book");
            Err(err)
        }
    }
}

/// 書名で蔵書を取得する
pub async fn get_book(deps: &ServiceDependencies, title: &BookTitle) -> Result<Book> {
    deps.inventory_ledger
        .get_book(title)
        .await?
        .ok_or_else(|| StoreError::BookNotFound(title.clone()))
}

/// カテゴリで蔵書を一覧する（"All" で全件）
pub async fn list_books(deps: &ServiceDependencies, category: &str) -> Result<Vec<Book>> {
    deps.inventory_ledger
        .list_books(&CategoryFilter::parse(category))
        .await
}
