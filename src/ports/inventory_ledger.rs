use crate::domain::{Book, BookTitle, CategoryFilter, Stock};
use async_trait::async_trait;

pub use super::store_error::Result;

/// 在庫台帳ポート
///
/// 蔵書ごとの copies / available を所有する。
/// 増減は同じ書名に対して線形化可能でなければならない。
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// 蔵書を登録する
    ///
    /// 同じ書名が既にあれば`StoreError::DuplicateBook`。
    async fn add_book(&self, book: Book) -> Result<()>;

    /// 書名で蔵書を取得する
    async fn get_book(&self, title: &BookTitle) -> Result<Option<Book>>;

    /// カテゴリで蔵書を一覧する（書名順）
    async fn list_books(&self, filter: &CategoryFilter) -> Result<Vec<Book>>;

    /// 貸出可能数を1減らす
    ///
    /// 蔵書がなければ`BookNotFound`、available == 0 なら`Unavailable`。
    async fn decrement(&self, title: &BookTitle) -> Result<Stock>;

    /// 貸出可能数を1増やす
    ///
    /// 蔵書がなければ`BookNotFound`、available == copies なら`OverReturn`。
    async fn increment(&self, title: &BookTitle) -> Result<Stock>;
}
