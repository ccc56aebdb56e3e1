use crate::domain::{
    BookTitle, MemberId,
    loan::{ActiveLoan, Loan, ReturnedLoan},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use super::store_error::Result;

/// 貸出ストアポート
///
/// 貸出レコードを(会員, 書名)ごとに最大1件保持し、状態遷移を強制する。
/// 在庫台帳の増減を呼ぶのはこのポートの実装だけであり、
/// 貸出レコードの変更と在庫数の変更は常に一緒に確定または破棄される。
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// 貸出を作成し、在庫を1減らす
    ///
    /// 失敗順：`DuplicateActiveLoan` → `BookNotFound` / `Unavailable`
    async fn create_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        borrowed_at: DateTime<Utc>,
    ) -> Result<ActiveLoan>;

    /// 貸出を延長する
    ///
    /// 貸出中のレコードがなければ`LoanNotFound`、
    /// 上限到達または期限切れなら`Maxed`。
    async fn renew_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ActiveLoan>;

    /// 返却し、在庫を1増やす
    ///
    /// 在庫の増加に失敗した場合、レコードも返却済みにしない。
    async fn return_loan(
        &self,
        member_id: &MemberId,
        title: &BookTitle,
        now: DateTime<Utc>,
    ) -> Result<ReturnedLoan>;

    /// 返却済みのレコードを削除する
    ///
    /// レコードがなければ`LoanNotFound`、未返却なら`StillActive`。
    async fn delete_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<ReturnedLoan>;

    /// (会員, 書名)で貸出レコードを取得する
    async fn get_loan(&self, member_id: &MemberId, title: &BookTitle) -> Result<Option<Loan>>;

    /// 会員の全貸出レコード（貸出日の新しい順）
    async fn find_by_member(&self, member_id: &MemberId) -> Result<Vec<Loan>>;
}
