use crate::domain::{BookTitle, ValueError};
use crate::ports::StoreError;
use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 呼び出し側から渡された識別子が不正
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValueError),

    /// 書籍が存在しない
    #[error("Book not found: {0}")]
    BookNotFound(BookTitle),

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 貸出可能な冊数がない
    #[error("Book is not available for loan")]
    BookUnavailable,

    /// 全冊が書架にあり返却を受け付けられない
    #[error("All copies are already on the shelf")]
    OverReturn,

    /// 同じ書籍を貸出中
    #[error("Member already has an active loan for this book")]
    DuplicateActiveLoan,

    /// 延長上限到達、または返却期限切れ
    #[error("Loan cannot be renewed")]
    RenewalNotAllowed,

    /// 未返却の貸出は削除できない
    #[error("Loan has not been returned")]
    StillActive,

    /// ロック待ち・接続待ちなどの一時的な障害（リトライ上限到達後）
    #[error("Temporary storage failure")]
    Transient(#[source] StoreError),

    /// ストアのエラー
    #[error("Store error")]
    StoreError(#[source] StoreError),
}

impl From<StoreError> for LoanApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BookNotFound(title) => LoanApplicationError::BookNotFound(title),
            StoreError::LoanNotFound => LoanApplicationError::LoanNotFound,
            StoreError::Unavailable => LoanApplicationError::BookUnavailable,
            StoreError::OverReturn => LoanApplicationError::OverReturn,
            StoreError::DuplicateActiveLoan => LoanApplicationError::DuplicateActiveLoan,
            StoreError::Maxed => LoanApplicationError::RenewalNotAllowed,
            StoreError::StillActive => LoanApplicationError::StillActive,
            err @ StoreError::Transient(_) => LoanApplicationError::Transient(err),
            err => LoanApplicationError::StoreError(err),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
