use thiserror::Error;

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("member id must not be empty")]
    EmptyMemberId,

    #[error("book title must not be empty")]
    EmptyBookTitle,
}

/// 在庫数変更のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// 貸出可能な冊数が0
    #[error("no copies available")]
    Unavailable,

    /// 全冊が書架にあり、返却を受け付ける余地がない
    #[error("all copies are already on the shelf")]
    OverReturn,

    /// 登録時に available > copies
    #[error("available count exceeds number of copies")]
    AvailableExceedsCopies,
}

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowError {
    /// 同じ会員・書籍の組に未返却の貸出がある
    #[error("an active loan already exists for this member and book")]
    DuplicateActiveLoan,
}

/// 延長のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenewError {
    /// 延長回数の上限に達した
    #[error("renewal limit reached")]
    LimitReached,

    /// 返却期限を過ぎている
    #[error("loan is past its due date")]
    Lapsed,
}

/// 削除のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    /// 未返却の貸出は削除不可
    #[error("loan has not been returned yet")]
    StillActive,
}
