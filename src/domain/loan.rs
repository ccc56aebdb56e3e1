use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookTitle, BorrowError, DeleteError, LoanId, MemberId, RenewCount, RenewError,
    policy::{DatePolicy, clamp_to_window},
};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// すべての貸出状態で共有されるコアデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub book_title: BookTitle,
    pub borrowed_at: DateTime<Utc>,
    pub renew_count: RenewCount,
}

impl LoanCore {
    /// 返却期限（貸出日 + 14日）
    pub fn due_date(&self) -> DateTime<Utc> {
        self.borrowed_at + Duration::days(LOAN_PERIOD_DAYS)
    }
}

/// 貸出中状態
///
/// 同じ(会員, 書名)の組に対して同時に1件まで。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for ActiveLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態
///
/// returned_atが必須（型で保証）。削除できるのはこの状態のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub returned_at: DateTime<Utc>,
}

impl std::ops::Deref for ReturnedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 貸出レコードの統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Loan {
    Active(ActiveLoan),
    Returned(ReturnedLoan),
}

impl Loan {
    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Active(active) => &active.core,
            Loan::Returned(returned) => &returned.core,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Loan::Active(_))
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Loan::Active(_) => None,
            Loan::Returned(returned) => Some(returned.returned_at),
        }
    }

    pub fn into_active(self) -> Option<ActiveLoan> {
        match self {
            Loan::Active(active) => Some(active),
            Loan::Returned(_) => None,
        }
    }
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 同じ組に貸出中のレコードがあれば不可
/// - 返却済みのレコードは新しい貸出で上書きされる
/// - 延長回数は0
///
/// 在庫の確認は呼び出し側（Loan Store）が同じトランザクション内で行う。
pub fn borrow_book(
    existing: Option<&Loan>,
    member_id: MemberId,
    book_title: BookTitle,
    borrowed_at: DateTime<Utc>,
) -> Result<ActiveLoan, BorrowError> {
    if existing.is_some_and(Loan::is_active) {
        return Err(BorrowError::DuplicateActiveLoan);
    }

    Ok(ActiveLoan {
        core: LoanCore {
            loan_id: LoanId::new(),
            member_id,
            book_title,
            borrowed_at,
            renew_count: RenewCount::new(),
        },
    })
}

/// 返却期限を過ぎているか
pub fn is_lapsed(loan: &LoanCore, now: DateTime<Utc>) -> bool {
    now > loan.due_date()
}

/// 純粋関数：貸出を延長する
///
/// ビジネスルール：
/// - 延長は2回まで
/// - 返却期限を過ぎた貸出は延長不可（返却のみ）
/// - 貸出日は方針に従って進め、`[現在の貸出日, now]` に収める
pub fn renew_loan(
    loan: ActiveLoan,
    now: DateTime<Utc>,
    policy: &dyn DatePolicy,
) -> Result<ActiveLoan, RenewError> {
    let renew_count = loan.renew_count.increment()?;

    if is_lapsed(&loan, now) {
        return Err(RenewError::Lapsed);
    }

    let current = loan.borrowed_at;
    let borrowed_at = clamp_to_window(policy.renewed_borrow_date(current, now), current, now);

    Ok(ActiveLoan {
        core: LoanCore {
            borrowed_at,
            renew_count,
            ..loan.core
        },
    })
}

/// 純粋関数：書籍を返却する
///
/// 延滞していても返却は受け付ける。返却日は `[貸出日, now]` に収める。
pub fn return_book(loan: ActiveLoan, now: DateTime<Utc>, policy: &dyn DatePolicy) -> ReturnedLoan {
    let borrowed_at = loan.borrowed_at;
    let returned_at = clamp_to_window(policy.return_date(borrowed_at, now), borrowed_at, now);

    ReturnedLoan {
        core: loan.core,
        returned_at,
    }
}

/// 純粋関数：削除可能か判定する
pub fn ensure_deletable(loan: Loan) -> Result<ReturnedLoan, DeleteError> {
    match loan {
        Loan::Returned(returned) => Ok(returned),
        Loan::Active(_) => Err(DeleteError::StillActive),
    }
}
