use crate::domain::{
    BookTitle, MemberId,
    loan::{ActiveLoan, Loan, ReturnedLoan},
};
use crate::ports::*;
use std::future::Future;
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};
use super::outcome::Outcome;

/// サービスの依存関係
///
/// 振る舞いは持たず、各操作関数に明示的に渡す。
/// サービス自体は状態を持たない。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub inventory_ledger: Arc<dyn InventoryLedger>,
    pub loan_store: Arc<dyn LoanStore>,
    pub clock: Arc<dyn Clock>,
}

/// 失敗をレベル分けしてログに残す
///
/// 業務上の拒否は warn、ストア障害は error。
fn log_failure(
    operation: &'static str,
    member_id: &MemberId,
    title: &BookTitle,
    err: &LoanApplicationError,
) {
    match err {
        LoanApplicationError::Transient(source) | LoanApplicationError::StoreError(source) => {
            tracing::error!(
                operation,
                member_id = %member_id,
                book_title = %title,
                error.cause_chain = ?source,
                error.message = %err,
                "loan operation failed"
            );
        }
        _ => {
            tracing::warn!(
                operation,
                member_id = %member_id,
                book_title = %title,
                outcome = %Outcome::from(err),
                "loan operation rejected"
            );
        }
    }
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 同じ書籍の貸出中レコードがないこと
/// - 書籍が存在し、貸出可能な冊数が1以上であること
///
/// 貸出レコードの作成と在庫の減算はストア内で一体として確定する。
pub async fn borrow_book(
    deps: &ServiceDependencies,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<ActiveLoan> {
    let borrowed_at = deps.clock.now();

    let result = deps
        .loan_store
        .create_loan(member_id, title, borrowed_at)
        .await
        .map_err(LoanApplicationError::from);

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id.value(),
            member_id = %member_id,
            book_title = %title,
            due_date = %loan.due_date(),
            "book borrowed"
        ),
        Err(err) => log_failure("borrow", member_id, title, err),
    }

    result
}

/// 貸出を延長する
///
/// ビジネスルール：
/// - 貸出中のレコードがあること
/// - 延長回数が2回未満であること
/// - 返却期限を過ぎていないこと
pub async fn renew_loan(
    deps: &ServiceDependencies,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<ActiveLoan> {
    let now = deps.clock.now();

    let result = deps
        .loan_store
        .renew_loan(member_id, title, now)
        .await
        .map_err(LoanApplicationError::from);

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id.value(),
            member_id = %member_id,
            book_title = %title,
            renew_count = loan.renew_count.value(),
            due_date = %loan.due_date(),
            "loan renewed"
        ),
        Err(err) => log_failure("renew", member_id, title, err),
    }

    result
}

/// 書籍を返却する
///
/// 延滞していても返却は受け付ける。
/// 在庫の増加に失敗した場合はレコードも返却済みにならない。
pub async fn return_book(
    deps: &ServiceDependencies,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<ReturnedLoan> {
    let now = deps.clock.now();

    let result = deps
        .loan_store
        .return_loan(member_id, title, now)
        .await
        .map_err(LoanApplicationError::from);

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id.value(),
            member_id = %member_id,
            book_title = %title,
            returned_at = %loan.returned_at,
            overdue = loan.returned_at > loan.due_date(),
            "book returned"
        ),
        Err(err) => log_failure("return", member_id, title, err),
    }

    result
}

/// 返却済みの貸出レコードを削除する
pub async fn delete_loan(
    deps: &ServiceDependencies,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<ReturnedLoan> {
    let result = deps
        .loan_store
        .delete_loan(member_id, title)
        .await
        .map_err(LoanApplicationError::from);

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id.value(),
            member_id = %member_id,
            book_title = %title,
            "loan record deleted"
        ),
        Err(err) => log_failure("delete", member_id, title, err),
    }

    result
}

/// (会員, 書名)で貸出レコードを取得する
pub async fn find_loan(
    deps: &ServiceDependencies,
    member_id: &MemberId,
    title: &BookTitle,
) -> Result<Loan> {
    deps.loan_store
        .get_loan(member_id, title)
        .await?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 会員の貸出履歴（貸出日の新しい順）
pub async fn loans_for_member(
    deps: &ServiceDependencies,
    member_id: &MemberId,
) -> Result<Vec<Loan>> {
    Ok(deps.loan_store.find_by_member(member_id).await?)
}

// ============================================================================
// 結果コードを返す入口
// ============================================================================

/// 生の識別子を検証し、操作を実行して結果コードを返す
async fn with_ids<T, F, Fut>(
    operation: &'static str,
    member_id: &str,
    title: &str,
    op: F,
) -> Outcome
where
    F: FnOnce(MemberId, BookTitle) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let ids = MemberId::parse(member_id).and_then(|m| Ok((m, BookTitle::parse(title)?)));

    match ids {
        Ok((member_id, title)) => Outcome::of(&op(member_id, title).await),
        Err(err) => {
            tracing::warn!(operation, error = %err, "rejected invalid identifiers");
            Outcome::from(&LoanApplicationError::from(err))
        }
    }
}

/// 貸出の入口
pub async fn borrow(deps: &ServiceDependencies, member_id: &str, title: &str) -> Outcome {
    with_ids("borrow", member_id, title, |m, t| async move {
        borrow_book(deps, &m, &t).await
    })
    .await
}

/// 延長の入口
pub async fn renew(deps: &ServiceDependencies, member_id: &str, title: &str) -> Outcome {
    with_ids("renew", member_id, title, |m, t| async move {
        renew_loan(deps, &m, &t).await
    })
    .await
}

/// 返却の入口
pub async fn give_back(deps: &ServiceDependencies, member_id: &str, title: &str) -> Outcome {
    with_ids("return", member_id, title, |m, t| async move {
        return_book(deps, &m, &t).await
    })
    .await
}

/// 削除の入口
pub async fn delete(deps: &ServiceDependencies, member_id: &str, title: &str) -> Outcome {
    with_ids("delete", member_id, title, |m, t| async move {
        delete_loan(deps, &m, &t).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RetryPolicy;
    use crate::adapters::memory::{Database, MemoryInventoryLedger, MemoryLoanStore};
    use crate::adapters::mock::FixedClock;
    use crate::domain::{Book, Stock, policy::Immediate};
    use chrono::Utc;
    use std::time::Duration;

    fn deps_over(db: &Database) -> ServiceDependencies {
        let retry = RetryPolicy::new(2, Duration::from_millis(5));
        ServiceDependencies {
            inventory_ledger: Arc::new(MemoryInventoryLedger::new(db.clone(), retry)),
            loan_store: Arc::new(MemoryLoanStore::new(db.clone(), Arc::new(Immediate), retry)),
            clock: Arc::new(FixedClock::new(Utc::now())),
        }
    }

    async fn add_book(deps: &ServiceDependencies, title: &str, copies: u32) {
        deps.inventory_ledger
            .add_book(Book {
                title: BookTitle::parse(title).unwrap(),
                category: "Fiction".to_string(),
                genres: vec![],
                authors: vec![],
                description: vec![],
                url: String::new(),
                pages: 100,
                stock: Stock::full(copies),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lock_wait_timeout_reports_transient_without_changes() {
        let db = Database::new(Duration::from_millis(20));
        let deps = deps_over(&db);
        add_book(&deps, "Emma", 1).await;
        let title = BookTitle::parse("Emma").unwrap();
        let ann = MemberId::parse("ann@example.com").unwrap();

        // 別の処理がロックを握ったまま
        let held = db.tables().lock().await;
        assert_eq!(borrow(&deps, "ann@example.com", "Emma").await, Outcome::Transient);
        drop(held);

        assert_eq!(
            db.tables().lock().await.books[&title].stock.available(),
            1
        );
        assert!(find_loan(&deps, &ann, &title).await.is_err());
    }

    #[tokio::test]
    async fn test_return_lock_timeout_keeps_loan_active() {
        let db = Database::new(Duration::from_millis(20));
        let deps = deps_over(&db);
        add_book(&deps, "Emma", 1).await;
        let title = BookTitle::parse("Emma").unwrap();
        let ann = MemberId::parse("ann@example.com").unwrap();
        assert_eq!(borrow(&deps, "ann@example.com", "Emma").await, Outcome::Ok);

        let held = db.tables().lock().await;
        assert_eq!(
            give_back(&deps, "ann@example.com", "Emma").await,
            Outcome::Transient
        );
        drop(held);

        assert_eq!(
            db.tables().lock().await.books[&title].stock.available(),
            0
        );
        assert!(find_loan(&deps, &ann, &title).await.unwrap().is_active());
    }
}
