mod common;

use chrono::{Duration, TimeZone, Utc};
use rusty_library_loans::adapters::RetryPolicy;
use rusty_library_loans::adapters::mock::FixedClock;
use rusty_library_loans::adapters::postgres::{PostgresInventoryLedger, PostgresLoanStore};
use rusty_library_loans::application::catalog;
use rusty_library_loans::application::loan::{
    Outcome, ServiceDependencies, borrow, delete, find_loan, give_back, loans_for_member, renew,
};
use rusty_library_loans::domain::policy::Immediate;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

use common::{book, member, stock_of, title};

/// テスト間で衝突しない識別子
///
/// データベースは共有されるため、テストごとに書名と会員IDを変える。
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// PostgreSQLアダプターで依存関係を組み立てる
fn postgres_deps(pool: &PgPool) -> (ServiceDependencies, Arc<FixedClock>) {
    let retry = RetryPolicy::new(3, StdDuration::from_millis(20));
    let lock_timeout = StdDuration::from_secs(2);
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));

    let deps = ServiceDependencies {
        inventory_ledger: Arc::new(PostgresInventoryLedger::new(
            pool.clone(),
            lock_timeout,
            retry,
        )),
        loan_store: Arc::new(PostgresLoanStore::new(
            pool.clone(),
            Arc::new(Immediate),
            lock_timeout,
            retry,
        )),
        clock: clock.clone(),
    };

    (deps, clock)
}

#[tokio::test]
#[ignore] // Requires PostgreSQL, run with: cargo test --test postgres_store_test -- --ignored
async fn test_postgres_borrow_renew_return_delete() {
    let pool = common::create_test_pool().await;
    let beloved = unique("Beloved");
    let ann = unique("ann@example.com");
    let bob = unique("bob@example.com");
    let (deps, clock) = postgres_deps(&pool);

    catalog::add_book(&deps, book(&beloved, 1, 1))
        .await
        .expect("Failed to add book");

    assert_eq!(borrow(&deps, &ann, &beloved).await, Outcome::Ok);
    assert_eq!(stock_of(&deps, &beloved).await.available(), 0);
    assert_eq!(
        borrow(&deps, &bob, &beloved).await,
        Outcome::Unavailable
    );

    clock.advance(Duration::days(3));
    assert_eq!(renew(&deps, &ann, &beloved).await, Outcome::Ok);

    let loan = find_loan(&deps, &member(&ann), &title(&beloved))
        .await
        .expect("Loan should exist");
    assert_eq!(loan.core().renew_count.value(), 1);
    assert_eq!(
        loan.core().borrowed_at,
        Utc.with_ymd_and_hms(2024, 6, 4, 9, 0, 0).unwrap()
    );

    assert_eq!(
        delete(&deps, &ann, &beloved).await,
        Outcome::StillActive
    );
    assert_eq!(
        give_back(&deps, &ann, &beloved).await,
        Outcome::Ok
    );
    assert_eq!(stock_of(&deps, &beloved).await.available(), 1);
    assert_eq!(
        delete(&deps, &ann, &beloved).await,
        Outcome::Ok
    );
    assert_eq!(
        delete(&deps, &ann, &beloved).await,
        Outcome::NotFound
    );
}

#[tokio::test]
#[ignore] // Requires PostgreSQL, run with: cargo test --test postgres_store_test -- --ignored
async fn test_postgres_duplicate_borrow_rolls_back_stock() {
    let pool = common::create_test_pool().await;
    let jazz = unique("Jazz");
    let ann = unique("ann@example.com");
    let (deps, _clock) = postgres_deps(&pool);

    catalog::add_book(&deps, book(&jazz, 3, 3))
        .await
        .expect("Failed to add book");

    assert_eq!(borrow(&deps, &ann, &jazz).await, Outcome::Ok);
    assert_eq!(
        borrow(&deps, &ann, &jazz).await,
        Outcome::Duplicate
    );

    // 重複時の減算はロールバックされている
    assert_eq!(stock_of(&deps, &jazz).await.available(), 2);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL, run with: cargo test --test postgres_store_test -- --ignored
async fn test_postgres_reborrow_after_return_replaces_record() {
    let pool = common::create_test_pool().await;
    let jazz = unique("Jazz");
    let ann = unique("ann@example.com");
    let (deps, clock) = postgres_deps(&pool);

    catalog::add_book(&deps, book(&jazz, 1, 1))
        .await
        .expect("Failed to add book");

    borrow(&deps, &ann, &jazz).await;
    renew(&deps, &ann, &jazz).await;
    give_back(&deps, &ann, &jazz).await;

    clock.advance(Duration::days(1));
    assert_eq!(borrow(&deps, &ann, &jazz).await, Outcome::Ok);

    let loans = loans_for_member(&deps, &member(&ann))
        .await
        .expect("Failed to list loans");
    assert_eq!(loans.len(), 1);
    assert!(loans[0].is_active());
    assert_eq!(loans[0].core().renew_count.value(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires PostgreSQL, run with: cargo test --test postgres_store_test -- --ignored
async fn test_postgres_concurrent_borrows_of_last_copy() {
    const N: usize = 12;

    let pool = common::create_test_pool().await;
    let beloved = unique("Beloved");
    let (deps, _clock) = postgres_deps(&pool);
    let deps = Arc::new(deps);

    catalog::add_book(&deps, book(&beloved, 1, 1))
        .await
        .expect("Failed to add book");

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let deps = deps.clone();
            let member_id = unique(&format!("member{}@example.com", i));
            let book_title = beloved.clone();
            tokio::spawn(async move { borrow(&deps, &member_id, &book_title).await })
        })
        .collect();

    let outcomes: Vec<Outcome> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Ok).count(), 1);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Ok | Outcome::Unavailable | Outcome::Transient))
    );

    let stock = stock_of(&deps, &beloved).await;
    assert_eq!(stock.available(), 0);
    assert_eq!(stock.copies(), 1);
}
