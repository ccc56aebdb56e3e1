use crate::adapters::retry::RetryPolicy;
use crate::domain::{Book, BookTitle, CategoryFilter, Stock};
use crate::ports::StoreError;
use crate::ports::inventory_ledger::{InventoryLedger as InventoryLedgerTrait, Result};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow, types::Json};
use std::time::Duration;

use super::{begin, commit};

/// 行データから在庫数を復元する
fn map_row_to_stock(row: &PgRow) -> Result<Stock> {
    let copies: i32 = row.try_get("copies")?;
    let available: i32 = row.try_get("available")?;

    let copies = u32::try_from(copies)
        .map_err(|_| StoreError::backend(format!("copies out of range: {}", copies)))?;
    let available = u32::try_from(available)
        .map_err(|_| StoreError::backend(format!("available out of range: {}", available)))?;

    Ok(Stock::new(copies, available)?)
}

/// 行データを蔵書に変換する
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let title: String = row.try_get("title")?;
    let pages: i32 = row.try_get("pages")?;
    let Json(genres): Json<Vec<String>> = row.try_get("genres")?;
    let Json(authors): Json<Vec<String>> = row.try_get("authors")?;
    let Json(description): Json<Vec<String>> = row.try_get("description")?;

    Ok(Book {
        title: BookTitle::parse(title).map_err(StoreError::backend)?,
        category: row.try_get("category")?,
        genres,
        authors,
        description,
        url: row.try_get("url")?,
        pages: u32::try_from(pages)
            .map_err(|_| StoreError::backend(format!("pages out of range: {}", pages)))?,
        stock: map_row_to_stock(row)?,
    })
}

/// INTEGER列に収まらない値は書き込まずにエラーにする
fn to_integer_column(column: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::backend(format!("{} out of range: {}", column, value)))
}

/// 書名が存在しなければ`BookNotFound`、存在すれば`otherwise`
async fn missing_or(conn: &mut PgConnection, title: &BookTitle, otherwise: StoreError) -> StoreError {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books WHERE title = $1)")
        .bind(title.as_str())
        .fetch_one(&mut *conn)
        .await;

    match exists {
        Ok(true) => otherwise,
        Ok(false) => StoreError::BookNotFound(title.clone()),
        Err(e) => e.into(),
    }
}

/// 呼び出し側のトランザクション内で在庫を1減らす
///
/// 条件付きUPDATE 1文で「available > 0 のときだけ減らす」を表現する。
pub(crate) async fn decrement_in(conn: &mut PgConnection, title: &BookTitle) -> Result<Stock> {
    let row = sqlx::query(
        r#"
        UPDATE books
        SET available = available - 1
        WHERE title = $1 AND available > 0
        RETURNING copies, available
        "#,
    )
    .bind(title.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => map_row_to_stock(&row),
        None => Err(missing_or(conn, title, StoreError::Unavailable).await),
    }
}

/// 呼び出し側のトランザクション内で在庫を1増やす
pub(crate) async fn increment_in(conn: &mut PgConnection, title: &BookTitle) -> Result<Stock> {
    let row = sqlx::query(
        r#"
        UPDATE books
        SET available = available + 1
        WHERE title = $1 AND available < copies
        RETURNING copies, available
        "#,
    )
    .bind(title.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => map_row_to_stock(&row),
        None => Err(missing_or(conn, title, StoreError::OverReturn).await),
    }
}

/// PostgreSQL implementation of InventoryLedger
pub struct InventoryLedger {
    pool: PgPool,
    lock_timeout: Duration,
    retry: RetryPolicy,
}

impl InventoryLedger {
    pub fn new(pool: PgPool, lock_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            pool,
            lock_timeout,
            retry,
        }
    }

    async fn add_book_once(&self, book: &Book) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (
                title,
                category,
                genres,
                authors,
                description,
                url,
                pages,
                copies,
                available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(book.title.as_str())
        .bind(&book.category)
        .bind(Json(&book.genres))
        .bind(Json(&book.authors))
        .bind(Json(&book.description))
        .bind(&book.url)
        .bind(to_integer_column("pages", book.pages)?)
        .bind(to_integer_column("copies", book.stock.copies())?)
        .bind(to_integer_column("available", book.stock.available())?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateBook(book.title.clone()));
        }
        Ok(())
    }

    async fn get_book_once(&self, title: &BookTitle) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT title, category, genres, authors, description, url, pages, copies, available
            FROM books
            WHERE title = $1
            "#,
        )
        .bind(title.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_books_once(&self, filter: &CategoryFilter) -> Result<Vec<Book>> {
        let category = match filter {
            CategoryFilter::All => None,
            CategoryFilter::Named(category) => Some(category.as_str()),
        };

        let rows = sqlx::query(
            r#"
            SELECT title, category, genres, authors, description, url, pages, copies, available
            FROM books
            WHERE $1::text IS NULL OR category = $1
            ORDER BY title ASC
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn decrement_once(&self, title: &BookTitle) -> Result<Stock> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;
        let stock = decrement_in(&mut tx, title).await?;
        commit(tx).await?;
        Ok(stock)
    }

    async fn increment_once(&self, title: &BookTitle) -> Result<Stock> {
        let mut tx = begin(&self.pool, self.lock_timeout).await?;
        let stock = increment_in(&mut tx, title).await?;
        commit(tx).await?;
        Ok(stock)
    }
}

#[async_trait]
impl InventoryLedgerTrait for InventoryLedger {
    async fn add_book(&self, book: Book) -> Result<()> {
        let book = &book;
        self.retry
            .run("add_book", move || self.add_book_once(book))
            .await
    }

    async fn get_book(&self, title: &BookTitle) -> Result<Option<Book>> {
        self.retry
            .run("get_book", move || self.get_book_once(title))
            .await
    }

    async fn list_books(&self, filter: &CategoryFilter) -> Result<Vec<Book>> {
        self.retry
            .run("list_books", move || self.list_books_once(filter))
            .await
    }

    async fn decrement(&self, title: &BookTitle) -> Result<Stock> {
        self.retry
            .run("decrement", move || self.decrement_once(title))
            .await
    }

    async fn increment(&self, title: &BookTitle) -> Result<Stock> {
        self.retry
            .run("increment", move || self.increment_once(title))
            .await
    }
}
