use crate::domain::{BookTitle, BorrowError, DeleteError, RenewError, StockError};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure taxonomy shared by the Inventory Ledger and Loan Store ports.
///
/// Every variant except `Transient` and `Backend` is an expected business
/// outcome. A failed operation never leaves a partial effect behind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book not found: {0}")]
    BookNotFound(BookTitle),

    #[error("loan not found")]
    LoanNotFound,

    #[error("a book titled {0} already exists")]
    DuplicateBook(BookTitle),

    #[error("no copies available")]
    Unavailable,

    #[error("all copies are already on the shelf")]
    OverReturn,

    #[error("an active loan already exists for this member and book")]
    DuplicateActiveLoan,

    #[error("renewal limit reached or loan has lapsed")]
    Maxed,

    #[error("loan has not been returned yet")]
    StillActive,

    #[error("book stock is inconsistent: {0}")]
    InvalidStock(StockError),

    /// Lock wait, pool timeout, serialization conflict. Safe to retry.
    #[error("transient storage failure")]
    Transient(#[source] BoxError),

    #[error("storage backend error")]
    Backend(#[source] BoxError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub fn transient(err: impl Into<BoxError>) -> Self {
        StoreError::Transient(err.into())
    }

    pub fn backend(err: impl Into<BoxError>) -> Self {
        StoreError::Backend(err.into())
    }
}

impl From<StockError> for StoreError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Unavailable => StoreError::Unavailable,
            StockError::OverReturn => StoreError::OverReturn,
            other => StoreError::InvalidStock(other),
        }
    }
}

impl From<BorrowError> for StoreError {
    fn from(err: BorrowError) -> Self {
        match err {
            BorrowError::DuplicateActiveLoan => StoreError::DuplicateActiveLoan,
        }
    }
}

impl From<RenewError> for StoreError {
    fn from(err: RenewError) -> Self {
        match err {
            RenewError::LimitReached | RenewError::Lapsed => StoreError::Maxed,
        }
    }
}

impl From<DeleteError> for StoreError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::StillActive => StoreError::StillActive,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
