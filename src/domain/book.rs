use serde::{Deserialize, Serialize};

use super::{BookTitle, StockError};

/// 在庫数
///
/// 不変条件：0 <= available <= copies
/// フィールドは非公開とし、生成と遷移をすべてこの型の関数に限定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StockRecord")]
pub struct Stock {
    copies: u32,
    available: u32,
}

#[derive(Deserialize)]
struct StockRecord {
    copies: u32,
    available: u32,
}

impl TryFrom<StockRecord> for Stock {
    type Error = StockError;

    fn try_from(record: StockRecord) -> Result<Self, Self::Error> {
        Stock::new(record.copies, record.available)
    }
}

impl Stock {
    /// 全冊が書架にある状態で作成
    pub fn full(copies: u32) -> Self {
        Self {
            copies,
            available: copies,
        }
    }

    /// 永続化された値から復元する
    pub fn new(copies: u32, available: u32) -> Result<Self, StockError> {
        if available > copies {
            return Err(StockError::AvailableExceedsCopies);
        }
        Ok(Self { copies, available })
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn on_loan(&self) -> u32 {
        self.copies - self.available
    }

    /// 1冊貸し出す
    pub fn take(self) -> Result<Self, StockError> {
        if self.available == 0 {
            return Err(StockError::Unavailable);
        }
        Ok(Self {
            available: self.available - 1,
            ..self
        })
    }

    /// 1冊戻す
    pub fn restore(self) -> Result<Self, StockError> {
        if self.available >= self.copies {
            return Err(StockError::OverReturn);
        }
        Ok(Self {
            available: self.available + 1,
            ..self
        })
    }
}

/// 蔵書
///
/// 書誌情報は登録後に変更しない。在庫数のみが貸出・返却で変化する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: BookTitle,
    pub category: String,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
    pub description: Vec<String>,
    pub url: String,
    pub pages: u32,
    #[serde(flatten)]
    pub stock: Stock,
}

/// 一覧取得時のカテゴリ指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Named(String),
}

impl CategoryFilter {
    /// "All" は全件を表す
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "All" => CategoryFilter::All,
            other => CategoryFilter::Named(other.to_string()),
        }
    }

    pub fn matches(&self, book: &Book) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(category) => &book.category == category,
        }
    }
}
