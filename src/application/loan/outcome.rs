use serde::Serialize;
use std::fmt;

use super::errors::LoanApplicationError;

/// 呼び出し側（HTTP層など）に返す結果コード
///
/// 想定内の失敗はすべてここに集約され、プロセスを落とす例外にはしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Duplicate,
    Unavailable,
    NotFound,
    Maxed,
    StillActive,
    OverReturn,
    Transient,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Duplicate => "duplicate",
            Outcome::Unavailable => "unavailable",
            Outcome::NotFound => "not_found",
            Outcome::Maxed => "maxed",
            Outcome::StillActive => "still_active",
            Outcome::OverReturn => "over_return",
            Outcome::Transient => "transient",
            Outcome::Error => "error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    pub fn of<T>(result: &Result<T, LoanApplicationError>) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(err) => Outcome::from(err),
        }
    }
}

impl From<&LoanApplicationError> for Outcome {
    fn from(err: &LoanApplicationError) -> Self {
        match err {
            LoanApplicationError::InvalidInput(_)
            | LoanApplicationError::BookNotFound(_)
            | LoanApplicationError::LoanNotFound => Outcome::NotFound,
            LoanApplicationError::BookUnavailable => Outcome::Unavailable,
            LoanApplicationError::OverReturn => Outcome::OverReturn,
            LoanApplicationError::DuplicateActiveLoan => Outcome::Duplicate,
            LoanApplicationError::RenewalNotAllowed => Outcome::Maxed,
            LoanApplicationError::StillActive => Outcome::StillActive,
            LoanApplicationError::Transient(_) => Outcome::Transient,
            LoanApplicationError::StoreError(_) => Outcome::Error,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
