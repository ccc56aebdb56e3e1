use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{RenewError, ValueError};

/// 延長回数の上限
pub const MAX_RENEWALS: u8 = 2;

/// 貸出ID - 貸出レコードの代理キー
///
/// 業務上の識別は(会員, 書名)の組で行う。IDは永続化とログ用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

/// 会員ID - 認証済みセッションから渡される不透明な識別子（例: メールアドレス）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// 前後の空白を除去して作成する。空文字は不可。
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValueError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValueError::EmptyMemberId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MemberId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 書名 - 蔵書の一意キー
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookTitle(String);

impl BookTitle {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValueError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValueError::EmptyBookTitle);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BookTitle {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BookTitle> for String {
    fn from(title: BookTitle) -> Self {
        title.0
    }
}

impl fmt::Display for BookTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 延長回数
///
/// 不変条件：延長は2回まで。
/// 型システムでこの制約を強制し、上限を超える値を作成できないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RenewCount(u8);

impl RenewCount {
    /// 新規作成（0回）
    pub fn new() -> Self {
        Self(0)
    }

    /// 延長回数を増やす
    ///
    /// # エラー
    /// 既に上限まで延長済みの場合は`RenewError::LimitReached`を返す
    pub fn increment(self) -> Result<Self, RenewError> {
        if !self.can_renew() {
            return Err(RenewError::LimitReached);
        }
        Ok(Self(self.0 + 1))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn can_renew(&self) -> bool {
        self.0 < MAX_RENEWALS
    }
}

impl Default for RenewCount {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<u8> for RenewCount {
    type Error = RenewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > MAX_RENEWALS {
            return Err(RenewError::LimitReached);
        }
        Ok(Self(value))
    }
}

impl From<RenewCount> for u8 {
    fn from(count: RenewCount) -> Self {
        count.0
    }
}
