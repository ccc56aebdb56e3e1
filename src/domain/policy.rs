use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Mutex;

/// 延長・返却時に記録する日時の決定方針
///
/// 戻り値は呼び出し側で必ず `[borrowed_at, now]` に丸められるため、
/// 実装が範囲外の値を返しても不変条件は崩れない。
pub trait DatePolicy: Send + Sync {
    /// 延長後の貸出日
    fn renewed_borrow_date(&self, borrowed_at: DateTime<Utc>, now: DateTime<Utc>)
    -> DateTime<Utc>;

    /// 返却日
    fn return_date(&self, borrowed_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc>;
}

/// 既定の方針：どちらも現在時刻
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl DatePolicy for Immediate {
    fn renewed_borrow_date(
        &self,
        _borrowed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        now
    }

    fn return_date(&self, _borrowed_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        now
    }
}

/// シード付き乱数で日時を遡らせる方針（デモデータ作成用）
///
/// 貸出日から最大 `max_offset` 進めた日時を選び、現在時刻で打ち切る。
#[derive(Debug)]
pub struct RandomBackdate {
    rng: Mutex<StdRng>,
    max_offset: Duration,
}

impl RandomBackdate {
    pub fn new(seed: u64, max_offset: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_offset,
        }
    }

    fn advance(&self, borrowed_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let max_secs = self.max_offset.num_seconds().max(0);
        let offset = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..=max_secs),
            // 別スレッドのpanicで汚染された場合は遡らせない
            Err(_) => max_secs,
        };
        clamp_to_window(borrowed_at + Duration::seconds(offset), borrowed_at, now)
    }
}

impl DatePolicy for RandomBackdate {
    fn renewed_borrow_date(
        &self,
        borrowed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        self.advance(borrowed_at, now)
    }

    fn return_date(&self, borrowed_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        self.advance(borrowed_at, now)
    }
}

/// `candidate` を `[floor, now]` に収める。floor > now の場合は floor を優先する。
pub fn clamp_to_window(
    candidate: DateTime<Utc>,
    floor: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    candidate.min(now).max(floor)
}
