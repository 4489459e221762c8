//! 時刻の取得元
//!
//! 質問の作成日時はストア保存時に一度だけ決まる。
//! テストでは固定時刻を注入して日付境界を検証する。
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Mutex;

/// 現在時刻を返すトレイト
pub trait Clock: Send + Sync {
    /// 現在時刻（UTC）
    fn now(&self) -> DateTime<Utc>;
}

/// システム時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        // ストアはマイクロ秒精度で保存するため、ここで丸めておく
        Utc::now().trunc_subsecs(6)
    }
}

/// 固定時刻を返す時計
///
/// `set`で時刻を差し替えられる。
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now.trunc_subsecs(6)),
        }
    }

    /// 返す時刻を変更する
    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = now.trunc_subsecs(6);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
