//! IdGenerator port - placeholder ID 生成の抽象化
//!
//! 楽観的 create の間だけ使う一時 ID を生成する。
//! 本物の ID は必ずリモートサービスが採番する。

use crate::domain::TaskId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は placeholder 用の一意な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（coordinator が共有するため）
pub trait IdGenerator: Send + Sync {
    fn placeholder_id(&self) -> TaskId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って timestamp 部分を決めるので、FixedClock と組み合わせると
/// timestamp 部分が決定的になる（ランダム部分は毎回異なる）。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn placeholder_id(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        TaskId::placeholder(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.placeholder_id();
        let id2 = id_gen.placeholder_id();

        assert_ne!(id1, id2);
        assert!(id1.is_placeholder());
        assert!(id2.is_placeholder());
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let (TaskId::Placeholder(a), TaskId::Placeholder(b)) =
            (id_gen.placeholder_id(), id_gen.placeholder_id())
        else {
            panic!("expected placeholder ids");
        };

        // ランダム部分があるので ID は異なるが、timestamp 部分は同じ
        assert_ne!(a, b);
        assert_eq!(a.timestamp_ms(), b.timestamp_ms());
        assert_eq!(a.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
