use chrono::{DateTime, Duration, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn deadline(started_at: DateTime<Utc>, time_limit_minutes: i32) -> DateTime<Utc> {
    started_at + Duration::minutes(i64::from(time_limit_minutes))
}

/// Whole seconds left until `deadline`, never negative.
pub fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().max(0)
}

pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let secs = (now - started_at).num_seconds().max(0);
    i32::try_from(secs).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_clamps_at_zero() {
        let start = Utc::now();
        let end = deadline(start, 1);
        assert_eq!(remaining_seconds(end, start), 60);
        assert_eq!(remaining_seconds(end, start + Duration::seconds(61)), 0);
    }

    #[test]
    fn elapsed_ignores_clock_skew() {
        let start = Utc::now();
        assert_eq!(elapsed_seconds(start, start - Duration::seconds(5)), 0);
        assert_eq!(elapsed_seconds(start, start + Duration::seconds(90)), 90);
    }
}
