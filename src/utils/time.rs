use chrono::{DateTime, Utc};

/// Milliseconds elapsed between two instants, clamped at zero.
pub fn elapsed_millis(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_elapsed_millis_clamps_negative() {
        let a = Utc.timestamp_millis_opt(1_000).unwrap();
        let b = Utc.timestamp_millis_opt(1_250).unwrap();
        assert_eq!(elapsed_millis(a, b), 250);
        assert_eq!(elapsed_millis(b, a), 0);
    }
}
