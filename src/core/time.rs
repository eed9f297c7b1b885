use time::{OffsetDateTime, PrimitiveDateTime};

/// Scheduling arithmetic everywhere in the crate works in unix seconds;
/// audit columns keep wall-clock timestamps.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_now_matches_primitive_now() {
        let unix = unix_now();
        let primitive = primitive_now_utc().assume_utc().unix_timestamp();
        assert!((primitive - unix).abs() <= 1);
    }
}
