use crate::access::rule::{AccessRule, RuleContext};
use crate::db::models::Attempt;

/// How close to the deadline the remaining time starts being displayed.
const SHOW_TIME_BEFORE_DEADLINE: i64 = 3600;

/// Blocks use of the quiz outside its open/close window.
pub struct TimeWindowRule {
    time_open: i64,
    time_close: i64,
    now: i64,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    if ctx.settings.time_open == 0 && ctx.settings.time_close == 0 {
        return None;
    }
    Some(Box::new(TimeWindowRule {
        time_open: ctx.settings.time_open,
        time_close: ctx.settings.time_close,
        now: ctx.now,
    }))
}

impl AccessRule for TimeWindowRule {
    fn name(&self) -> &'static str {
        "time_window"
    }

    fn prevent_access(&self) -> Option<String> {
        if self.time_open > 0 && self.now < self.time_open {
            return Some("This quiz is not open yet".to_string());
        }
        if self.time_close > 0 && self.now > self.time_close {
            return Some("This quiz has closed".to_string());
        }
        None
    }

    fn end_time(&self, _attempt: &Attempt) -> Option<i64> {
        (self.time_close > 0).then_some(self.time_close)
    }

    fn time_left_display(&self, _attempt: &Attempt, now: i64) -> Option<i64> {
        if self.time_close > 0 && self.time_close - now < SHOW_TIME_BEFORE_DEADLINE {
            Some(self.time_close - now)
        } else {
            None
        }
    }

    fn is_finished(&self, _num_prior_attempts: i64, _last: Option<&Attempt>) -> bool {
        self.time_close > 0 && self.now > self.time_close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn rule(open: i64, close: i64, now: i64) -> TimeWindowRule {
        TimeWindowRule { time_open: open, time_close: close, now }
    }

    #[test]
    fn closed_window_blocks_access() {
        assert!(rule(100, 200, 50).prevent_access().is_some());
        assert!(rule(100, 200, 150).prevent_access().is_none());
        assert!(rule(100, 200, 250).prevent_access().is_some());
    }

    #[test]
    fn unbounded_close_never_blocks_late_access() {
        assert!(rule(100, 0, i64::MAX).prevent_access().is_none());
    }

    #[test]
    fn close_time_is_the_rules_deadline() {
        let attempt = test_support::attempt("q1", "u1", 1);
        assert_eq!(rule(0, 200, 150).end_time(&attempt), Some(200));
        assert_eq!(rule(100, 0, 150).end_time(&attempt), None);
    }

    #[test]
    fn time_left_shows_only_near_the_deadline() {
        let attempt = test_support::attempt("q1", "u1", 1);
        assert_eq!(rule(0, 10_000, 0).time_left_display(&attempt, 9_500), Some(500));
        assert_eq!(rule(0, 10_000, 0).time_left_display(&attempt, 1_000), None);
    }

    #[test]
    fn past_close_means_finished_forever() {
        assert!(rule(0, 200, 300).is_finished(0, None));
        assert!(!rule(0, 200, 100).is_finished(0, None));
    }
}
