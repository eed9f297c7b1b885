use crate::access::rule::{AccessRule, RuleContext};
use crate::db::models::Attempt;

/// Imposes the per-attempt elapsed-time cutoff.
pub struct TimeLimitRule {
    time_limit: i64,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    if ctx.settings.time_limit <= 0 || ctx.ignore_time_limits {
        return None;
    }
    Some(Box::new(TimeLimitRule { time_limit: ctx.settings.time_limit }))
}

impl AccessRule for TimeLimitRule {
    fn name(&self) -> &'static str {
        "time_limit"
    }

    fn end_time(&self, attempt: &Attempt) -> Option<i64> {
        Some(attempt.time_start + self.time_limit)
    }

    fn time_left_display(&self, attempt: &Attempt, now: i64) -> Option<i64> {
        Some(attempt.time_start + self.time_limit - now)
    }
}
