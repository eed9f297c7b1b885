use crate::access::rule::{AccessRule, RuleContext};
use crate::db::models::Attempt;

/// Enforces the minimum wait after the first and subsequent attempts.
pub struct DelayRule {
    delay_attempt1: i64,
    delay_attempt2: i64,
    now: i64,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    if ctx.quiz.delay_attempt1 <= 0 && ctx.quiz.delay_attempt2 <= 0 {
        return None;
    }
    Some(Box::new(DelayRule {
        delay_attempt1: ctx.quiz.delay_attempt1,
        delay_attempt2: ctx.quiz.delay_attempt2,
        now: ctx.now,
    }))
}

impl AccessRule for DelayRule {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn prevent_new_attempt(
        &self,
        num_prior_attempts: i64,
        last: Option<&Attempt>,
    ) -> Option<String> {
        let last = last?;
        if !last.state.is_terminal() || last.time_finish == 0 {
            return None;
        }

        let delay = match num_prior_attempts {
            0 => return None,
            1 => self.delay_attempt1,
            _ => self.delay_attempt2,
        };
        if delay <= 0 {
            return None;
        }

        let next_allowed = last.time_finish + delay;
        if self.now < next_allowed {
            Some(format!(
                "You must wait {} more seconds before your next attempt",
                next_allowed - self.now
            ))
        } else {
            None
        }
    }
}
