use crate::access::rule::{AccessRule, RuleContext};
use crate::db::models::Attempt;

/// Caps the number of counted attempts.
pub struct NumAttemptsRule {
    max_attempts: i64,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    if ctx.settings.attempts <= 0 {
        return None;
    }
    Some(Box::new(NumAttemptsRule { max_attempts: ctx.settings.attempts as i64 }))
}

impl AccessRule for NumAttemptsRule {
    fn name(&self) -> &'static str {
        "num_attempts"
    }

    fn prevent_new_attempt(
        &self,
        num_prior_attempts: i64,
        _last: Option<&Attempt>,
    ) -> Option<String> {
        if num_prior_attempts >= self.max_attempts {
            Some(format!(
                "No more attempts are allowed (maximum {})",
                self.max_attempts
            ))
        } else {
            None
        }
    }

    fn is_finished(&self, num_prior_attempts: i64, _last: Option<&Attempt>) -> bool {
        num_prior_attempts >= self.max_attempts
    }
}
