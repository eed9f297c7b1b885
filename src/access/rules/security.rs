use crate::access::rule::{AccessRule, RuleContext};
use crate::db::types::BrowserSecurity;

/// Presentation hints for quizzes that want a restricted popup window.
pub struct SecurityRule;

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    if ctx.quiz.browser_security == BrowserSecurity::None {
        return None;
    }
    Some(Box::new(SecurityRule))
}

impl AccessRule for SecurityRule {
    fn name(&self) -> &'static str {
        "security"
    }

    fn requires_popup(&self) -> bool {
        true
    }
}
