use crate::access::rule::{AccessRule, AttemptSession, PreflightData, PreflightError, RuleContext};

/// Collects a password through the preflight form before the first use in a
/// session; once validated the session remembers it until the attempt ends.
pub struct PasswordRule {
    password: String,
    extra_passwords: Vec<String>,
}

pub fn make(ctx: &RuleContext<'_>) -> Option<Box<dyn AccessRule>> {
    let password = ctx.settings.password.as_deref()?.trim();
    if password.is_empty() {
        return None;
    }
    Some(Box::new(PasswordRule {
        password: password.to_string(),
        extra_passwords: ctx.settings.extra_passwords.clone(),
    }))
}

impl PasswordRule {
    fn matches(&self, candidate: &str) -> bool {
        candidate == self.password || self.extra_passwords.iter().any(|extra| extra == candidate)
    }
}

impl AccessRule for PasswordRule {
    fn name(&self) -> &'static str {
        "password"
    }

    fn is_preflight_required(&self, session: &AttemptSession, _attempt_id: Option<&str>) -> bool {
        !session.password_validated
    }

    fn validate_preflight(
        &self,
        data: &PreflightData,
        _session: &AttemptSession,
        _attempt_id: Option<&str>,
    ) -> Vec<PreflightError> {
        match data.password.as_deref().map(str::trim) {
            Some(candidate) if !candidate.is_empty() => {
                if self.matches(candidate) {
                    Vec::new()
                } else {
                    vec![PreflightError {
                        field: "password",
                        message: "The password entered was incorrect".to_string(),
                    }]
                }
            }
            _ => vec![PreflightError {
                field: "password",
                message: "A password is required for this quiz".to_string(),
            }],
        }
    }

    fn notify_preflight_passed(&self, session: &mut AttemptSession) {
        session.password_validated = true;
    }

    fn current_attempt_finished(&self, session: &mut AttemptSession) {
        session.password_validated = false;
    }
}
