use std::net::IpAddr;

use crate::db::models::{Attempt, Quiz};
use crate::services::effective_settings::EffectiveSettings;

/// Everything a rule factory can inspect when deciding whether to activate
/// and what to enforce. Built once per (quiz, user, request).
pub struct RuleContext<'a> {
    pub quiz: &'a Quiz,
    pub settings: &'a EffectiveSettings,
    pub now: i64,
    /// The user holds the capability exempting them from time limits.
    pub ignore_time_limits: bool,
    pub remote_addr: Option<IpAddr>,
}

/// Session-scoped flags the web layer carries between requests on behalf of
/// the rules; rules mutate it only through the notify hooks.
#[derive(Debug, Default, Clone)]
pub struct AttemptSession {
    pub password_validated: bool,
}

/// Data submitted through the preflight form.
#[derive(Debug, Default, Clone)]
pub struct PreflightData {
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightError {
    pub field: &'static str,
    pub message: String,
}

/// One pluggable access predicate. Every method has a neutral default so a
/// rule implements only the checks it cares about; reasons are values, never
/// errors.
pub trait AccessRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Names of rules this one replaces when both would be active.
    fn supersedes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reason a new attempt may not start, given how many counted attempts
    /// exist already.
    fn prevent_new_attempt(
        &self,
        _num_prior_attempts: i64,
        _last: Option<&Attempt>,
    ) -> Option<String> {
        None
    }

    /// Reason the quiz may not be used right now at all, attempt count aside.
    fn prevent_access(&self) -> Option<String> {
        None
    }

    fn is_preflight_required(&self, _session: &AttemptSession, _attempt_id: Option<&str>) -> bool {
        false
    }

    fn validate_preflight(
        &self,
        _data: &PreflightData,
        _session: &AttemptSession,
        _attempt_id: Option<&str>,
    ) -> Vec<PreflightError> {
        Vec::new()
    }

    fn notify_preflight_passed(&self, _session: &mut AttemptSession) {}

    fn current_attempt_finished(&self, _session: &mut AttemptSession) {}

    /// This rule's own deadline for the attempt, if it imposes one.
    fn end_time(&self, _attempt: &Attempt) -> Option<i64> {
        None
    }

    fn time_left_display(&self, _attempt: &Attempt, _now: i64) -> Option<i64> {
        None
    }

    /// No further attempts will ever be possible.
    fn is_finished(&self, _num_prior_attempts: i64, _last: Option<&Attempt>) -> bool {
        false
    }

    fn requires_popup(&self) -> bool {
        false
    }
}
