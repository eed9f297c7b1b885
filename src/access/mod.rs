pub mod rule;
pub mod rules;

use std::collections::HashSet;

use crate::db::models::Attempt;

use rule::{AccessRule, AttemptSession, PreflightData, PreflightError, RuleContext};

pub type RuleFactory = fn(&RuleContext<'_>) -> Option<Box<dyn AccessRule>>;

/// The compile-time rule registry. Factories decline by returning `None`;
/// order only matters for how reasons are listed to the user.
pub const RULE_FACTORIES: &[RuleFactory] = &[
    rules::time_window::make,
    rules::time_limit::make,
    rules::num_attempts::make,
    rules::password::make,
    rules::security::make,
    rules::delay::make,
    rules::ip_address::make,
];

/// The active rule set for one quiz configuration, with composite answers to
/// access questions. An empty reason list always means "allowed".
pub struct AccessManager {
    rules: Vec<Box<dyn AccessRule>>,
}

impl AccessManager {
    pub fn new(ctx: &RuleContext<'_>) -> Self {
        Self::with_rules(RULE_FACTORIES.iter().filter_map(|factory| factory(ctx)).collect())
    }

    /// Assembles a manager from explicit rule instances, dropping any rule
    /// that an active rule declares itself to supersede.
    pub fn with_rules(mut rules: Vec<Box<dyn AccessRule>>) -> Self {
        let replaced: HashSet<&'static str> =
            rules.iter().flat_map(|rule| rule.supersedes().iter().copied()).collect();
        rules.retain(|rule| !replaced.contains(rule.name()));
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Union of reasons a new attempt may not start.
    pub fn prevent_new_attempt(
        &self,
        num_prior_attempts: i64,
        last: Option<&Attempt>,
    ) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule.prevent_new_attempt(num_prior_attempts, last))
            .collect()
    }

    /// Union of reasons the quiz cannot be used right now.
    pub fn prevent_access(&self) -> Vec<String> {
        self.rules.iter().filter_map(|rule| rule.prevent_access()).collect()
    }

    pub fn is_preflight_required(
        &self,
        session: &AttemptSession,
        attempt_id: Option<&str>,
    ) -> bool {
        self.rules.iter().any(|rule| rule.is_preflight_required(session, attempt_id))
    }

    /// Runs every rule that wants a preflight check and merges their errors.
    pub fn validate_preflight(
        &self,
        data: &PreflightData,
        session: &AttemptSession,
        attempt_id: Option<&str>,
    ) -> Vec<PreflightError> {
        self.rules
            .iter()
            .filter(|rule| rule.is_preflight_required(session, attempt_id))
            .flat_map(|rule| rule.validate_preflight(data, session, attempt_id))
            .collect()
    }

    pub fn notify_preflight_passed(&self, session: &mut AttemptSession) {
        for rule in &self.rules {
            rule.notify_preflight_passed(session);
        }
    }

    pub fn current_attempt_finished(&self, session: &mut AttemptSession) {
        for rule in &self.rules {
            rule.current_attempt_finished(session);
        }
    }

    /// Earliest deadline any rule imposes on the attempt.
    pub fn end_time(&self, attempt: &Attempt) -> Option<i64> {
        self.rules.iter().filter_map(|rule| rule.end_time(attempt)).min()
    }

    /// Smallest remaining time any rule wants displayed.
    pub fn time_left_display(&self, attempt: &Attempt, now: i64) -> Option<i64> {
        self.rules.iter().filter_map(|rule| rule.time_left_display(attempt, now)).min()
    }

    /// True when any rule says no further attempts will ever be possible.
    pub fn is_finished(&self, num_prior_attempts: i64, last: Option<&Attempt>) -> bool {
        self.rules.iter().any(|rule| rule.is_finished(num_prior_attempts, last))
    }

    pub fn requires_popup(&self) -> bool {
        self.rules.iter().any(|rule| rule.requires_popup())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::effective_settings::EffectiveSettings;
    use crate::test_support;

    struct SilentRule;

    impl AccessRule for SilentRule {
        fn name(&self) -> &'static str {
            "silent"
        }
    }

    struct BlockingRule {
        reason: &'static str,
        end: Option<i64>,
    }

    impl AccessRule for BlockingRule {
        fn name(&self) -> &'static str {
            "blocking"
        }

        fn prevent_access(&self) -> Option<String> {
            Some(self.reason.to_string())
        }

        fn end_time(&self, _attempt: &Attempt) -> Option<i64> {
            self.end
        }

        fn is_finished(&self, _num: i64, _last: Option<&Attempt>) -> bool {
            true
        }
    }

    struct ReplacementRule;

    impl AccessRule for ReplacementRule {
        fn name(&self) -> &'static str {
            "replacement"
        }

        fn supersedes(&self) -> &'static [&'static str] {
            &["blocking"]
        }
    }

    fn settings() -> EffectiveSettings {
        EffectiveSettings {
            time_open: 0,
            time_close: 0,
            time_limit: 0,
            attempts: 0,
            password: None,
            extra_passwords: Vec::new(),
        }
    }

    #[test]
    fn reasons_are_the_union_of_non_null_answers() {
        let manager = AccessManager::with_rules(vec![
            Box::new(SilentRule),
            Box::new(BlockingRule { reason: "password required", end: None }),
        ]);
        assert_eq!(manager.prevent_access(), vec!["password required".to_string()]);
    }

    #[test]
    fn empty_union_means_allowed() {
        let manager = AccessManager::with_rules(vec![Box::new(SilentRule), Box::new(SilentRule)]);
        assert!(manager.prevent_access().is_empty());
        assert!(manager.prevent_new_attempt(0, None).is_empty());
    }

    #[test]
    fn end_time_takes_the_earliest_deadline() {
        let attempt = test_support::attempt("q1", "u1", 1);
        let manager = AccessManager::with_rules(vec![
            Box::new(BlockingRule { reason: "a", end: Some(500) }),
            Box::new(BlockingRule { reason: "b", end: Some(300) }),
            Box::new(SilentRule),
        ]);
        assert_eq!(manager.end_time(&attempt), Some(300));
    }

    #[test]
    fn any_rule_finishing_finishes_the_quiz() {
        let manager = AccessManager::with_rules(vec![
            Box::new(SilentRule),
            Box::new(BlockingRule { reason: "a", end: None }),
        ]);
        assert!(manager.is_finished(0, None));

        let manager = AccessManager::with_rules(vec![Box::new(SilentRule)]);
        assert!(!manager.is_finished(0, None));
    }

    #[test]
    fn superseded_rules_are_dropped_at_construction() {
        let manager = AccessManager::with_rules(vec![
            Box::new(BlockingRule { reason: "a", end: None }),
            Box::new(ReplacementRule),
        ]);
        assert_eq!(manager.rule_names(), vec!["replacement"]);
        assert!(manager.prevent_access().is_empty());
    }

    #[test]
    fn factories_decline_when_not_applicable() {
        let quiz = test_support::quiz("q1");
        let settings = settings();
        let ctx = RuleContext {
            quiz: &quiz,
            settings: &settings,
            now: 1000,
            ignore_time_limits: false,
            remote_addr: None,
        };
        let manager = AccessManager::new(&ctx);
        assert!(manager.rule_names().is_empty());
    }

    #[test]
    fn factories_activate_from_effective_settings() {
        let quiz = test_support::quiz("q1");
        let mut settings = settings();
        settings.time_close = 900;
        settings.time_limit = 600;
        settings.attempts = 3;
        settings.password = Some("sesame".to_string());

        let ctx = RuleContext {
            quiz: &quiz,
            settings: &settings,
            now: 1000,
            ignore_time_limits: false,
            remote_addr: None,
        };
        let manager = AccessManager::new(&ctx);
        assert_eq!(
            manager.rule_names(),
            vec!["time_window", "time_limit", "num_attempts", "password"]
        );

        // Exemption from time limits drops that rule at the factory.
        let ctx = RuleContext { ignore_time_limits: true, ..ctx };
        let manager = AccessManager::new(&ctx);
        assert_eq!(manager.rule_names(), vec!["time_window", "num_attempts", "password"]);
    }

    #[test]
    fn preflight_flows_through_the_manager() {
        let quiz = test_support::quiz("q1");
        let mut settings = settings();
        settings.password = Some("sesame".to_string());
        let ctx = RuleContext {
            quiz: &quiz,
            settings: &settings,
            now: 1000,
            ignore_time_limits: false,
            remote_addr: None,
        };
        let manager = AccessManager::new(&ctx);

        let mut session = AttemptSession::default();
        assert!(manager.is_preflight_required(&session, None));

        let errors = manager.validate_preflight(
            &PreflightData { password: Some("wrong".to_string()) },
            &session,
            None,
        );
        assert_eq!(errors.len(), 1);

        let errors = manager.validate_preflight(
            &PreflightData { password: Some("sesame".to_string()) },
            &session,
            None,
        );
        assert!(errors.is_empty());

        manager.notify_preflight_passed(&mut session);
        assert!(!manager.is_preflight_required(&session, None));

        manager.current_attempt_finished(&mut session);
        assert!(manager.is_preflight_required(&session, None));
    }
}
