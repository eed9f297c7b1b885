use async_trait::async_trait;

pub const CAP_IGNORE_TIME_LIMITS: &str = "quiz:ignoretimelimits";
pub const CAP_PREVIEW: &str = "quiz:preview";

/// Boolean capability queries against the enrolment/permission system.
#[async_trait]
pub trait Capabilities: Send + Sync {
    async fn has_capability(&self, name: &str, context_id: &str, user_id: &str) -> bool;
}

/// Default for the worker process, which never grants special rights.
pub struct DenyAllCapabilities;

#[async_trait]
impl Capabilities for DenyAllCapabilities {
    async fn has_capability(&self, _name: &str, _context_id: &str, _user_id: &str) -> bool {
        false
    }
}
