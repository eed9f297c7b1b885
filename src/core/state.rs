use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::capabilities::Capabilities;
use crate::services::gradebook::Gradebook;
use crate::services::notifications::Notifier;
use crate::services::question_engine::QuestionEngine;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    question_engine: Arc<dyn QuestionEngine>,
    gradebook: Arc<dyn Gradebook>,
    notifier: Arc<dyn Notifier>,
    capabilities: Arc<dyn Capabilities>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        db: PgPool,
        question_engine: Arc<dyn QuestionEngine>,
        gradebook: Arc<dyn Gradebook>,
        notifier: Arc<dyn Notifier>,
        capabilities: Arc<dyn Capabilities>,
    ) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                db,
                question_engine,
                gradebook,
                notifier,
                capabilities,
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn question_engine(&self) -> &dyn QuestionEngine {
        self.inner.question_engine.as_ref()
    }

    pub fn gradebook(&self) -> &dyn Gradebook {
        self.inner.gradebook.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }

    pub fn capabilities(&self) -> &dyn Capabilities {
        self.inner.capabilities.as_ref()
    }
}
