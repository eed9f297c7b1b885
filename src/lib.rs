pub mod access;
pub mod core;
pub mod db;
pub mod repositories;
pub mod services;
pub mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::capabilities::DenyAllCapabilities;
use crate::services::gradebook::LoggingGradebook;
use crate::services::notifications::LoggingNotifier;
use crate::services::question_engine::PgQuestionEngine;

/// Starts the sweeper worker: the scheduled process that force-finishes
/// attempts past their deadline. The web/API layer consumes the rest of the
/// crate in-process and is expected to wire its own collaborators.
pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let state = AppState::new(
        settings,
        db_pool.clone(),
        Arc::new(PgQuestionEngine::new(db_pool)),
        Arc::new(LoggingGradebook),
        Arc::new(LoggingNotifier),
        Arc::new(DenyAllCapabilities),
    );

    tracing::info!(
        environment = %state.settings().runtime().environment.as_str(),
        interval_seconds = state.settings().sweeper().interval_seconds,
        "quizcore sweeper worker starting"
    );

    tasks::scheduler::run(state).await
}
