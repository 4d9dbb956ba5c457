//! `rawload load` command implementation

use crate::config::LoaderConfig;
use crate::connection::PgConnector;
use crate::error::FatalError;
use crate::orchestrator::BatchOrchestrator;
use crate::outcome::BatchSummary;
use crate::report::TracingReporter;
use crate::LoadArgs;
use std::path::Path;
use tracing::info;

/// Run one batch against PostgreSQL
pub async fn run(config_path: Option<&Path>, args: &LoadArgs) -> Result<i32, FatalError> {
    let config = LoaderConfig::load(config_path, args.overrides())?;
    info!(
        source_root = %config.source_root.display(),
        entries = config.registry.len(),
        copy_mode = %config.copy.mode,
        jobs = config.jobs,
        "Configuration resolved"
    );

    let connector = PgConnector::new(&config.database);
    let orchestrator = BatchOrchestrator::new(config, connector, TracingReporter);
    let summary = orchestrator.run().await?;

    if let Some(path) = &args.summary_json {
        write_summary(path, &summary).await?;
        info!(path = %path.display(), "Summary written");
    }

    Ok(summary.exit_code())
}

async fn write_summary(path: &Path, summary: &BatchSummary) -> Result<(), FatalError> {
    let wrap = |source: std::io::Error| FatalError::Summary {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(summary).map_err(|e| wrap(e.into()))?;
    tokio::fs::write(path, json).await.map_err(wrap)
}
