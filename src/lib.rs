use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::prelude::*;

pub mod catalog;
pub mod common;
pub mod config;
pub mod sql;

#[cfg(test)]
mod testutil;

pub use catalog::{Catalog, MemCatalog};
pub use common::{PlanError, PlanResult};
pub use sql::ast_to_plan::{translate, Translation};
pub use sql::rewriter::{DefaultRewriter, ExpressionRewriter};
pub use sql::session::SessionContext;

use sql::ast::Statement;

/// Installs stdout and daily-rolling file logging at `config::LOG_PATH`.
pub fn init_log() -> PlanResult<()> {
    init_log_to(Path::new(config::LOG_PATH))
}

pub fn init_log_to(log_path: &Path) -> PlanResult<()> {
    let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let log_filename = log_path
        .file_name()
        .ok_or_else(|| PlanError::Internal(format!("invalid log path {}", log_path.display())))?;
    fs::create_dir_all(log_dir).map_err(|e| PlanError::Internal(format!("create log dir: {}", e)))?;

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_thread_names(true)
        .with_level(true);

    let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config::LOG_LEVEL))
        .with(stdout_log)
        .with(file_log)
        .try_init()
        .map_err(|e| PlanError::Internal(format!("init log: {}", e)))?;

    // The writer thread lives as long as the process.
    Box::leak(Box::new(guard));
    info!("log file path: {}", log_path.display());
    Ok(())
}

/// Translates independent statements in parallel. Each statement gets its own
/// builder; results come back in input order.
pub fn translate_all(
    stmts: &[Statement],
    catalog: &dyn Catalog,
    session: &SessionContext,
    rewriter: &dyn ExpressionRewriter,
) -> Vec<PlanResult<Translation>> {
    stmts
        .par_iter()
        .map(|stmt| translate(stmt, catalog, session, rewriter))
        .collect()
}
