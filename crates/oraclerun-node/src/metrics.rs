//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use oraclerun_core::RunStatus;

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_job_run_metrics(state, &mut output).await;

    output
}

/// Collect job run metrics by status.
async fn collect_job_run_metrics(state: &Arc<AppState>, output: &mut String) {
    let runs = match state.store.job_runs().await {
        Ok(runs) => runs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load job runs for metrics");
            Vec::new()
        }
    };

    writeln!(
        output,
        "# HELP oraclerun_job_runs Number of job runs by status"
    )
    .ok();
    writeln!(output, "# TYPE oraclerun_job_runs gauge").ok();
    for status in RunStatus::ALL {
        let count = runs.iter().filter(|run| run.status == status).count();
        writeln!(output, "oraclerun_job_runs{{status=\"{status}\"}} {count}").ok();
    }

    let task_runs: usize = runs.iter().map(|run| run.task_runs.len()).sum();
    writeln!(output).ok();
    writeln!(
        output,
        "# HELP oraclerun_task_runs_total Total number of task runs"
    )
    .ok();
    writeln!(output, "# TYPE oraclerun_task_runs_total gauge").ok();
    writeln!(output, "oraclerun_task_runs_total {task_runs}").ok();
}
