use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

use cpuload_core::error::{CpuLoadError, ErrorKind, Result};
use cpuload_core::escape::escape_html;
use cpuload_core::workload::{WorkloadKind, WorkloadOptions};

use crate::obs::LoadMetrics;

/// `function` label of the in-flight gauge (one handler kind).
pub const RUN_HANDLER: &str = "run";
/// `function` label recorded for names that match no workload.
pub const UNKNOWN_FUNCTION_LABEL: &str = "unknown";

const DEFAULT_ITERATIONS: u64 = 1;

/// Raw `/run` query parameters, before validation.
#[derive(Debug, Clone, Default)]
pub struct RunQuery {
    pub function: Option<String>,
    pub iterations: Option<String>,
}

impl RunQuery {
    pub fn new(function: Option<&str>, iterations: Option<&str>) -> Self {
        Self {
            function: function.map(str::to_string),
            iterations: iterations.map(str::to_string),
        }
    }

    /// Build from decoded query pairs. A repeated key keeps its first value.
    pub fn from_params(params: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in params {
            let slot = match key.as_str() {
                "function" => &mut query.function,
                "iterations" => &mut query.iterations,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

/// Result of one `/run` request, already accounted in metrics.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: StatusCode,
    /// `function` label the request was recorded under.
    pub function: String,
    pub elapsed: Duration,
    pub body: String,
}

/// Validates `/run` parameters, runs the selected workload, and records the outcome.
pub struct Dispatcher {
    metrics: Arc<LoadMetrics>,
    opts: WorkloadOptions,
    max_iterations: Option<u64>,
    instance_id: String,
}

impl Dispatcher {
    pub fn new(
        metrics: Arc<LoadMetrics>,
        opts: WorkloadOptions,
        max_iterations: Option<u64>,
        instance_id: String,
    ) -> Self {
        Self {
            metrics,
            opts,
            max_iterations,
            instance_id,
        }
    }

    pub fn metrics(&self) -> &LoadMetrics {
        &self.metrics
    }

    /// Handle one request on the calling thread. Blocks for the full workload.
    ///
    /// Metrics are updated exactly once regardless of outcome; the in-flight
    /// gauge is released when this returns.
    pub fn handle(&self, query: &RunQuery) -> RunOutcome {
        let _in_flight = self.metrics.in_flight(RUN_HANDLER, &self.instance_id);
        let start = Instant::now();

        let result = self.execute(query);
        let elapsed = start.elapsed();

        let function = function_label(query.function.as_deref());
        let (status, body) = match &result {
            Ok(_) => (StatusCode::OK, elapsed_line(elapsed)),
            Err(e) => (
                status_for(e.kind()),
                format!("Error: {e}\n{}", elapsed_line(elapsed)),
            ),
        };

        self.metrics.observe_run(function, status.as_u16(), elapsed);

        match &result {
            Ok(kind) => tracing::debug!(
                function = kind.as_str(),
                iterations = ?query.iterations,
                elapsed_secs = elapsed.as_secs_f64(),
                "run completed"
            ),
            Err(e) if e.kind() == ErrorKind::WorkloadExecution => tracing::warn!(
                function,
                error = %e,
                elapsed_secs = elapsed.as_secs_f64(),
                "workload failed"
            ),
            Err(e) => tracing::debug!(
                function,
                code = e.kind().as_str(),
                error = %e,
                "run rejected"
            ),
        }

        RunOutcome {
            status,
            function: function.to_string(),
            elapsed,
            body,
        }
    }

    fn execute(&self, query: &RunQuery) -> Result<WorkloadKind> {
        let iterations = parse_iterations(query.iterations.as_deref(), self.max_iterations)?;
        let kind = select_workload(query.function.as_deref())?;
        kind.run(iterations, &self.opts)?;
        Ok(kind)
    }
}

/// Parse `iterations` (default 1). Malformed or over-limit values are client errors.
pub fn parse_iterations(raw: Option<&str>, max: Option<u64>) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_ITERATIONS);
    };
    let n: u64 = raw
        .parse()
        .map_err(|e| CpuLoadError::InvalidIterations(format!("'{}': {e}", escape_html(raw))))?;
    match max {
        Some(limit) if n > limit => Err(CpuLoadError::InvalidIterations(format!(
            "{n} exceeds the configured maximum of {limit}"
        ))),
        _ => Ok(n),
    }
}

/// Map the `function` parameter onto a workload. The echoed name is HTML-escaped.
pub fn select_workload(function: Option<&str>) -> Result<WorkloadKind> {
    match function {
        None | Some("") => Err(CpuLoadError::MissingFunction),
        Some(name) => WorkloadKind::parse(name)
            .ok_or_else(|| CpuLoadError::UnknownFunction(escape_html(name))),
    }
}

/// Metrics label for the `function` parameter, bounded to known names.
pub fn function_label(function: Option<&str>) -> &'static str {
    match function {
        None | Some("") => "",
        Some(name) => WorkloadKind::parse(name)
            .map(WorkloadKind::as_str)
            .unwrap_or(UNKNOWN_FUNCTION_LABEL),
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ClientInput | ErrorKind::WorkloadExecution => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn elapsed_line(elapsed: Duration) -> String {
    format!("Elapsed Time: {:.6}", elapsed.as_secs_f64())
}
