//! Metric helpers recorded through the `metrics` facade.
//!
//! Recorded metrics:
//! - `backend_requests_total`: Counter with labels (method, endpoint, status)
//! - `backend_request_duration_seconds`: Histogram with labels (method, endpoint)
//! - `checkin_outcomes_total`: Counter with label (outcome)
//! - `import_rows_total`: Counter with label (stage)
//! - `session_job_runs_total`: Counter with labels (job, result)

use std::time::Duration;

use metrics::{counter, histogram};
use reqwest::Method;

/// Record one backend round trip. `status` is 0 when no response arrived.
pub fn record_backend_request(method: &Method, endpoint: &'static str, status: u16, elapsed: Duration) {
    let method = method_to_str(method);

    counter!(
        "backend_requests_total",
        "method" => method,
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "backend_request_duration_seconds",
        "method" => method,
        "endpoint" => endpoint
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_checkin_outcome(outcome: &'static str) {
    counter!("checkin_outcomes_total", "outcome" => outcome).increment(1);
}

/// Rows seen by the import workflow; `stage` is failed, recovered or retried.
pub fn record_import_rows(stage: &'static str, count: usize) {
    if count > 0 {
        counter!("import_rows_total", "stage" => stage).increment(count as u64);
    }
}

pub fn record_job_run(job: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("session_job_runs_total", "job" => job, "result" => result).increment(1);
}

fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        _ => "OTHER",
    }
}
