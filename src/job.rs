//! Job wrapper: correlation id, timing, and a success/failure event per call.

use std::error::Error;
use std::time::Instant;

use snafu::Report;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::emit;
use crate::metrics::events::{JobCompleted, RunStatus};

/// Run `f` as the job `name`.
///
/// Everything `f` logs is nested in a span carrying `job` and a fresh
/// UUIDv7 `event_id`. Completion is logged with `status` and `duration_ms`,
/// and a `JobCompleted` metric is emitted. The result is returned unchanged.
pub fn run_job<T, E, F>(name: &str, f: F) -> Result<T, E>
where
    E: Error,
    F: FnOnce() -> Result<T, E>,
{
    let event_id = Uuid::now_v7();
    let span = info_span!("job", job = name, %event_id);
    let _guard = span.enter();

    info!(status = "started", "Job started");
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();

    let status = match &result {
        Ok(_) => {
            info!(
                status = "success",
                duration_ms = duration.as_millis() as u64,
                "Job finished"
            );
            RunStatus::Success
        }
        Err(e) => {
            error!(
                status = "failure",
                duration_ms = duration.as_millis() as u64,
                error = %Report::from_error(e),
                "Job failed"
            );
            RunStatus::Failed
        }
    };
    emit!(JobCompleted {
        job: name,
        status,
        duration,
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl Error for Boom {}

    #[test]
    fn test_result_passes_through() {
        let ok: Result<u32, Boom> = run_job("answer", || Ok(42));
        assert_eq!(ok.unwrap(), 42);

        let err: Result<u32, Boom> = run_job("explode", || Err(Boom));
        assert_eq!(err.unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_closure_runs_once() {
        let mut calls = 0;
        let _: Result<(), Boom> = run_job("count", || {
            calls += 1;
            Ok(())
        });
        assert_eq!(calls, 1);
    }
}
