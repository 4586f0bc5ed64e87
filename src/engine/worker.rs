use crate::catalog::JobUnit;
use crate::error::JobError;
use crate::process::{calculate_active_connections, JobOutput, PipelineConfig, TableSource};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    time::Instant,
};
use tracing::error;

/// Messages a worker sends back to the coordinator.
pub(crate) enum WorkerEvent {
    Started(usize, Instant),
    Finished(usize, Box<Result<JobOutput, JobError>>),
    Skipped(usize),
}

/// Run one job; errors and panics become a tagged `JobError`.
pub(crate) fn run_isolated(
    job: &JobUnit,
    source: &dyn TableSource,
    config: &PipelineConfig,
) -> Result<JobOutput, JobError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        calculate_active_connections(job, source, config)
    }));
    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            error!(source = %job.source, year = job.year, kind = e.kind(), "{}", e);
            Err(JobError::Pipeline(e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(source = %job.source, year = job.year, "job panicked: {}", message);
            Err(JobError::Panicked {
                dso: job.source,
                year: job.year,
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
