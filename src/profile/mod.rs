// src/profile/mod.rs
//! Per-job stage timings and their cross-job summary.
mod summary;

pub use summary::{ProfileSummary, StageSummary};

use std::{collections::BTreeMap, time::Instant};

/// Key under which the wall-clock span of a whole job is stored.
pub const TOTAL_JOB_TIME: &str = "total_job_time";

/// Elapsed seconds per stage for one job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord {
    stages: BTreeMap<String, f64>,
}

impl ProfileRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, adding its elapsed time to `stage`. Time is recorded whether
    /// or not `f` returns an error.
    pub fn time<T>(&mut self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.add(stage, start.elapsed().as_secs_f64());
        out
    }

    /// Accumulate `seconds` under `stage`.
    pub fn add(&mut self, stage: &str, seconds: f64) {
        *self.stages.entry(stage.to_string()).or_insert(0.0) += seconds;
    }

    pub fn get(&self, stage: &str) -> Option<f64> {
        self.stages.get(stage).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.stages.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ProfileRecord {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut record = ProfileRecord::new();
        for (stage, seconds) in iter {
            record.add(stage, seconds);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn reentering_a_stage_accumulates() {
        let mut p = ProfileRecord::new();
        p.add("read_csv", 0.25);
        p.add("read_csv", 0.5);
        p.add("filter", 1.0);
        assert_eq!(p.get("read_csv"), Some(0.75));
        assert_eq!(p.get("filter"), Some(1.0));
        assert_eq!(p.get("missing"), None);
    }

    #[test]
    fn time_records_even_on_error() {
        let mut p = ProfileRecord::new();
        let r: Result<(), &str> = p.time("stage", || {
            thread::sleep(Duration::from_millis(5));
            Err("boom")
        });
        assert!(r.is_err());
        assert!(p.get("stage").unwrap() >= 0.005);
    }
}
