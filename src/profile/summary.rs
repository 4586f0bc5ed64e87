use super::ProfileRecord;
use std::{collections::HashMap, fmt};

#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: String,
    pub total: f64,
    pub average: f64,
}

/// Stage timings summed over all jobs, ordered by descending total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSummary {
    pub job_count: usize,
    pub stages: Vec<StageSummary>,
}

impl ProfileSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ProfileRecord>,
    {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        let mut job_count = 0usize;
        for record in records {
            job_count += 1;
            for (stage, seconds) in record.iter() {
                *totals.entry(stage).or_insert(0.0) += seconds;
            }
        }

        let mut stages: Vec<StageSummary> = totals
            .into_iter()
            .map(|(stage, total)| StageSummary {
                stage: stage.to_string(),
                total,
                average: if job_count > 0 {
                    total / job_count as f64
                } else {
                    0.0
                },
            })
            .collect();
        stages.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.stage.cmp(&b.stage))
        });

        Self { job_count, stages }
    }

    pub fn stage(&self, name: &str) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == name)
    }

    pub fn is_empty(&self) -> bool {
        self.job_count == 0
    }
}

impl fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        write!(f, "Profiling summary (seconds):")?;
        for s in &self.stages {
            write!(
                f,
                "\n{:>30}: total={:.4}s avg={:.4}s",
                s.stage, s.total, s.average
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_and_averages_across_jobs() {
        let a: ProfileRecord = [("read_csv", 1.0)].into_iter().collect();
        let b: ProfileRecord = [("read_csv", 3.0)].into_iter().collect();
        let summary = ProfileSummary::from_records([&a, &b]);
        let read = summary.stage("read_csv").unwrap();
        assert_eq!(summary.job_count, 2);
        assert_eq!(read.total, 4.0);
        assert_eq!(read.average, 2.0);
    }

    #[test]
    fn average_divides_by_all_jobs() {
        let a: ProfileRecord = [("read_csv", 2.0), ("total_job_time", 3.0)]
            .into_iter()
            .collect();
        let b: ProfileRecord = [("total_job_time", 5.0)].into_iter().collect();
        let summary = ProfileSummary::from_records([&a, &b]);
        assert_eq!(summary.stages[0].stage, "total_job_time");
        assert_eq!(summary.stages[0].total, 8.0);
        assert_eq!(summary.stage("read_csv").unwrap().average, 1.0);
    }

    #[test]
    fn report_lists_stages_by_descending_total() {
        let a: ProfileRecord = [("read_csv", 1.0), ("map_columns_initial", 0.5)]
            .into_iter()
            .collect();
        let text = ProfileSummary::from_records([&a]).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "Profiling summary (seconds):");
        assert_eq!(
            lines[2],
            format!("{:>30}: total=1.0000s avg=1.0000s", "read_csv")
        );
        assert!(lines[3].trim_start().starts_with("map_columns_initial"));
    }

    #[test]
    fn empty_summary_renders_nothing() {
        let summary = ProfileSummary::from_records(std::iter::empty());
        assert!(summary.stages.is_empty());
        assert_eq!(summary.to_string(), "");
    }
}
