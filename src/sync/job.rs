//! Job and run status vocabularies, stored as lowercase strings.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Products,
    Stock,
    Orders,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Products, JobType::Stock, JobType::Orders];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Products => "products",
            JobType::Stock => "stock",
            JobType::Orders => "orders",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        JobType::ALL
            .into_iter()
            .find(|job_type| job_type.as_str() == normalized)
            .ok_or_else(|| SyncError::UnknownJobType(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed edges. A pending job may also go straight to failed when it
    /// is cancelled before it runs.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Pending)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Outcome of one sync run as recorded in the log table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncRunStatus {
    #[default]
    Running,
    Success,
    Partial,
    Failed,
}

impl SyncRunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncRunStatus::Running => "running",
            SyncRunStatus::Success => "success",
            SyncRunStatus::Partial => "partial",
            SyncRunStatus::Failed => "failed",
        }
    }

    /// From counts at the end of a run: any failure makes it partial.
    pub fn from_counts(failed: u32) -> Self {
        if failed == 0 {
            SyncRunStatus::Success
        } else {
            SyncRunStatus::Partial
        }
    }
}

impl fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ];
        for from in [JobStatus::Completed, JobStatus::Failed] {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn retry_edge_returns_to_pending() {
        assert!(JobStatus::Running.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn job_type_parsing() {
        assert_eq!("Stock".parse::<JobType>().unwrap(), JobType::Stock);
        assert!(matches!(
            "inventory".parse::<JobType>(),
            Err(SyncError::UnknownJobType(value)) if value == "inventory"
        ));
    }

    #[test]
    fn run_status_from_counts() {
        assert_eq!(SyncRunStatus::from_counts(0), SyncRunStatus::Success);
        assert_eq!(SyncRunStatus::from_counts(2), SyncRunStatus::Partial);
    }
}
