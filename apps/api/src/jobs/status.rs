//! Job record statuses.
//!
//! Both enums follow the same lifecycle: pending → processing → terminal.
//! `processing → processing` is allowed so that a message redelivered after a
//! worker crash can be picked up again. Nothing leaves a terminal state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

/// Status of an AI generation step (resume analysis, interview feedback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Processing | Completed | Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Status of vector indexing for an uploaded resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingStatus {
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl IndexingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexingStatus::Pending => "pending",
            IndexingStatus::Processing => "processing",
            IndexingStatus::Indexed => "indexed",
            IndexingStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IndexingStatus::Indexed | IndexingStatus::Failed)
    }

    pub fn can_transition_to(&self, next: IndexingStatus) -> bool {
        use IndexingStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Processing | Indexed | Failed)
        )
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IndexingStatus::Pending),
            "processing" => Ok(IndexingStatus::Processing),
            "indexed" => Ok(IndexingStatus::Indexed),
            "failed" => Ok(IndexingStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_forward_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Error));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn test_job_status_never_leaves_terminal() {
        for terminal in [JobStatus::Completed, JobStatus::Error] {
            assert!(terminal.is_terminal());
            for next in [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Completed,
                JobStatus::Error,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_job_status_cannot_skip_processing_or_go_back() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_indexing_status_lifecycle() {
        assert!(IndexingStatus::Pending.can_transition_to(IndexingStatus::Processing));
        assert!(IndexingStatus::Processing.can_transition_to(IndexingStatus::Indexed));
        assert!(!IndexingStatus::Indexed.can_transition_to(IndexingStatus::Failed));
        assert!(!IndexingStatus::Failed.can_transition_to(IndexingStatus::Processing));
    }

    #[test]
    fn test_status_strings_parse_back() {
        assert_eq!("error".parse::<JobStatus>().unwrap(), JobStatus::Error);
        assert_eq!(
            "indexed".parse::<IndexingStatus>().unwrap(),
            IndexingStatus::Indexed
        );
        assert!("done".parse::<JobStatus>().is_err());
        assert_eq!(
            serde_json::to_value(IndexingStatus::Failed).unwrap(),
            "failed"
        );
    }
}
