use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::error::ConversionError;
use super::format::TargetFormat;

/// Queue shared between the runner's workers and whoever renders it.
pub type SharedQueue = Arc<Mutex<JobQueue>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(usize);

impl JobId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Done => "Done",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub id: JobId,
    pub source_path: PathBuf,
    pub target_format: TargetFormat,
    pub status: JobStatus,
    pub error: Option<ConversionError>,
    pub output_path: Option<PathBuf>,
}

impl ConversionJob {
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobError {
    pub id: JobId,
    pub source_path: PathBuf,
    pub error: ConversionError,
}

/// Aggregate outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Failed jobs that were skipped because the source already had the target format.
    pub skipped: usize,
    pub errors: Vec<JobError>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.done + self.failed + self.cancelled
    }

    pub fn summary(&self) -> String {
        let total = self.total();
        if self.cancelled > 0 {
            format!("Conversion canceled. {} of {} files converted.", self.done, total)
        } else if self.done == total {
            "All conversions completed successfully.".to_string()
        } else if self.done > 0 {
            format!(
                "Conversion finished. Successfully converted {} of {} files.",
                self.done, total
            )
        } else {
            "Conversion failed for all files. Check file integrity or permissions.".to_string()
        }
    }
}

/// Ordered jobs of one batch.
///
/// Jobs are handed out in insertion order and only ever move forward:
/// Pending -> Running -> {Done, Failed, Cancelled}, or Pending -> Cancelled
/// when the batch is stopped before they start.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<ConversionJob>,
    cursor: usize,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedQueue {
        Arc::new(Mutex::new(self))
    }

    /// Appends a Pending job, parsing `target_format` as an extension or format name.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        target_format: &str,
    ) -> Result<JobId, ConversionError> {
        let format = target_format.parse::<TargetFormat>()?;
        Ok(self.push(path, format))
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, target_format: TargetFormat) -> JobId {
        let id = JobId(self.jobs.len());
        self.jobs.push(ConversionJob {
            id,
            source_path: path.into(),
            target_format,
            status: JobStatus::Pending,
            error: None,
            output_path: None,
        });
        id
    }

    /// Marks the next Pending job Running and returns a snapshot of it.
    pub fn next(&mut self) -> Option<ConversionJob> {
        while let Some(job) = self.jobs.get_mut(self.cursor) {
            self.cursor += 1;
            if job.status == JobStatus::Pending {
                job.status = JobStatus::Running;
                return Some(job.clone());
            }
        }
        None
    }

    /// Moves a Running job to its terminal status. Returns false and leaves the
    /// job untouched if it is unknown or not Running.
    pub fn complete(&mut self, id: JobId, outcome: Result<PathBuf, ConversionError>) -> bool {
        let Some(job) = self.jobs.get_mut(id.0) else {
            warn!("complete() for unknown job {}", id);
            return false;
        };
        if job.status != JobStatus::Running {
            warn!("complete() for job {} in state {:?}", id, job.status);
            return false;
        }

        match outcome {
            Ok(output) => {
                job.status = JobStatus::Done;
                job.output_path = Some(output);
            }
            Err(ConversionError::Cancelled) => {
                job.status = JobStatus::Cancelled;
                job.error = Some(ConversionError::Cancelled);
            }
            Err(err) => {
                job.status = JobStatus::Failed;
                job.error = Some(err);
            }
        }
        true
    }

    /// Cancels every job that has not been started yet.
    pub fn cancel_pending(&mut self) -> Vec<JobId> {
        let mut cancelled = Vec::new();
        for job in self.jobs.iter_mut().filter(|j| j.status == JobStatus::Pending) {
            job.status = JobStatus::Cancelled;
            job.error = Some(ConversionError::Cancelled);
            cancelled.push(job.id);
        }
        cancelled
    }

    pub fn get(&self, id: JobId) -> Option<&ConversionJob> {
        self.jobs.get(id.0)
    }

    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.count(JobStatus::Pending)
    }

    pub fn is_drained(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }

    /// Tallies terminal jobs. Jobs still Pending or Running are not counted.
    pub fn batch_result(&self) -> BatchResult {
        let mut result = BatchResult::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Done => result.done += 1,
                JobStatus::Failed => result.failed += 1,
                JobStatus::Cancelled => result.cancelled += 1,
                JobStatus::Pending | JobStatus::Running => continue,
            }
            if let Some(error) = &job.error {
                if error.is_skip() {
                    result.skipped += 1;
                }
                result.errors.push(JobError {
                    id: job.id,
                    source_path: job.source_path.clone(),
                    error: error.clone(),
                });
            }
        }
        result
    }
}
