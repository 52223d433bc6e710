//! Cancellable batch image conversion.
//!
//! A [`JobQueue`] holds the jobs of one batch. A [`ConversionRunner`] drains it
//! with a small worker pool, reporting each terminal transition to a
//! [`BatchObserver`] and stopping early when its [`CancelToken`] is set.

pub mod cancel;
pub mod error;
pub mod export;
pub mod format;
pub mod observer;
pub mod queue;
pub mod runner;
pub mod scan;

pub use cancel::CancelToken;
pub use error::ConversionError;
pub use format::TargetFormat;
pub use observer::{BatchObserver, observer_fn};
pub use queue::{BatchResult, ConversionJob, JobError, JobId, JobQueue, JobStatus, SharedQueue};
pub use runner::{ConversionRunner, RunnerOptions};
