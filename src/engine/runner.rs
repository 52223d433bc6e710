use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::{DynamicImage, ImageReader, Limits};
use parking_lot::Mutex;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::error::ConversionError;
use super::export::{self, DEFAULT_JPEG_QUALITY, ExportOptions};
use super::format::TargetFormat;
use super::observer::BatchObserver;
use super::queue::{BatchResult, ConversionJob, JobId, JobStatus, SharedQueue};

pub const MAX_WORKERS: usize = 8;

/// Decoder ceiling, in pixels. Allocation is limited to four bytes per pixel.
pub const DEFAULT_MAX_PIXELS: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    /// Where outputs go. `None` writes next to each source.
    pub output_dir: Option<PathBuf>,
    pub jpeg_quality: u8,
    /// Replace a derived output that already exists. The source itself is never replaced.
    pub overwrite_existing: bool,
    pub max_pixels: u64,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overwrite_existing: true,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Serialises terminal transitions so `completed` only ever grows by one
/// per callback, whatever the worker count.
struct Progress {
    completed: Mutex<usize>,
    total: usize,
}

impl Progress {
    fn finish(
        &self,
        queue: &SharedQueue,
        id: JobId,
        outcome: Result<PathBuf, ConversionError>,
        observer: &dyn BatchObserver,
    ) {
        let mut completed = self.completed.lock();
        let snapshot = {
            let mut queue = queue.lock();
            if queue.complete(id, outcome) {
                queue.get(id).cloned()
            } else {
                None
            }
        };
        if let Some(job) = snapshot {
            *completed += 1;
            observer.on_progress(&job, *completed, self.total);
        }
    }

    fn report(&self, job: &ConversionJob, observer: &dyn BatchObserver) {
        let mut completed = self.completed.lock();
        *completed += 1;
        observer.on_progress(job, *completed, self.total);
    }
}

/// Drains a job queue with a small pool of worker threads.
pub struct ConversionRunner {
    options: RunnerOptions,
}

impl ConversionRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Converts every Pending job in `queue`, blocking until the queue drains
    /// or `cancel` is set and the in-flight jobs have stopped.
    pub fn run(
        &self,
        queue: &SharedQueue,
        concurrency: usize,
        observer: &dyn BatchObserver,
        cancel: &CancelToken,
    ) -> BatchResult {
        let workers = concurrency.clamp(1, MAX_WORKERS);
        let progress = Progress {
            completed: Mutex::new(0),
            total: queue.lock().pending(),
        };

        info!(
            "Starting batch of {} job(s) with {} worker(s)",
            progress.total, workers
        );

        let collisions = self.find_collisions(queue.lock().jobs());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.work(queue, observer, cancel, &progress, &collisions));
            }
        });

        if cancel.is_cancelled() {
            let never_started: Vec<ConversionJob> = {
                let mut queue = queue.lock();
                let ids = queue.cancel_pending();
                ids.iter().filter_map(|id| queue.get(*id).cloned()).collect()
            };
            for job in &never_started {
                progress.report(job, observer);
            }
        }

        let result = queue.lock().batch_result();
        info!(
            "Batch finished: {} done, {} failed ({} skipped), {} cancelled",
            result.done, result.failed, result.skipped, result.cancelled
        );
        observer.on_done(&result);
        result
    }

    /// Runs the batch on a named background thread.
    pub fn spawn(
        self,
        queue: SharedQueue,
        concurrency: usize,
        observer: Arc<dyn BatchObserver>,
        cancel: CancelToken,
    ) -> io::Result<JoinHandle<BatchResult>> {
        thread::Builder::new()
            .name("conversion-runner".to_string())
            .spawn(move || self.run(&queue, concurrency, observer.as_ref(), &cancel))
    }

    /// Pending jobs whose output would land on another job's source, or on an
    /// output already claimed by an earlier job in the batch.
    fn find_collisions(&self, jobs: &[ConversionJob]) -> HashMap<JobId, PathBuf> {
        let sources: HashSet<&Path> = jobs.iter().map(|job| job.source_path.as_path()).collect();
        let mut claimed = HashSet::new();
        let mut collisions = HashMap::new();

        for job in jobs.iter().filter(|job| job.status == JobStatus::Pending) {
            let source = job.source_path.as_path();
            if TargetFormat::of_path(source) == Some(job.target_format) {
                continue;
            }
            let Some(output) =
                export::output_path_for(source, job.target_format, self.options.output_dir.as_deref())
            else {
                continue;
            };

            if sources.contains(output.as_path()) || !claimed.insert(output.clone()) {
                warn!(
                    "Job {} would overwrite {} from the same batch",
                    job.id,
                    output.display()
                );
                collisions.insert(job.id, output);
            }
        }
        collisions
    }

    fn work(
        &self,
        queue: &SharedQueue,
        observer: &dyn BatchObserver,
        cancel: &CancelToken,
        progress: &Progress,
        collisions: &HashMap<JobId, PathBuf>,
    ) {
        loop {
            if cancel.is_cancelled() {
                debug!("Worker stopping, batch cancelled");
                break;
            }
            let Some(job) = queue.lock().next() else {
                break;
            };

            debug!(
                "Converting {} to {}",
                job.source_path.display(),
                job.target_format
            );
            let outcome = match collisions.get(&job.id) {
                Some(output) => Err(ConversionError::OutputExists { path: output.clone() }),
                None => self.convert(&job, cancel),
            };
            match &outcome {
                Ok(output) => debug!("Job {} wrote {}", job.id, output.display()),
                Err(ConversionError::Cancelled) => info!("Job {} cancelled", job.id),
                Err(e) => warn!("Job {} failed: {}", job.id, e),
            }
            progress.finish(queue, job.id, outcome, observer);
        }
    }

    fn convert(
        &self,
        job: &ConversionJob,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ConversionError> {
        let source = job.source_path.as_path();
        let format = job.target_format;

        if TargetFormat::of_path(source) == Some(format) {
            return Err(ConversionError::AlreadyTargetFormat {
                path: source.to_path_buf(),
                format,
            });
        }

        let img = self.decode(source)?;
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let output = export::output_path_for(source, format, self.options.output_dir.as_deref())
            .ok_or_else(|| ConversionError::unreadable(source, "path has no file name"))?;
        if !self.options.overwrite_existing && output.exists() {
            return Err(ConversionError::OutputExists { path: output });
        }

        let temp = self.encode_to_temp(&img, format, &output)?;
        if cancel.is_cancelled() {
            // Dropping the temp file removes it.
            return Err(ConversionError::Cancelled);
        }
        self.persist(temp, output)
    }

    fn decode(&self, source: &Path) -> Result<DynamicImage, ConversionError> {
        let mut reader = ImageReader::open(source)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| ConversionError::unreadable(source, e))?;

        let mut limits = Limits::default();
        limits.max_alloc = Some(self.options.max_pixels.saturating_mul(4));
        reader.limits(limits);

        reader
            .decode()
            .map_err(|e| ConversionError::unreadable(source, e))
    }

    fn encode_to_temp(
        &self,
        img: &DynamicImage,
        format: TargetFormat,
        output: &Path,
    ) -> Result<NamedTempFile, ConversionError> {
        let dir = output.parent().unwrap_or(Path::new("."));
        if self.options.output_dir.is_some() {
            fs::create_dir_all(dir).map_err(|e| ConversionError::write_failure(dir, e))?;
        }

        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let prefix = format!(".{stem}.");
        let mut temp = Builder::new()
            .prefix(&prefix)
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| ConversionError::write_failure(output, e))?;

        let options = ExportOptions {
            jpeg_quality: self.options.jpeg_quality,
        };
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            export::export_image(img, format, &options, &mut writer)
                .map_err(|e| ConversionError::write_failure(output, e))?;
            writer
                .flush()
                .map_err(|e| ConversionError::write_failure(output, e))?;
        }

        // Temp files are created owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| ConversionError::write_failure(output, e))?;
        }

        Ok(temp)
    }

    fn persist(&self, temp: NamedTempFile, output: PathBuf) -> Result<PathBuf, ConversionError> {
        let persisted = if self.options.overwrite_existing {
            temp.persist(&output)
        } else {
            temp.persist_noclobber(&output)
        };

        match persisted {
            Ok(_) => Ok(output),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(ConversionError::OutputExists { path: output })
            }
            Err(e) => Err(ConversionError::write_failure(output, e.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::observer::observer_fn;
    use crate::engine::queue::JobQueue;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]))
            .save(path)
            .unwrap();
    }

    fn part_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "part"))
            .collect()
    }

    #[test]
    fn test_cancel_from_progress_callback_stops_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = JobQueue::new();
        for i in 0..4 {
            let path = dir.path().join(format!("img{i}.png"));
            write_png(&path, 3, 3);
            queue.push(path, TargetFormat::Bmp);
        }
        let queue = queue.shared();

        let cancel = CancelToken::new();
        let seen = Mutex::new(Vec::new());
        let observer = observer_fn(
            |job: &ConversionJob, completed, total| {
                assert_eq!(total, 4);
                seen.lock().push((job.status, completed));
                cancel.cancel();
            },
            |_: &BatchResult| {},
        );

        let result = ConversionRunner::new(RunnerOptions::default()).run(&queue, 1, &observer, &cancel);

        assert_eq!(result.done, 1);
        assert_eq!(result.cancelled, 3);
        let seen = seen.into_inner();
        assert_eq!(seen[0], (JobStatus::Done, 1));
        let counts: Vec<_> = seen.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![1usize, 2, 3, 4]);
        assert!(seen[1..].iter().all(|(s, _)| *s == JobStatus::Cancelled));
        assert!(queue.lock().is_drained());
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn test_worker_pool_reports_monotonic_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = JobQueue::new();
        for i in 0..12 {
            let path = dir.path().join(format!("img{i}.png"));
            write_png(&path, 4 + i, 2);
            queue.push(path, TargetFormat::Tiff);
        }
        let queue = queue.shared();

        let counts = Mutex::new(Vec::new());
        let done_calls = Mutex::new(0);
        let observer = observer_fn(
            |_: &ConversionJob, completed, _| counts.lock().push(completed),
            |_: &BatchResult| *done_calls.lock() += 1,
        );

        let result = ConversionRunner::new(RunnerOptions::default()).run(
            &queue,
            4,
            &observer,
            &CancelToken::new(),
        );

        assert_eq!(result.done, 12);
        assert_eq!(counts.into_inner(), (1..=12usize).collect::<Vec<_>>());
        assert_eq!(*done_calls.lock(), 1);
        for job in queue.lock().jobs() {
            assert_eq!(job.status, JobStatus::Done);
            assert!(job.output_path.as_ref().unwrap().exists());
        }
    }

    #[test]
    fn test_existing_output_is_kept_when_overwrite_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source, 5, 5);
        let existing = dir.path().join("photo.jpg");
        fs::write(&existing, b"keep me").unwrap();

        let mut queue = JobQueue::new();
        let id = queue.push(&source, TargetFormat::Jpg);
        let queue = queue.shared();

        let options = RunnerOptions {
            overwrite_existing: false,
            ..Default::default()
        };
        let observer = observer_fn(|_: &ConversionJob, _, _| {}, |_: &BatchResult| {});
        let result = ConversionRunner::new(options).run(&queue, 1, &observer, &CancelToken::new());

        assert_eq!(result.failed, 1);
        assert_eq!(
            queue.lock().get(id).unwrap().error,
            Some(ConversionError::OutputExists { path: existing.clone() })
        );
        assert_eq!(fs::read(&existing).unwrap(), b"keep me");
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source, 6, 4);
        let out_dir = dir.path().join("converted").join("webp");

        let mut queue = JobQueue::new();
        queue.push(&source, TargetFormat::Webp);
        let queue = queue.shared();

        let options = RunnerOptions {
            output_dir: Some(out_dir.clone()),
            ..Default::default()
        };
        let observer = observer_fn(|_: &ConversionJob, _, _| {}, |_: &BatchResult| {});
        let result = ConversionRunner::new(options).run(&queue, 1, &observer, &CancelToken::new());

        assert_eq!(result.done, 1);
        let decoded = image::open(out_dir.join("photo.webp")).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn test_spawn_returns_result_from_background_thread() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source, 2, 2);

        let mut queue = JobQueue::new();
        queue.push(&source, TargetFormat::Jpg);
        let queue = queue.shared();

        let observer: Arc<dyn BatchObserver> =
            Arc::new(observer_fn(|_: &ConversionJob, _, _| {}, |_: &BatchResult| {}));
        let handle = ConversionRunner::new(RunnerOptions::default())
            .spawn(queue.clone(), 1, observer, CancelToken::new())
            .unwrap();

        let result = handle.join().unwrap();
        assert_eq!(result.done, 1);
        assert!(dir.path().join("photo.jpg").exists());
    }

    #[test]
    fn test_options_are_kept() {
        let options = RunnerOptions {
            output_dir: Some(PathBuf::from("/exports")),
            jpeg_quality: 60,
            ..Default::default()
        };
        let runner = ConversionRunner::new(options.clone());
        assert_eq!(runner.options(), &options);
    }

    #[test]
    fn test_cancel_after_decode_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source, 8, 8);

        let mut queue = JobQueue::new();
        queue.push(&source, TargetFormat::Tiff);
        let job = queue.next().unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let runner = ConversionRunner::new(RunnerOptions::default());

        assert_eq!(runner.convert(&job, &cancel), Err(ConversionError::Cancelled));
        assert!(!dir.path().join("photo.tiff").exists());
        assert!(part_files(dir.path()).is_empty());
    }

    #[test]
    fn test_abandoned_temp_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("photo.tiff");
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(5, 5));

        let runner = ConversionRunner::new(RunnerOptions::default());
        let temp = runner.encode_to_temp(&img, TargetFormat::Tiff, &output).unwrap();
        assert_eq!(part_files(dir.path()).len(), 1);
        assert!(fs::metadata(temp.path()).unwrap().len() > 0);

        drop(temp);
        assert!(part_files(dir.path()).is_empty());
        assert!(!output.exists());
    }

    #[test]
    fn test_cancelled_job_is_recorded_and_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = JobQueue::new();
        queue.push(dir.path().join("a.png"), TargetFormat::Jpg);
        queue.push(dir.path().join("b.png"), TargetFormat::Jpg);
        let queue = queue.shared();
        let job = queue.lock().next().unwrap();

        let progress = Progress {
            completed: Mutex::new(0),
            total: 2,
        };
        let seen = Mutex::new(Vec::new());
        let observer = observer_fn(
            |job: &ConversionJob, completed, total| {
                seen.lock().push((job.id, job.status, completed, total))
            },
            |_: &BatchResult| {},
        );

        progress.finish(&queue, job.id, Err(ConversionError::Cancelled), &observer);
        progress.finish(&queue, job.id, Ok(dir.path().join("a.jpg")), &observer);

        assert_eq!(queue.lock().get(job.id).unwrap().status, JobStatus::Cancelled);
        assert_eq!(seen.into_inner(), vec![(job.id, JobStatus::Cancelled, 1usize, 2usize)]);
    }

    #[test]
    fn test_collisions_within_a_batch() {
        let mut queue = JobQueue::new();
        let keep = queue.push("/photos/a.jpg", TargetFormat::Jpg);
        let onto_source = queue.push("/photos/a.png", TargetFormat::Jpg);
        let first = queue.push("/photos/b.png", TargetFormat::Webp);
        let second = queue.push("/photos/b.bmp", TargetFormat::Webp);
        let fine = queue.push("/photos/c.png", TargetFormat::Webp);

        let runner = ConversionRunner::new(RunnerOptions::default());
        let collisions = runner.find_collisions(queue.jobs());

        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions.get(&onto_source), Some(&PathBuf::from("/photos/a.jpg")));
        assert_eq!(collisions.get(&second), Some(&PathBuf::from("/photos/b.webp")));
        for id in [keep, first, fine] {
            assert!(!collisions.contains_key(&id));
        }
    }
}
