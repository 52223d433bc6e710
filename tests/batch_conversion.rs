use std::fs;
use std::path::{Path, PathBuf};

use image_batch_converter::engine::{
    BatchResult, CancelToken, ConversionError, ConversionJob, ConversionRunner, JobError,
    JobQueue, JobStatus, RunnerOptions, SharedQueue, TargetFormat, observer_fn,
};
use parking_lot::Mutex;

fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 128]))
        .save(path)
        .unwrap();
}

fn no_part_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .all(|e| e.path().extension().is_none_or(|ext| ext != "part"))
}

/// Runs the batch on the calling thread and records every progress event.
fn run_batch(
    queue: &SharedQueue,
    options: RunnerOptions,
    concurrency: usize,
    cancel: &CancelToken,
) -> (BatchResult, Vec<(JobStatus, usize, usize)>) {
    let events = Mutex::new(Vec::new());
    let observer = observer_fn(
        |job: &ConversionJob, completed, total| events.lock().push((job.status, completed, total)),
        |_: &BatchResult| {},
    );
    let result = ConversionRunner::new(options).run(queue, concurrency, &observer, cancel);
    (result, events.into_inner())
}

#[test]
fn converts_to_every_target_format() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sample.png");
    write_png(&source, 7, 5);

    let mut queue = JobQueue::new();
    for format in TargetFormat::all() {
        if *format != TargetFormat::Png {
            queue.push(&source, *format);
        }
    }
    let queue = queue.shared();

    let (result, _) = run_batch(&queue, RunnerOptions::default(), 2, &CancelToken::new());
    assert_eq!(result.done, 4);
    assert!(result.errors.is_empty());

    for job in queue.lock().jobs() {
        let output: &PathBuf = job.output_path.as_ref().unwrap();
        assert_eq!(output.parent(), Some(dir.path()));
        assert_eq!(
            output.extension().and_then(|e| e.to_str()),
            Some(job.target_format.extension())
        );
        let decoded = image::open(output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
    }
    assert!(no_part_files(dir.path()));
}

#[test]
fn cancel_before_start_converts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = JobQueue::new();
    for i in 0..3 {
        let path = dir.path().join(format!("img{i}.png"));
        write_png(&path, 2, 2);
        queue.push(path, TargetFormat::Jpg);
    }
    let queue = queue.shared();

    let cancel = CancelToken::new();
    cancel.cancel();
    let (result, events) = run_batch(&queue, RunnerOptions::default(), 2, &cancel);

    assert_eq!(result.done, 0);
    assert_eq!(result.cancelled, 3);
    assert_eq!(result.summary(), "Conversion canceled. 0 of 3 files converted.");
    assert_eq!(
        events,
        vec![
            (JobStatus::Cancelled, 1, 3),
            (JobStatus::Cancelled, 2, 3),
            (JobStatus::Cancelled, 3, 3),
        ]
    );
    for i in 0..3 {
        assert!(!dir.path().join(format!("img{i}.jpg")).exists());
    }
}

#[test]
fn unreadable_source_fails_and_batch_continues() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.png");
    fs::write(&broken, b"definitely not a png").unwrap();
    let good = dir.path().join("good.png");
    write_png(&good, 3, 3);

    let mut queue = JobQueue::new();
    let broken_id = queue.push(&broken, TargetFormat::Bmp);
    let good_id = queue.push(&good, TargetFormat::Bmp);
    let queue = queue.shared();

    let (result, _) = run_batch(&queue, RunnerOptions::default(), 1, &CancelToken::new());

    assert_eq!(result.done, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    let failure: &JobError = &result.errors[0];
    assert_eq!(failure.id, broken_id);
    assert_eq!(failure.source_path, broken);
    assert!(matches!(failure.error, ConversionError::UnreadableSource { .. }));

    let queue = queue.lock();
    assert_eq!(queue.get(good_id).unwrap().status, JobStatus::Done);
    assert!(!dir.path().join("broken.bmp").exists());
    assert!(dir.path().join("good.bmp").exists());
    assert!(no_part_files(dir.path()));
}

#[test]
fn same_format_source_is_skipped_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.jpg");
    image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))
        .save(&source)
        .unwrap();
    let before = fs::read(&source).unwrap();

    let mut queue = JobQueue::new();
    let id = queue.push(&source, TargetFormat::Jpg);
    let queue = queue.shared();

    let (result, _) = run_batch(&queue, RunnerOptions::default(), 1, &CancelToken::new());

    assert_eq!(result.done, 0);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 1);
    let job = queue.lock().get(id).cloned().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_ref().is_some_and(|e| e.is_skip()));
    assert!(job.output_path.is_none());
    assert_eq!(fs::read(&source).unwrap(), before);
}

#[test]
fn sequential_batch_reports_each_job_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = JobQueue::new();
    for i in 0..5 {
        let path = dir.path().join(format!("img{i}.png"));
        write_png(&path, 3, 2);
        queue.push(path, TargetFormat::Tiff);
    }
    let queue = queue.shared();

    let (result, events) = run_batch(&queue, RunnerOptions::default(), 1, &CancelToken::new());

    assert_eq!(result.done, 5);
    assert_eq!(result.summary(), "All conversions completed successfully.");
    let completed: Vec<usize> = events.iter().map(|(_, c, _)| *c).collect();
    assert_eq!(completed, (1..=5usize).collect::<Vec<_>>());
    assert!(events.iter().all(|(s, _, t)| *s == JobStatus::Done && *t == 5));
    assert!(queue.lock().is_drained());
}

#[test]
fn add_rejects_unsupported_targets() {
    let mut queue = JobQueue::new();
    for target in ["gif", "pdf", "ico", ""] {
        assert_eq!(
            queue.add("/tmp/a.png", target),
            Err(ConversionError::InvalidFormat(target.to_string()))
        );
    }
    assert!(queue.is_empty());

    let id = queue.add("/tmp/a.png", "JPEG").unwrap();
    assert_eq!(queue.get(id).unwrap().target_format, TargetFormat::Jpg);
}

#[test]
fn batch_never_overwrites_its_own_files() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("a.jpg");
    image::RgbImage::from_pixel(9, 9, image::Rgb([1, 2, 3]))
        .save(&original)
        .unwrap();
    let original_bytes = fs::read(&original).unwrap();
    write_png(&dir.path().join("a.png"), 4, 4);
    write_png(&dir.path().join("b.png"), 5, 5);
    image::RgbImage::from_pixel(6, 6, image::Rgb([9, 9, 9]))
        .save(dir.path().join("b.bmp"))
        .unwrap();

    let mut queue = JobQueue::new();
    queue.push(&original, TargetFormat::Jpg);
    let onto_source = queue.push(dir.path().join("a.png"), TargetFormat::Jpg);
    let first = queue.push(dir.path().join("b.png"), TargetFormat::Webp);
    let second = queue.push(dir.path().join("b.bmp"), TargetFormat::Webp);
    let queue = queue.shared();

    let (result, events) = run_batch(&queue, RunnerOptions::default(), 2, &CancelToken::new());

    assert_eq!(result.done, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.failed, 3);
    assert_eq!(events.len(), 4);
    assert_eq!(fs::read(&original).unwrap(), original_bytes);

    let queue = queue.lock();
    assert_eq!(
        queue.get(onto_source).unwrap().error,
        Some(ConversionError::OutputExists { path: original.clone() })
    );
    assert_eq!(queue.get(first).unwrap().status, JobStatus::Done);
    assert_eq!(
        queue.get(second).unwrap().error,
        Some(ConversionError::OutputExists { path: dir.path().join("b.webp") })
    );
    let webp = image::open(dir.path().join("b.webp")).unwrap();
    assert_eq!((webp.width(), webp.height()), (5, 5));
    assert!(no_part_files(dir.path()));
}
