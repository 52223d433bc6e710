use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use image_batch_converter::engine::runner::MAX_WORKERS;
use image_batch_converter::engine::scan::{self, INPUT_EXTENSIONS};
use image_batch_converter::engine::{
    BatchObserver, BatchResult, CancelToken, ConversionJob, ConversionRunner, JobQueue, JobStatus,
    SharedQueue, TargetFormat,
};
use image_batch_converter::settings::AppSettings;

use crate::style::{self, ButtonKind, ColorPalette, PanelColors, ThemeMode, status_color};

enum RunnerEvent {
    Progress {
        job: ConversionJob,
        completed: usize,
        total: usize,
    },
    Done(BatchResult),
}

/// Forwards runner callbacks to the UI thread and wakes it up.
struct UiObserver {
    tx: Sender<RunnerEvent>,
    ctx: egui::Context,
}

impl BatchObserver for UiObserver {
    fn on_progress(&self, job: &ConversionJob, completed: usize, total: usize) {
        let _ = self.tx.send(RunnerEvent::Progress {
            job: job.clone(),
            completed,
            total,
        });
        self.ctx.request_repaint();
    }

    fn on_done(&self, result: &BatchResult) {
        let _ = self.tx.send(RunnerEvent::Done(result.clone()));
        self.ctx.request_repaint();
    }
}

#[derive(Debug, Clone)]
struct ImageFile {
    path: PathBuf,
    format: Option<String>,
    size_kb: Option<u64>,
}

impl ImageFile {
    fn new(path: PathBuf) -> Self {
        let format = path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_uppercase());

        let size_kb = std::fs::metadata(&path)
            .ok()
            .map(|m| m.len() / 1024);

        Self {
            path,
            format,
            size_kb,
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ConversionState {
    Idle,
    Converting,
    Cancelling,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct ConversionProgress {
    state: ConversionState,
    current: usize,
    total: usize,
    message: String,
}

impl Default for ConversionProgress {
    fn default() -> Self {
        Self {
            state: ConversionState::Idle,
            current: 0,
            total: 0,
            message: String::new(),
        }
    }
}

const PREVIEW_SIZE: u32 = 256;

/// Thumbnail of the list entry the user clicked last.
struct Preview {
    path: PathBuf,
    texture: Option<egui::TextureHandle>,
    message: Option<String>,
}

/// The batch currently owned by the panel. The UI only reads `queue` and
/// sets `cancel`; job state is written by the runner.
struct ActiveBatch {
    cancel: CancelToken,
    events: Receiver<RunnerEvent>,
    handle: Option<JoinHandle<BatchResult>>,
}

pub struct ImageConverter {
    images: Vec<ImageFile>,
    queue: Option<SharedQueue>,
    batch: Option<ActiveBatch>,
    preview: Option<Preview>,
    progress: ConversionProgress,
    status: String,
    show_advanced: bool,
    drag_hover: bool,
}

impl ImageConverter {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            queue: None,
            batch: None,
            preview: None,
            progress: ConversionProgress::default(),
            status: String::new(),
            show_advanced: false,
            drag_hover: false,
        }
    }

    fn is_converting(&self) -> bool {
        self.batch.is_some()
    }

    fn add_images(&mut self, paths: Vec<PathBuf>) {
        let report = scan::collect_images(paths);
        let mut added = 0;
        for path in report.accepted {
            if !self.images.iter().any(|img| img.path == path) {
                self.images.push(ImageFile::new(path));
                added += 1;
            }
        }
        if added > 0 {
            self.queue = None;
        }

        self.status = if report.skipped > 0 {
            format!("Added {} image(s), skipped {} invalid files.", added, report.skipped)
        } else {
            format!("Added {} image(s). Total: {}", added, self.images.len())
        };
    }

    fn remove_image(&mut self, index: usize) {
        if index < self.images.len() {
            let removed = self.images.remove(index);
            if self.preview.as_ref().is_some_and(|p| p.path == removed.path) {
                self.preview = None;
            }
            self.queue = None;
        }
    }

    fn clear_images(&mut self) {
        self.images.clear();
        self.queue = None;
        self.preview = None;
        self.status.clear();
    }

    fn select_image(&mut self, ctx: &egui::Context, index: usize) {
        let Some(image) = self.images.get(index) else {
            return;
        };
        let path = image.path.clone();

        self.preview = Some(match scan::load_thumbnail(&path, PREVIEW_SIZE) {
            Ok(thumb) => {
                let size = [thumb.width() as usize, thumb.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, thumb.as_raw());
                let texture = ctx.load_texture("conversion_preview", color_image, egui::TextureOptions::LINEAR);
                Preview {
                    path,
                    texture: Some(texture),
                    message: None,
                }
            }
            Err(e) => {
                warn!("Cannot preview {}: {}", path.display(), e);
                let message = if path.exists() {
                    format!("Cannot preview this file: {}", e)
                } else {
                    "File not found or moved.".to_string()
                };
                Preview {
                    path,
                    texture: None,
                    message: Some(message),
                }
            }
        });
    }

    fn start_conversion(&mut self, ctx: &egui::Context, settings: &AppSettings) {
        if self.images.is_empty() || self.is_converting() {
            return;
        }

        let mut queue = JobQueue::new();
        for image in &self.images {
            queue.push(image.path.clone(), settings.target_format);
        }
        let queue = queue.shared();
        let cancel = CancelToken::new();
        let (tx, rx) = channel();
        let observer: Arc<dyn BatchObserver> = Arc::new(UiObserver {
            tx,
            ctx: ctx.clone(),
        });

        let runner = ConversionRunner::new(settings.runner_options());
        let destination = match &runner.options().output_dir {
            Some(dir) => dir.display().to_string(),
            None => "source folders".to_string(),
        };
        info!(
            "Converting {} image(s) to {} into {}",
            self.images.len(),
            settings.target_format,
            destination
        );

        match runner.spawn(queue.clone(), settings.concurrency, observer, cancel.clone()) {
            Ok(handle) => {
                self.progress = ConversionProgress {
                    state: ConversionState::Converting,
                    current: 0,
                    total: self.images.len(),
                    message: "Starting conversion...".to_string(),
                };
                self.queue = Some(queue);
                self.batch = Some(ActiveBatch {
                    cancel,
                    events: rx,
                    handle: Some(handle),
                });
            }
            Err(e) => {
                error!("Failed to start conversion thread: {}", e);
                self.progress = ConversionProgress {
                    state: ConversionState::Failed,
                    message: format!("Failed to start conversion: {}", e),
                    ..Default::default()
                };
            }
        }
    }

    fn cancel_conversion(&mut self) {
        if let Some(batch) = &self.batch {
            batch.cancel.cancel();
            self.progress.state = ConversionState::Cancelling;
            self.progress.message = "Cancelling...".to_string();
        }
    }

    fn poll_events(&mut self) {
        let Some(batch) = &mut self.batch else {
            return;
        };

        let mut finished = None;
        while let Ok(event) = batch.events.try_recv() {
            match event {
                RunnerEvent::Progress { job, completed, total } => {
                    self.progress.current = completed;
                    self.progress.total = total;
                    if self.progress.state != ConversionState::Cancelling {
                        self.progress.message = describe(&job, completed, total);
                    }
                }
                RunnerEvent::Done(result) => finished = Some(result),
            }
        }

        if let Some(result) = finished {
            if let Some(handle) = batch.handle.take() {
                if handle.join().is_err() {
                    error!("Conversion thread panicked");
                }
            }
            self.progress.state = if result.done == 0 && result.failed > 0 && result.cancelled == 0 {
                ConversionState::Failed
            } else {
                ConversionState::Completed
            };
            self.progress.message = result.summary();
            self.batch = None;
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        self.drag_hover = ctx.input(|i| !i.raw.hovered_files.is_empty());

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw.dropped_files.iter().filter_map(|f| f.path.clone()).collect()
        });
        if !dropped.is_empty() && !self.is_converting() {
            self.add_images(dropped);
        }
    }

    fn pick_images(&mut self) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", INPUT_EXTENSIONS)
            .pick_files()
        {
            self.add_images(paths);
        }
    }

    fn pick_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.add_images(vec![dir]);
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui, theme: ThemeMode) {
        ui.vertical(|ui| {
            ui.add_space(12.0);

            let title_color = if matches!(theme, ThemeMode::Dark) {
                ColorPalette::ZINC_100
            } else {
                ColorPalette::ZINC_900
            };

            ui.label(
                egui::RichText::new("Image Converter")
                    .size(24.0)
                    .color(title_color)
            );

            ui.add_space(4.0);

            let subtitle_color = if matches!(theme, ThemeMode::Dark) {
                ColorPalette::ZINC_400
            } else {
                ColorPalette::ZINC_600
            };

            ui.label(
                egui::RichText::new("Convert batches of images between JPG, PNG, WebP, BMP and TIFF")
                    .size(13.0)
                    .color(subtitle_color)
            );

            ui.add_space(12.0);
        });
    }

    fn render_format_selector(&mut self, ui: &mut egui::Ui, theme: ThemeMode, settings: &mut AppSettings) -> bool {
        let PanelColors { fill: panel_bg, border: border_color, text: text_color, .. } = PanelColors::for_theme(theme);
        let mut changed = false;
        let enabled = !self.is_converting();

        egui::Frame::new()
            .fill(panel_bg)
            .stroke(egui::Stroke::new(1.0, border_color))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new("Target Format")
                        .size(14.0)
                        .color(text_color)
                );

                ui.add_space(8.0);

                ui.horizontal_wrapped(|ui| {
                    for format in TargetFormat::all() {
                        let is_selected = settings.target_format == *format;

                        let (bg_color, txt_color) = if is_selected {
                            (ColorPalette::BLUE_600, egui::Color32::WHITE)
                        } else if matches!(theme, ThemeMode::Dark) {
                            (ColorPalette::ZINC_700, ColorPalette::ZINC_300)
                        } else {
                            (ColorPalette::GRAY_200, ColorPalette::GRAY_800)
                        };

                        let button = egui::Button::new(
                            egui::RichText::new(format.as_str())
                                .size(13.0)
                                .color(txt_color)
                        )
                        .fill(bg_color)
                        .stroke(egui::Stroke::NONE)
                        .corner_radius(6.0)
                        .min_size(egui::vec2(70.0, 32.0));

                        if ui.add_enabled(enabled, button).clicked() && !is_selected {
                            settings.target_format = *format;
                            self.queue = None;
                            changed = true;
                        }
                    }
                });
            });

        changed
    }

    fn render_batch_settings(&mut self, ui: &mut egui::Ui, theme: ThemeMode, settings: &mut AppSettings) -> bool {
        let PanelColors { fill: panel_bg, border: border_color, text: text_color, .. } = PanelColors::for_theme(theme);
        let label_color = PanelColors::for_theme(theme).weak;
        let mut changed = false;
        let enabled = !self.is_converting();

        egui::Frame::new()
            .fill(panel_bg)
            .stroke(egui::Stroke::new(1.0, border_color))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Settings")
                            .size(14.0)
                            .color(text_color)
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let toggle_text = if self.show_advanced { "Hide" } else { "Show" };
                        if ui.button(toggle_text).clicked() {
                            self.show_advanced = !self.show_advanced;
                        }
                    });
                });

                if !self.show_advanced {
                    return;
                }

                ui.add_space(12.0);

                ui.add_enabled_ui(enabled, |ui| {
                    if settings.target_format == TargetFormat::Jpg {
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new("JPG Quality:").color(label_color));
                            changed |= ui
                                .add(egui::Slider::new(&mut settings.jpeg_quality, 1..=100).suffix("%"))
                                .changed();
                        });
                    }

                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new("Parallel workers:").color(label_color));
                        changed |= ui
                            .add(egui::Slider::new(&mut settings.concurrency, 1..=MAX_WORKERS))
                            .changed();
                    });

                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(8.0);

                    changed |= ui
                        .checkbox(
                            &mut settings.overwrite_existing,
                            egui::RichText::new("Overwrite existing converted files").color(label_color),
                        )
                        .changed();
                });
            });

        changed
    }

    fn render_output_directory(&mut self, ui: &mut egui::Ui, theme: ThemeMode, settings: &mut AppSettings) -> bool {
        let PanelColors { fill: panel_bg, border: border_color, text: text_color, .. } = PanelColors::for_theme(theme);
        let label_color = PanelColors::for_theme(theme).weak;
        let mut changed = false;
        let enabled = !self.is_converting();

        egui::Frame::new()
            .fill(panel_bg)
            .stroke(egui::Stroke::new(1.0, border_color))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new("Output Directory")
                        .size(14.0)
                        .color(text_color)
                );

                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    let dir_text = match &settings.output_directory {
                        Some(dir) => dir.to_string_lossy().to_string(),
                        None => "Same as source files".to_string(),
                    };

                    ui.label(egui::RichText::new(dir_text).color(label_color));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(enabled, egui::Button::new("Browse")).clicked() {
                            if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                                settings.output_directory = Some(dir);
                                changed = true;
                            }
                        }

                        if settings.output_directory.is_some()
                            && ui.add_enabled(enabled, egui::Button::new("Clear")).clicked()
                        {
                            settings.output_directory = None;
                            changed = true;
                        }
                    });
                });
            });

        changed
    }

    fn render_image_list(&mut self, ui: &mut egui::Ui, theme: ThemeMode) {
        let PanelColors { fill: panel_bg, border: border_color, text: text_color, .. } = PanelColors::for_theme(theme);
        let weak_color = ColorPalette::ZINC_500;
        let enabled = !self.is_converting();

        // Snapshot so the queue lock is not held while painting.
        let job_states: Option<Vec<(JobStatus, Option<String>)>> = self.queue.as_ref().map(|queue| {
            queue
                .lock()
                .jobs()
                .iter()
                .map(|job| (job.status, job.error.as_ref().map(|e| e.to_string())))
                .collect()
        });

        egui::Frame::new()
            .fill(panel_bg)
            .stroke(egui::Stroke::new(1.0, border_color))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("Images ({})", self.images.len()))
                            .size(14.0)
                            .color(text_color)
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if !self.images.is_empty()
                            && ui.add_enabled(enabled, egui::Button::new("Clear All")).clicked()
                        {
                            self.clear_images();
                        }
                        if ui.add_enabled(enabled, egui::Button::new("Add Folder")).clicked() {
                            self.pick_folder();
                        }
                        if ui.add_enabled(enabled, egui::Button::new("Add Images")).clicked() {
                            self.pick_images();
                        }
                    });
                });

                if !self.status.is_empty() {
                    ui.label(egui::RichText::new(&self.status).size(11.0).color(weak_color));
                }

                ui.add_space(8.0);
                ui.separator();
                ui.add_space(8.0);

                if self.images.is_empty() {
                    self.render_drop_zone(ui, theme);
                    return;
                }

                egui::ScrollArea::vertical()
                    .max_height(300.0)
                    .show(ui, |ui| {
                        let mut to_remove = None;
                        let mut to_select = None;

                        for (idx, image) in self.images.iter().enumerate() {
                            let item_bg = PanelColors::for_theme(theme).item_fill;
                            let is_selected = self.preview.as_ref().is_some_and(|p| p.path == image.path);
                            let item_border = if is_selected { ColorPalette::BLUE_500 } else { border_color };
                            let job_state = job_states.as_ref().and_then(|states| states.get(idx));

                            egui::Frame::new()
                                .fill(item_bg)
                                .stroke(egui::Stroke::new(1.0, item_border))
                                .corner_radius(6.0)
                                .inner_margin(12.0)
                                .show(ui, |ui| {
                                    ui.horizontal(|ui| {
                                        ui.vertical(|ui| {
                                            let name = ui.add(
                                                egui::Label::new(
                                                    egui::RichText::new(image.file_name())
                                                        .color(text_color)
                                                        .size(13.0)
                                                )
                                                .sense(egui::Sense::click())
                                            );
                                            if name.on_hover_text("Click to preview").clicked() {
                                                to_select = Some(idx);
                                            }

                                            let info = format!(
                                                "{} | {}",
                                                image.format.as_deref().unwrap_or("Unknown"),
                                                image.size_kb.map(|s| format!("{} KB", s)).unwrap_or_else(|| "Unknown size".to_string())
                                            );

                                            ui.label(
                                                egui::RichText::new(info)
                                                    .color(weak_color)
                                                    .size(11.0)
                                            );
                                        });

                                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                            if ui.add_enabled(enabled, egui::Button::new("Remove")).clicked() {
                                                to_remove = Some(idx);
                                            }

                                            if let Some((status, error)) = job_state {
                                                let label = ui.label(
                                                    egui::RichText::new(status.as_str())
                                                        .size(12.0)
                                                        .color(status_color(*status))
                                                );
                                                if let Some(error) = error {
                                                    label.on_hover_text(error.as_str());
                                                }
                                            }
                                        });
                                    });
                                });

                            ui.add_space(6.0);
                        }

                        if let Some(idx) = to_select {
                            let ctx = ui.ctx().clone();
                            self.select_image(&ctx, idx);
                        }
                        if let Some(idx) = to_remove {
                            self.remove_image(idx);
                        }
                    });
            });
    }

    fn render_drop_zone(&mut self, ui: &mut egui::Ui, theme: ThemeMode) {
        let drop_zone_bg = match (self.drag_hover, theme) {
            (true, ThemeMode::Dark) => ColorPalette::ZINC_700,
            (true, ThemeMode::Light) => ColorPalette::GRAY_200,
            (false, ThemeMode::Dark) => ColorPalette::ZINC_900,
            (false, ThemeMode::Light) => egui::Color32::WHITE,
        };

        let drop_zone_border = match (self.drag_hover, theme) {
            (true, _) => ColorPalette::BLUE_500,
            (false, ThemeMode::Dark) => ColorPalette::ZINC_600,
            (false, ThemeMode::Light) => ColorPalette::GRAY_400,
        };

        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), 150.0),
            egui::Sense::click(),
        );

        ui.painter().rect_filled(rect, 6.0, drop_zone_bg);
        ui.painter().rect_stroke(
            rect,
            6.0,
            egui::Stroke::new(2.0, drop_zone_border),
            egui::StrokeKind::Outside,
        );

        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Drop images or folders here, or click to browse",
            egui::FontId::proportional(14.0),
            ColorPalette::ZINC_500,
        );

        if response.clicked() && !self.is_converting() {
            self.pick_images();
        }
    }

    fn render_preview(&self, ui: &mut egui::Ui, theme: ThemeMode) {
        let Some(preview) = &self.preview else {
            return;
        };
        let colors = PanelColors::for_theme(theme);

        egui::Frame::new()
            .fill(colors.fill)
            .stroke(egui::Stroke::new(1.0, colors.border))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                let name = preview
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("Unknown");
                ui.label(
                    egui::RichText::new(format!("Preview: {}", name))
                        .size(14.0)
                        .color(colors.text)
                );

                ui.add_space(8.0);

                ui.vertical_centered(|ui| {
                    if let Some(texture) = &preview.texture {
                        ui.add(
                            egui::Image::new(texture)
                                .max_size(egui::vec2(PREVIEW_SIZE as f32, PREVIEW_SIZE as f32))
                                .corner_radius(4.0)
                        );
                    }
                    if let Some(message) = &preview.message {
                        ui.label(egui::RichText::new(message).color(ColorPalette::RED_500));
                    }
                });
            });
    }

    fn render_progress(&self, ui: &mut egui::Ui, theme: ThemeMode) {
        let progress = &self.progress;

        if progress.state == ConversionState::Idle {
            return;
        }

        let PanelColors { fill: panel_bg, border: border_color, text: text_color, .. } = PanelColors::for_theme(theme);

        egui::Frame::new()
            .fill(panel_bg)
            .stroke(egui::Stroke::new(1.0, border_color))
            .corner_radius(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.label(
                    egui::RichText::new("Conversion Progress")
                        .size(14.0)
                        .color(text_color)
                );

                ui.add_space(8.0);

                let progress_fraction = if progress.total > 0 {
                    progress.current as f32 / progress.total as f32
                } else {
                    0.0
                };

                let progress_bg = if matches!(theme, ThemeMode::Dark) {
                    ColorPalette::ZINC_700
                } else {
                    ColorPalette::GRAY_200
                };

                let progress_fill = match progress.state {
                    ConversionState::Converting => ColorPalette::BLUE_500,
                    ConversionState::Cancelling => ColorPalette::AMBER_500,
                    ConversionState::Completed => ColorPalette::GREEN_500,
                    ConversionState::Failed => ColorPalette::RED_500,
                    ConversionState::Idle => ColorPalette::ZINC_500,
                };

                let (rect, _) = ui.allocate_exact_size(
                    egui::vec2(ui.available_width(), 24.0),
                    egui::Sense::hover(),
                );

                ui.painter().rect_filled(rect, 4.0, progress_bg);

                let fill_rect = egui::Rect::from_min_size(
                    rect.min,
                    egui::vec2(rect.width() * progress_fraction, rect.height()),
                );
                ui.painter().rect_filled(fill_rect, 4.0, progress_fill);

                let progress_text = format!("{} / {}", progress.current, progress.total);
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    &progress_text,
                    egui::FontId::proportional(12.0),
                    egui::Color32::WHITE,
                );

                ui.add_space(8.0);

                ui.label(
                    egui::RichText::new(&progress.message)
                        .size(12.0)
                        .color(text_color)
                );
            });
    }

    fn render_action_buttons(&mut self, ui: &mut egui::Ui, theme: ThemeMode, settings: &AppSettings) {
        let is_converting = self.is_converting();

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let can_convert = !self.images.is_empty() && !is_converting;

            if style::action_button(ui, "Convert Images", ButtonKind::Primary, theme, can_convert).clicked() {
                self.start_conversion(ui.ctx(), settings);
            }

            if is_converting {
                let cancelling = self.progress.state == ConversionState::Cancelling;
                if style::action_button(ui, "Cancel", ButtonKind::Stop, theme, !cancelling).clicked() {
                    self.cancel_conversion();
                }
            }
        });
    }

    /// Draws the panel. Returns true when `settings` changed and should be saved.
    pub fn ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, settings: &mut AppSettings) -> bool {
        let theme = if ui.visuals().dark_mode { ThemeMode::Dark } else { ThemeMode::Light };
        let mut changed = false;

        self.poll_events();
        self.handle_dropped_files(ctx);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.add_space(8.0);

                self.render_header(ui, theme);

                ui.add_space(8.0);
                changed |= self.render_format_selector(ui, theme, settings);

                ui.add_space(12.0);
                changed |= self.render_batch_settings(ui, theme, settings);

                ui.add_space(12.0);
                changed |= self.render_output_directory(ui, theme, settings);

                ui.add_space(12.0);
                self.render_image_list(ui, theme);

                if self.preview.is_some() {
                    ui.add_space(12.0);
                    self.render_preview(ui, theme);
                }

                ui.add_space(12.0);
                self.render_progress(ui, theme);

                ui.add_space(12.0);
                self.render_action_buttons(ui, theme, settings);

                ui.add_space(16.0);
            });

        changed
    }
}

fn describe(job: &ConversionJob, completed: usize, total: usize) -> String {
    match (job.status, &job.error) {
        (JobStatus::Done, _) => format!("Converted {} ({}/{})", job.file_name(), completed, total),
        (JobStatus::Cancelled, _) => format!("Cancelled {} ({}/{})", job.file_name(), completed, total),
        (_, Some(error)) if error.is_skip() => {
            format!("Skipped {}: already {} ({}/{})", job.file_name(), job.target_format, completed, total)
        }
        (_, Some(error)) => format!("Failed {}: {} ({}/{})", job.file_name(), error, completed, total),
        (_, None) => format!("{} ({}/{})", job.file_name(), completed, total),
    }
}
