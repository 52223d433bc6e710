#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod converter;
mod style;

use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("image_batch_converter=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 780.0])
            .with_min_inner_size([560.0, 480.0])
            .with_title("Image Batch Converter"),
        ..Default::default()
    };

    eframe::run_native(
        "Image Batch Converter",
        options,
        Box::new(|cc| Ok(Box::new(app::ConverterApp::new(cc)))),
    )
}
