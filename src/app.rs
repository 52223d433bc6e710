use eframe::egui;
use image_batch_converter::settings::{AppSettings, ThemePreference};

use crate::converter::ImageConverter;
use crate::style::{self, ThemeMode};

pub struct ConverterApp {
    converter: ImageConverter,
    settings: AppSettings,
    theme_mode: ThemeMode,
}

impl ConverterApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        let theme_mode = ThemeMode::resolve(settings.theme_preference, cc.egui_ctx.theme());
        style::apply_theme(&cc.egui_ctx, theme_mode);

        Self {
            converter: ImageConverter::new(),
            settings,
            theme_mode,
        }
    }

    fn set_theme(&mut self, ctx: &egui::Context, preference: ThemePreference) {
        self.settings.theme_preference = preference;
        self.theme_mode = ThemeMode::resolve(preference, ctx.theme());
        style::apply_theme(ctx, self.theme_mode);
        self.settings.save();
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("View", |ui| {
                    ui.label("Theme:");
                    for (preference, label) in [
                        (ThemePreference::System, "System"),
                        (ThemePreference::Light, "Light"),
                        (ThemePreference::Dark, "Dark"),
                    ] {
                        let selected = self.settings.theme_preference == preference;
                        if ui.selectable_label(selected, label).clicked() {
                            self.set_theme(ctx, preference);
                            ui.close();
                        }
                    }
                });
            });
            ui.add_space(4.0);
        });
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if matches!(self.settings.theme_preference, ThemePreference::System) {
            let system_theme = ThemeMode::resolve(ThemePreference::System, ctx.theme());
            if self.theme_mode != system_theme {
                self.theme_mode = system_theme;
                style::apply_theme(ctx, self.theme_mode);
            }
        }

        self.top_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.converter.ui(ui, ctx, &mut self.settings) {
                self.settings.save();
            }
        });
    }
}
