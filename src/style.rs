use eframe::egui;
use image_batch_converter::engine::JobStatus;
use image_batch_converter::settings::ThemePreference;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    /// Resolves the saved preference, following the OS theme for `System`.
    pub fn resolve(preference: ThemePreference, system: egui::Theme) -> Self {
        match preference {
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
            ThemePreference::System => match system {
                egui::Theme::Dark => ThemeMode::Dark,
                egui::Theme::Light => ThemeMode::Light,
            },
        }
    }
}

pub struct ColorPalette;

impl ColorPalette {
    pub const BLUE_400: egui::Color32 = egui::Color32::from_rgb(96, 165, 250);
    pub const BLUE_500: egui::Color32 = egui::Color32::from_rgb(59, 130, 246);
    pub const BLUE_600: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);

    pub const SLATE_100: egui::Color32 = egui::Color32::from_rgb(241, 245, 249);
    pub const SLATE_200: egui::Color32 = egui::Color32::from_rgb(226, 232, 240);
    pub const SLATE_300: egui::Color32 = egui::Color32::from_rgb(203, 213, 225);

    pub const GRAY_50: egui::Color32 = egui::Color32::from_rgb(249, 250, 251);
    pub const GRAY_100: egui::Color32 = egui::Color32::from_rgb(243, 244, 246);
    pub const GRAY_200: egui::Color32 = egui::Color32::from_rgb(229, 231, 235);
    pub const GRAY_300: egui::Color32 = egui::Color32::from_rgb(209, 213, 219);
    pub const GRAY_400: egui::Color32 = egui::Color32::from_rgb(156, 163, 175);
    pub const GRAY_500: egui::Color32 = egui::Color32::from_rgb(107, 114, 128);
    pub const GRAY_700: egui::Color32 = egui::Color32::from_rgb(55, 65, 81);
    pub const GRAY_800: egui::Color32 = egui::Color32::from_rgb(31, 41, 55);
    pub const GRAY_900: egui::Color32 = egui::Color32::from_rgb(17, 24, 39);

    pub const ZINC_100: egui::Color32 = egui::Color32::from_rgb(244, 244, 245);
    pub const ZINC_200: egui::Color32 = egui::Color32::from_rgb(228, 228, 231);
    pub const ZINC_300: egui::Color32 = egui::Color32::from_rgb(212, 212, 216);
    pub const ZINC_400: egui::Color32 = egui::Color32::from_rgb(161, 161, 170);
    pub const ZINC_500: egui::Color32 = egui::Color32::from_rgb(113, 113, 122);
    pub const ZINC_600: egui::Color32 = egui::Color32::from_rgb(82, 82, 91);
    pub const ZINC_700: egui::Color32 = egui::Color32::from_rgb(63, 63, 70);
    pub const ZINC_800: egui::Color32 = egui::Color32::from_rgb(39, 39, 42);
    pub const ZINC_900: egui::Color32 = egui::Color32::from_rgb(24, 24, 27);

    pub const GREEN_500: egui::Color32 = egui::Color32::from_rgb(34, 197, 94);

    pub const RED_500: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);

    pub const AMBER_500: egui::Color32 = egui::Color32::from_rgb(245, 158, 11);
}

/// Colours for the bordered panels the converter is built from.
#[derive(Debug, Clone, Copy)]
pub struct PanelColors {
    pub fill: egui::Color32,
    pub border: egui::Color32,
    pub text: egui::Color32,
    pub weak: egui::Color32,
    pub item_fill: egui::Color32,
}

impl PanelColors {
    pub fn for_theme(theme: ThemeMode) -> Self {
        match theme {
            ThemeMode::Dark => Self {
                fill: ColorPalette::ZINC_800,
                border: ColorPalette::ZINC_700,
                text: ColorPalette::ZINC_200,
                weak: ColorPalette::ZINC_400,
                item_fill: ColorPalette::ZINC_900,
            },
            ThemeMode::Light => Self {
                fill: ColorPalette::GRAY_50,
                border: ColorPalette::GRAY_300,
                text: ColorPalette::GRAY_800,
                weak: ColorPalette::ZINC_600,
                item_fill: egui::Color32::WHITE,
            },
        }
    }
}

pub fn status_color(status: JobStatus) -> egui::Color32 {
    match status {
        JobStatus::Pending => ColorPalette::ZINC_500,
        JobStatus::Running => ColorPalette::BLUE_500,
        JobStatus::Done => ColorPalette::GREEN_500,
        JobStatus::Failed => ColorPalette::RED_500,
        JobStatus::Cancelled => ColorPalette::AMBER_500,
    }
}

/// bg, weak bg, border and foreground for one widget state.
type Shade = (egui::Color32, egui::Color32, egui::Color32, egui::Color32);

struct ThemeColors {
    panel: egui::Color32,
    faint: egui::Color32,
    extreme: egui::Color32,
    noninteractive: Shade,
    inactive: Shade,
    hovered: Shade,
    active: Shade,
    selection: egui::Color32,
    accent: egui::Color32,
}

impl ThemeColors {
    fn for_theme(theme: ThemeMode) -> Self {
        match theme {
            ThemeMode::Dark => Self {
                panel: ColorPalette::ZINC_900,
                faint: ColorPalette::ZINC_800,
                extreme: egui::Color32::from_rgb(12, 12, 15),
                noninteractive: (ColorPalette::ZINC_800, ColorPalette::ZINC_900, ColorPalette::ZINC_700, ColorPalette::SLATE_300),
                inactive: (ColorPalette::ZINC_800, ColorPalette::ZINC_800, ColorPalette::ZINC_600, ColorPalette::SLATE_200),
                hovered: (ColorPalette::ZINC_700, ColorPalette::ZINC_700, ColorPalette::ZINC_500, ColorPalette::SLATE_100),
                active: (ColorPalette::ZINC_600, ColorPalette::ZINC_600, ColorPalette::ZINC_400, egui::Color32::WHITE),
                selection: egui::Color32::from_rgba_premultiplied(60, 120, 240, 100),
                accent: ColorPalette::BLUE_400,
            },
            ThemeMode::Light => Self {
                panel: ColorPalette::GRAY_100,
                faint: ColorPalette::GRAY_100,
                extreme: egui::Color32::WHITE,
                noninteractive: (egui::Color32::WHITE, ColorPalette::GRAY_50, ColorPalette::GRAY_300, ColorPalette::GRAY_700),
                inactive: (ColorPalette::GRAY_50, ColorPalette::GRAY_100, ColorPalette::GRAY_300, ColorPalette::GRAY_800),
                hovered: (ColorPalette::GRAY_100, ColorPalette::GRAY_200, ColorPalette::GRAY_400, ColorPalette::GRAY_900),
                active: (ColorPalette::GRAY_200, ColorPalette::GRAY_300, ColorPalette::GRAY_500, egui::Color32::BLACK),
                selection: egui::Color32::from_rgba_premultiplied(60, 120, 240, 80),
                accent: ColorPalette::BLUE_600,
            },
        }
    }
}

fn shade(widget: &mut egui::style::WidgetVisuals, (bg, weak, border, fg): Shade) {
    widget.bg_fill = bg;
    widget.weak_bg_fill = weak;
    widget.bg_stroke = egui::Stroke::new(1.0, border);
    widget.fg_stroke = egui::Stroke::new(1.0, fg);
    widget.corner_radius = egui::CornerRadius::same(4);
}

pub fn apply_theme(ctx: &egui::Context, theme: ThemeMode) {
    let colors = ThemeColors::for_theme(theme);
    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(10);

    let visuals = &mut style.visuals;
    visuals.dark_mode = matches!(theme, ThemeMode::Dark);
    visuals.panel_fill = colors.panel;
    visuals.window_fill = colors.panel;
    visuals.faint_bg_color = colors.faint;
    visuals.extreme_bg_color = colors.extreme;

    shade(&mut visuals.widgets.noninteractive, colors.noninteractive);
    shade(&mut visuals.widgets.inactive, colors.inactive);
    shade(&mut visuals.widgets.hovered, colors.hovered);
    shade(&mut visuals.widgets.active, colors.active);

    visuals.selection.bg_fill = colors.selection;
    visuals.selection.stroke = egui::Stroke::new(1.0, colors.accent);
    visuals.hyperlink_color = colors.accent;

    ctx.set_style(style);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonKind {
    /// Starts work. Blue fill.
    Primary,
    /// Stops work. Outlined, turns red on hover.
    Stop,
}

/// Large button for the run controls under the file list.
pub fn action_button(
    ui: &mut egui::Ui,
    text: &str,
    kind: ButtonKind,
    theme: ThemeMode,
    enabled: bool,
) -> egui::Response {
    let surface = PanelColors::for_theme(theme);
    let (fill, hover_fill, border, hover_border, text_color, min_width) = match kind {
        ButtonKind::Primary if enabled => (
            ColorPalette::BLUE_600,
            ColorPalette::BLUE_500,
            egui::Color32::TRANSPARENT,
            egui::Color32::TRANSPARENT,
            egui::Color32::WHITE,
            160.0,
        ),
        ButtonKind::Primary => (
            ColorPalette::ZINC_500,
            ColorPalette::ZINC_500,
            egui::Color32::TRANSPARENT,
            egui::Color32::TRANSPARENT,
            egui::Color32::WHITE,
            160.0,
        ),
        ButtonKind::Stop => (
            surface.item_fill,
            surface.fill,
            surface.border,
            ColorPalette::RED_500,
            surface.text,
            110.0,
        ),
    };

    ui.scope(|ui| {
        let widgets = &mut ui.style_mut().visuals.widgets;
        for (widget, bg, stroke) in [
            (&mut widgets.inactive, fill, border),
            (&mut widgets.hovered, hover_fill, hover_border),
            (&mut widgets.active, fill, hover_border),
        ] {
            widget.bg_fill = bg;
            widget.weak_bg_fill = bg;
            widget.bg_stroke = egui::Stroke::new(1.0, stroke);
            widget.fg_stroke = egui::Stroke::new(1.0, text_color);
        }

        let button = egui::Button::new(egui::RichText::new(text).size(15.0).color(text_color))
            .min_size(egui::vec2(min_width, 40.0));
        ui.add_enabled(enabled, button)
    })
    .inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_only_follows_system_for_system_preference() {
        assert_eq!(ThemeMode::resolve(ThemePreference::System, egui::Theme::Light), ThemeMode::Light);
        assert_eq!(ThemeMode::resolve(ThemePreference::System, egui::Theme::Dark), ThemeMode::Dark);
        assert_eq!(ThemeMode::resolve(ThemePreference::Dark, egui::Theme::Light), ThemeMode::Dark);
        assert_eq!(ThemeMode::resolve(ThemePreference::Light, egui::Theme::Dark), ThemeMode::Light);
    }

    #[test]
    fn test_apply_theme_switches_visuals() {
        let ctx = egui::Context::default();

        apply_theme(&ctx, ThemeMode::Dark);
        let style = ctx.style();
        assert!(style.visuals.dark_mode);
        assert_eq!(style.visuals.panel_fill, ColorPalette::ZINC_900);
        assert_eq!(style.visuals.widgets.inactive.fg_stroke.color, ColorPalette::SLATE_200);

        apply_theme(&ctx, ThemeMode::Light);
        let style = ctx.style();
        assert!(!style.visuals.dark_mode);
        assert_eq!(style.visuals.hyperlink_color, ColorPalette::BLUE_600);
    }

    #[test]
    fn test_every_status_has_its_own_colour() {
        let colours: Vec<_> = [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ]
        .into_iter()
        .map(status_color)
        .collect();
        for (i, a) in colours.iter().enumerate() {
            assert!(colours[i + 1..].iter().all(|b| b != a));
        }
    }
}
