// src/gui.rs
use anyhow::Result;
use chrono::Datelike;
use eframe::egui;
use egui::{Align, Color32, Layout, RichText, ScrollArea, Stroke, Ui, Vec2};
use log::{error, info, warn};
use std::path::PathBuf;

#[cfg(feature = "clipboard")]
use arboard::{Clipboard, ImageData};

use crate::controller::{AppController, AppStatus, DOWNLOAD_FILE_NAME};
use crate::intake::SlotKind;

const DEFAULT_WINDOW_WIDTH: f32 = 980.0;
const DEFAULT_WINDOW_HEIGHT: f32 = 820.0;
const CONTENT_MAX_WIDTH: f32 = 760.0;
const THUMBNAIL_SIZE: f32 = 64.0;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

const BACKGROUND: Color32 = Color32::from_rgb(250, 246, 240);
const CARD_FILL: Color32 = Color32::WHITE;
const CARD_BORDER: Color32 = Color32::from_rgb(232, 218, 200);
const BRAND_DARK: Color32 = Color32::from_rgb(67, 48, 36);
const BRAND_MUTED: Color32 = Color32::from_rgb(150, 120, 96);
const BRAND_LIGHT: Color32 = Color32::from_rgb(245, 234, 220);
const WARM: Color32 = Color32::from_rgb(222, 120, 80);
const ERROR_FILL: Color32 = Color32::from_rgb(254, 242, 242);
const ERROR_BORDER: Color32 = Color32::from_rgb(254, 202, 202);
const ERROR_TEXT: Color32 = Color32::from_rgb(185, 28, 28);

/// What the user asked a slot card to do this frame.
enum SlotAction {
    None,
    Pick,
    Remove,
}

pub struct AevoraApp {
    controller: AppController,
    notice: Option<String>,
    was_style_initialized: bool,
}

impl AevoraApp {
    pub fn new(controller: AppController) -> Self {
        Self {
            controller,
            notice: None,
            was_style_initialized: false,
        }
    }
}

impl eframe::App for AevoraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            let mut style = (*ctx.style()).clone();
            style.visuals = egui::Visuals::light();
            style.visuals.panel_fill = BACKGROUND;
            style.visuals.window_fill = BACKGROUND;
            style.visuals.widgets.inactive.bg_fill = BRAND_LIGHT;
            style.visuals.widgets.hovered.bg_fill = Color32::from_rgb(240, 224, 204);
            style.visuals.widgets.active.bg_fill = Color32::from_rgb(230, 210, 186);
            style.visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
            style.visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
            style.visuals.widgets.active.rounding = egui::Rounding::same(8.0);
            style.visuals.selection.bg_fill = WARM;
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional)
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(15.0, egui::FontFamily::Proportional)
            );
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(26.0, egui::FontFamily::Proportional)
            );
            ctx.set_style(style);
            self.was_style_initialized = true;
        }

        self.controller.poll();
        self.handle_dropped_files(ctx);

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(BACKGROUND).inner_margin(egui::Margin::symmetric(16.0, 20.0)))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(RichText::new("🕰️ Aevora 🫂").size(36.0).color(BRAND_DARK).strong());
                    ui.add_space(6.0);
                    ui.label(
                        RichText::new("A journey through time. Upload a childhood photo and a recent one to create a timeless embrace.")
                            .size(16.0)
                            .color(BRAND_MUTED),
                    );
                });
            });

        egui::TopBottomPanel::bottom("footer")
            .frame(egui::Frame::none().fill(BACKGROUND).inner_margin(egui::Margin::symmetric(16.0, 10.0)))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    let powered_by = self.controller.backend_name().unwrap_or("Gemini Nano Banana");
                    ui.label(
                        RichText::new(format!(
                            "© {} Aevora. Powered by {}.",
                            chrono::Local::now().year(),
                            powered_by
                        ))
                        .small()
                        .color(BRAND_MUTED),
                    );
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(CONTENT_MAX_WIDTH);

                    if let Some(message) = self.controller.error().map(str::to_string) {
                        draw_error_banner(ui, &message);
                        ui.add_space(16.0);
                    }

                    match self.controller.status() {
                        AppStatus::Processing => draw_loading_view(ui),
                        AppStatus::Success if self.controller.result().is_some() => {
                            self.draw_result_view(ui, ctx)
                        }
                        _ => self.draw_upload_view(ui, ctx),
                    }
                });
            });
        });
    }
}

impl AevoraApp {
    fn draw_upload_view(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        let mut actions = Vec::new();
        ui.columns(2, |columns| {
            for (column, kind) in columns.iter_mut().zip(SlotKind::ALL) {
                let action = self.draw_slot_card(column, ctx, kind);
                actions.push((kind, action));
            }
        });
        for (kind, action) in actions {
            match action {
                SlotAction::Pick => self.pick_image(kind),
                SlotAction::Remove => {
                    self.controller.remove_image(kind);
                }
                SlotAction::None => {}
            }
        }

        ui.add_space(24.0);
        let can_generate = self.controller.can_generate();
        let button = egui::Button::new(RichText::new("✨ Generate Hug").size(18.0).color(Color32::WHITE))
            .fill(if can_generate { WARM } else { Color32::from_rgb(209, 213, 219) })
            .rounding(24.0)
            .min_size(egui::vec2(220.0, 48.0));
        if ui.add_enabled(can_generate, button).clicked() {
            self.notice = None;
            self.controller.generate();
        }

        let both_filled = SlotKind::ALL.iter().all(|k| self.controller.slot(*k).is_filled());
        if !both_filled {
            ui.add_space(8.0);
            ui.label(RichText::new("Upload both photos to continue").small().color(Color32::GRAY));
        }
    }

    fn draw_slot_card(&mut self, ui: &mut Ui, ctx: &egui::Context, kind: SlotKind) -> SlotAction {
        let disabled = !self.controller.slots_editable();
        let mut action = SlotAction::None;

        egui::Frame::none()
            .fill(CARD_FILL)
            .rounding(16.0)
            .stroke(Stroke::new(1.0, CARD_BORDER))
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    egui::Frame::none()
                        .fill(BRAND_LIGHT)
                        .rounding(4.0)
                        .inner_margin(egui::Margin::symmetric(6.0, 2.0))
                        .show(ui, |ui| {
                            ui.label(RichText::new(kind.step()).small().strong().color(BRAND_DARK));
                        });
                    ui.label(RichText::new(kind.title()).size(18.0).color(BRAND_DARK));
                });
                ui.separator();
                ui.with_layout(Layout::top_down(Align::Min), |ui| {
                    ui.label(RichText::new(kind.label()).strong().color(Color32::DARK_GRAY));
                });
                ui.add_space(6.0);

                let width = ui.available_width();
                let height = width * 1.25;
                let slot = self.controller.slot_mut(kind);

                if slot.is_loading() {
                    ui.allocate_ui(egui::vec2(width, height), |ui| {
                        ui.centered_and_justified(|ui| {
                            ui.spinner();
                        });
                    });
                } else if let Some(image) = slot.image_mut() {
                    let aspect = image.preview().aspect_ratio();
                    let texture = image.preview_mut().texture(ctx, &format!("{:?}_preview", kind));
                    ui.vertical_centered(|ui| {
                        ui.image((texture.id(), fit_size(width, height, aspect)));
                    });
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(image.file_name()).small().color(BRAND_MUTED))
                            .on_hover_text(image.path().display().to_string());
                        if !disabled {
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui
                                    .button(RichText::new("✕").color(ERROR_TEXT))
                                    .on_hover_text("Remove image")
                                    .clicked()
                                {
                                    action = SlotAction::Remove;
                                }
                            });
                        }
                    });
                } else {
                    let button = egui::Button::new(
                        RichText::new(format!("⬆\n\nUpload Photo\n{}", kind.sub_label()))
                            .color(if disabled { Color32::GRAY } else { BRAND_DARK }),
                    )
                    .fill(if disabled { Color32::from_rgb(249, 250, 251) } else { CARD_FILL })
                    .stroke(Stroke::new(2.0, CARD_BORDER))
                    .rounding(12.0);
                    let response = ui.add_enabled(!disabled, |ui: &mut Ui| {
                        ui.add_sized([width, height], button)
                    });
                    if response.clicked() {
                        action = SlotAction::Pick;
                    }
                }
            });

        action
    }

    fn draw_result_view(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        let mut download = false;
        let mut copy = false;
        let mut reset = false;

        egui::Frame::none()
            .fill(CARD_FILL)
            .rounding(24.0)
            .stroke(Stroke::new(1.0, CARD_BORDER))
            .inner_margin(20.0)
            .show(ui, |ui| {
                if let Some(result) = self.controller.result_mut() {
                    let aspect = result.preview_mut().aspect_ratio();
                    let texture = result.preview_mut().texture(ctx, "result_preview");
                    let width = ui.available_width();
                    ui.vertical_centered(|ui| {
                        ui.image((texture.id(), fit_size(width, 600.0, aspect)));
                    });
                }
                ui.add_space(16.0);
                ui.vertical_centered(|ui| {
                    ui.heading(RichText::new("Memory Created").color(BRAND_DARK).strong());
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new("Your past and present have been beautifully reunited. We hope this image brings a smile to your face.")
                            .color(BRAND_MUTED),
                    );
                    ui.add_space(12.0);
                    ui.horizontal(|ui| {
                        let button_size = egui::vec2(170.0, 40.0);
                        if ui
                            .add_sized(button_size, egui::Button::new(RichText::new("💾 Download Image").color(Color32::WHITE))
                                .fill(BRAND_DARK)
                                .rounding(10.0))
                            .clicked()
                        {
                            download = true;
                        }
                        if cfg!(feature = "clipboard")
                            && ui
                                .add_sized(button_size, egui::Button::new("📋 Copy").fill(BRAND_LIGHT).rounding(10.0))
                                .clicked()
                        {
                            copy = true;
                        }
                        if ui
                            .add_sized(button_size, egui::Button::new("↺ Start Over")
                                .fill(CARD_FILL)
                                .stroke(Stroke::new(1.0, CARD_BORDER))
                                .rounding(10.0))
                            .clicked()
                        {
                            reset = true;
                        }
                    });
                    if let Some(notice) = &self.notice {
                        ui.add_space(6.0);
                        ui.label(RichText::new(notice).small().color(BRAND_MUTED));
                    }
                });
            });

        ui.add_space(20.0);
        ui.horizontal(|ui| {
            let row_width = THUMBNAIL_SIZE * 2.0 + 60.0;
            ui.add_space(((ui.available_width() - row_width) / 2.0).max(0.0));
            for (i, kind) in SlotKind::ALL.into_iter().enumerate() {
                if i > 0 {
                    ui.label(RichText::new("+").size(20.0).color(BRAND_MUTED));
                }
                if let Some(image) = self.controller.slot_mut(kind).image_mut() {
                    let aspect = image.preview().aspect_ratio();
                    let texture = image.preview_mut().texture(ctx, &format!("{:?}_preview", kind));
                    ui.vertical(|ui| {
                        ui.label(RichText::new(kind.caption()).small().color(BRAND_MUTED));
                        ui.image((texture.id(), fit_size(THUMBNAIL_SIZE, THUMBNAIL_SIZE, aspect)));
                    });
                }
            }
        });

        if download {
            self.download_result();
        }
        if copy {
            self.copy_result_to_clipboard();
        }
        if reset {
            self.notice = None;
            self.controller.reset();
        }
    }

    fn pick_image(&mut self, kind: SlotKind) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title(kind.label())
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.controller.select_image(kind, path);
        }
    }

    /// Dropped files fill the first empty slot.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        for path in dropped {
            let target = SlotKind::ALL.into_iter().find(|kind| {
                let slot = self.controller.slot(*kind);
                !slot.is_filled() && !slot.is_loading()
            });
            match target {
                Some(kind) => {
                    self.controller.select_image(kind, path);
                }
                None => warn!("Both slots are taken; ignoring dropped file {}", path.display()),
            }
        }
    }

    fn download_result(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(DOWNLOAD_FILE_NAME)
            .save_file()
        {
            self.notice = Some(match self.controller.save_result(&path) {
                Ok(()) => format!("Saved to {}", path.display()),
                Err(e) => {
                    error!("Failed to save image: {:#}", e);
                    format!("Could not save image: {:#}", e)
                }
            });
        }
    }

    fn copy_result_to_clipboard(&mut self) {
        #[cfg(feature = "clipboard")]
        {
            if let Some(result) = self.controller.result() {
                let rgba8 = result.image().to_rgba8();
                let img_data = ImageData {
                    width: rgba8.width() as usize,
                    height: rgba8.height() as usize,
                    bytes: rgba8.as_raw().into(),
                };
                let outcome = Clipboard::new().and_then(|mut clipboard| clipboard.set_image(img_data));
                self.notice = Some(match outcome {
                    Ok(()) => {
                        info!("Image copied to clipboard");
                        "Image copied to clipboard".to_string()
                    }
                    Err(e) => {
                        error!("Failed to copy image to clipboard: {}", e);
                        format!("Could not copy image: {}", e)
                    }
                });
            }
        }
        #[cfg(not(feature = "clipboard"))]
        {
            self.notice = Some("Clipboard feature not enabled in this build.".to_string());
            error!("Clipboard feature not enabled. Enable the 'clipboard' feature in Cargo.toml");
        }
    }
}

fn draw_error_banner(ui: &mut Ui, message: &str) {
    egui::Frame::none()
        .fill(ERROR_FILL)
        .stroke(Stroke::new(1.0, ERROR_BORDER))
        .rounding(8.0)
        .inner_margin(egui::Margin::symmetric(16.0, 12.0))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("⚠").color(ERROR_TEXT));
                ui.label(RichText::new(message).color(ERROR_TEXT));
            });
        });
}

fn draw_loading_view(ui: &mut Ui) {
    ui.add_space(32.0);
    egui::Frame::none()
        .fill(CARD_FILL)
        .rounding(16.0)
        .stroke(Stroke::new(1.0, CARD_BORDER))
        .inner_margin(48.0)
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.add(egui::Spinner::new().size(72.0).color(WARM));
                ui.add_space(16.0);
                ui.label(RichText::new("Weaving Memories").size(20.0).color(BRAND_DARK));
                ui.add_space(4.0);
                ui.label(
                    RichText::new("Our AI is gently connecting your past and present.\nThis might take a moment.")
                        .color(BRAND_MUTED),
                );
            });
        });
}

/// Largest size with the given aspect ratio that fits the box.
fn fit_size(max_width: f32, max_height: f32, aspect_ratio: f32) -> Vec2 {
    if aspect_ratio <= 0.0 {
        return Vec2::new(max_width, max_height);
    }
    let mut width = max_width;
    let mut height = width / aspect_ratio;
    if height > max_height {
        height = max_height;
        width = height * aspect_ratio;
    }
    Vec2::new(width, height)
}

pub fn run_gui(mut controller: AppController) -> Result<()> {
    info!("Aevora GUI starting up...");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)),
        min_window_size: Some(egui::vec2(640.0, 560.0)),
        drag_and_drop_support: true,
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "Aevora",
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            controller.set_repaint_callback(move || ctx.request_repaint());
            Box::new(AevoraApp::new(controller))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}
