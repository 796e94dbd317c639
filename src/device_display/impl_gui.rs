use crate::config::OverlayStyle;
use crate::device_display::interface::{DeviceDisplay, DisplayFrame, DisplayInput, MediaView};
use crate::overlay::impl_egui::SurfaceEgui;
use crate::overlay::renderer::OverlayRenderer;
use crate::picture::Picture;
use eframe::egui;
use std::error::Error;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct DisplayWindow {
    frame: Arc<Mutex<DisplayFrame>>,
    context: Arc<Mutex<Option<egui::Context>>>,
    inputs: Sender<DisplayInput>,
    renderer: OverlayRenderer,
    texture: Option<(u64, egui::TextureHandle)>,
    path: String,
    seek_seconds: f64,
    question: String,
}

impl DisplayWindow {
    fn send(&self, input: DisplayInput) {
        let _ = self.inputs.send(input);
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("File");
            ui.text_edit_singleline(&mut self.path);

            let path = self.path.trim().to_string();
            if ui.button("Load image").clicked() && !path.is_empty() {
                self.send(DisplayInput::LoadImage(path.clone().into()));
            }
            if ui.button("Load video").clicked() && !path.is_empty() {
                self.send(DisplayInput::LoadVideo(path.into()));
            }

            ui.separator();
            if ui.button("Start webcam").clicked() {
                self.send(DisplayInput::StartLiveStream);
            }
            if ui.button("Stop webcam").clicked() {
                self.send(DisplayInput::StopLiveStream);
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Play").clicked() {
                self.send(DisplayInput::Play);
            }
            if ui.button("Pause").clicked() {
                self.send(DisplayInput::Pause);
            }
            ui.add(
                egui::DragValue::new(&mut self.seek_seconds)
                    .clamp_range(0.0..=f64::MAX)
                    .speed(0.1)
                    .suffix(" s"),
            );
            if ui.button("Seek").clicked() {
                self.send(DisplayInput::Seek(self.seek_seconds));
            }

            ui.separator();
            if ui.button("Heal").clicked() {
                self.send(DisplayInput::Heal);
            }
            if ui.button("Falcon status").clicked() {
                self.send(DisplayInput::RefreshFalconStatus);
            }
        });
    }

    fn chat(&mut self, ui: &mut egui::Ui, frame: &DisplayFrame) {
        ui.horizontal(|ui| {
            let field = ui.text_edit_singleline(&mut self.question);
            let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if (ui.button("Ask").clicked() || submitted) && !self.question.trim().is_empty() {
                let question = std::mem::take(&mut self.question);
                self.send(DisplayInput::Ask(question));
            }
        });
        egui::ScrollArea::vertical()
            .id_source("chat")
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &frame.chat {
                    ui.label(line.as_str());
                }
            });
    }

    fn texture(&mut self, ctx: &egui::Context, picture: &Picture) -> egui::TextureId {
        match &self.texture {
            Some((id, texture)) if *id == picture.id => texture.id(),
            _ => {
                let size = [
                    picture.pixels.width() as usize,
                    picture.pixels.height() as usize,
                ];
                let image = egui::ColorImage::from_rgba_unmultiplied(size, picture.pixels.as_raw());
                let texture = ctx.load_texture("media", image, egui::TextureOptions::LINEAR);
                let id = texture.id();
                self.texture = Some((picture.id, texture));
                id
            }
        }
    }

    fn media(&mut self, ui: &mut egui::Ui, media: &MediaView) {
        let available = ui.available_size();
        let aspect = if media.intrinsic.width > 0.0 && media.intrinsic.height > 0.0 {
            media.intrinsic.width / media.intrinsic.height
        } else {
            16.0 / 9.0
        };

        let mut size = egui::vec2(available.x, available.x / aspect);
        if size.y > available.y {
            size = egui::vec2(available.y * aspect, available.y);
        }

        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());

        match &media.picture {
            Some(picture) => {
                let texture = self.texture(ui.ctx(), picture);
                ui.painter().image(
                    texture,
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                ui.painter()
                    .rect_filled(rect, 0.0, egui::Color32::from_gray(24));
            }
        }

        let mut surface = SurfaceEgui::new(ui.painter_at(rect), rect);
        self.renderer
            .draw(&mut surface, &media.detections, media.intrinsic);
        surface.finish();
    }
}

impl eframe::App for DisplayWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let frame = match self.frame.lock() {
            Ok(frame) => frame.clone(),
            Err(_) => return,
        };

        if frame.exiting {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        egui::SidePanel::right("status")
            .min_width(260.0)
            .show(ctx, |ui| {
                ui.heading(frame.source.as_str());
                ui.label(frame.health.as_str());
                ui.separator();
                for line in &frame.metrics {
                    ui.label(line.as_str());
                }
                ui.separator();
                ui.label(frame.healing.as_str());
                for line in &frame.falcon {
                    ui.label(line.as_str());
                }
                for notice in &frame.notices {
                    ui.colored_label(egui::Color32::from_rgb(0xFC, 0x3D, 0x21), notice.as_str());
                }
                ui.separator();
                egui::ScrollArea::vertical()
                    .id_source("log")
                    .max_height(160.0)
                    .show(ui, |ui| {
                        for line in &frame.log {
                            ui.monospace(line.as_str());
                        }
                    });
                ui.separator();
                ui.label("Safety assistant");
                self.chat(ui, &frame);
            });

        egui::CentralPanel::default().show(ctx, |ui| match &frame.media {
            Some(media) => self.media(ui, media),
            None => {
                ui.centered_and_justified(|ui| ui.label("No media loaded"));
            }
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// egui dashboard. The window must run on the main thread with
/// [`run_window`]; the session pushes frames through [`DeviceDisplay::show`].
pub struct DeviceDisplayGui {
    frame: Arc<Mutex<DisplayFrame>>,
    context: Arc<Mutex<Option<egui::Context>>>,
    sender: Sender<DisplayInput>,
    receiver: Mutex<Option<Receiver<DisplayInput>>>,
}

impl DeviceDisplayGui {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            frame: Arc::new(Mutex::new(DisplayFrame::default())),
            context: Arc::new(Mutex::new(None)),
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    pub fn window(&self, style: OverlayStyle) -> DisplayWindow {
        DisplayWindow {
            frame: self.frame.clone(),
            context: self.context.clone(),
            inputs: self.sender.clone(),
            renderer: OverlayRenderer::new(style),
            texture: None,
            path: String::new(),
            seek_seconds: 0.0,
            question: String::new(),
        }
    }
}

/// Blocks until the window closes, then asks the session to quit.
pub fn run_window(window: DisplayWindow) -> Result<(), Box<dyn Error + Send + Sync>> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    let inputs = window.inputs.clone();

    let result = eframe::run_native(
        "AstroGuard Overlay",
        options,
        Box::new(move |cc| {
            if let Ok(mut context) = window.context.lock() {
                *context = Some(cc.egui_ctx.clone());
            }
            Box::new(window)
        }),
    );

    let _ = inputs.send(DisplayInput::Quit);
    result.map_err(|e| e.to_string().into())
}

impl DeviceDisplay for DeviceDisplayGui {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn Error + Send + Sync>> {
        *self.frame.lock().map_err(|_| "display frame lock poisoned")? = frame.clone();

        if let Ok(context) = self.context.lock() {
            if let Some(context) = context.as_ref() {
                context.request_repaint();
            }
        }
        Ok(())
    }

    fn inputs(&mut self) -> Result<Receiver<DisplayInput>, Box<dyn Error + Send + Sync>> {
        self.receiver
            .lock()
            .map_err(|_| "display input lock poisoned")?
            .take()
            .ok_or_else(|| "display input already subscribed".into())
    }
}
