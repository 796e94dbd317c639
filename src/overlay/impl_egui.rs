use crate::overlay::interface::{Color, Point, Rect, Surface};
use eframe::egui;

enum Pending {
    Shape(egui::Shape),
    Text {
        pos: egui::Pos2,
        text: String,
        font_size: f32,
        color: egui::Color32,
    },
}

/// Overlay surface over an egui widget rect. Draw calls are buffered and
/// handed to the painter by [`SurfaceEgui::finish`], so `clear` drops
/// everything drawn since the last finish.
pub struct SurfaceEgui {
    painter: egui::Painter,
    rect: egui::Rect,
    pending: Vec<Pending>,
}

impl SurfaceEgui {
    /// `rect` is the live on-screen rect of the media widget.
    pub fn new(painter: egui::Painter, rect: egui::Rect) -> Self {
        Self {
            painter,
            rect,
            pending: vec![],
        }
    }

    pub fn finish(self) {
        for pending in self.pending {
            match pending {
                Pending::Shape(shape) => {
                    self.painter.add(shape);
                }
                Pending::Text {
                    pos,
                    text,
                    font_size,
                    color,
                } => {
                    self.painter.text(
                        pos,
                        egui::Align2::LEFT_TOP,
                        text,
                        egui::FontId::proportional(font_size),
                        color,
                    );
                }
            }
        }
    }

    fn pos(&self, point: Point) -> egui::Pos2 {
        self.rect.min + egui::vec2(point.x, point.y)
    }

    fn rect(&self, rect: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.pos(Point {
                x: rect.x,
                y: rect.y,
            }),
            egui::vec2(rect.width, rect.height),
        )
    }
}

fn color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}

impl Surface for SurfaceEgui {
    fn rendered_size(&self) -> (f32, f32) {
        (self.rect.width(), self.rect.height())
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let shape =
            egui::Shape::rect_stroke(self.rect(rect), 0.0, egui::Stroke::new(width, color32(color)));
        self.pending.push(Pending::Shape(shape));
    }

    fn stroke_polyline(&mut self, points: &[Point], color: Color, width: f32) {
        let points = points.iter().map(|p| self.pos(*p)).collect();
        let shape = egui::Shape::line(points, egui::Stroke::new(width, color32(color)));
        self.pending.push(Pending::Shape(shape));
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let shape = egui::Shape::rect_filled(self.rect(rect), radius, color32(color));
        self.pending.push(Pending::Shape(shape));
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.painter
            .layout_no_wrap(
                text.to_string(),
                egui::FontId::proportional(font_size),
                egui::Color32::BLACK,
            )
            .size()
            .x
    }

    fn fill_text(&mut self, origin: Point, text: &str, font_size: f32, color: Color) {
        self.pending.push(Pending::Text {
            pos: self.pos(origin),
            text: text.to_string(),
            font_size,
            color: color32(color),
        });
    }
}
