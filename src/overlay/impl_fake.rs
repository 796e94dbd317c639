use crate::overlay::interface::{Color, Point, Rect, Surface};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
    },
    StrokePolyline {
        points: Vec<Point>,
        color: Color,
        width: f32,
    },
    FillRoundedRect {
        rect: Rect,
        radius: f32,
        color: Color,
    },
    FillText {
        origin: Point,
        text: String,
        font_size: f32,
        color: Color,
    },
}

/// Records draw calls instead of painting them.
#[derive(Debug, Clone)]
pub struct SurfaceFake {
    size: (f32, f32),
    ops: Vec<DrawOp>,
    clear_count: usize,
}

impl SurfaceFake {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            ops: vec![],
            clear_count: 0,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count
    }

    pub fn chips(&self) -> Vec<(Rect, Color)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRoundedRect { rect, color, .. } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for SurfaceFake {
    fn rendered_size(&self) -> (f32, f32) {
        self.size
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.clear_count += 1;
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.ops.push(DrawOp::StrokeRect { rect, color, width });
    }

    fn stroke_polyline(&mut self, points: &[Point], color: Color, width: f32) {
        self.ops.push(DrawOp::StrokePolyline {
            points: points.to_vec(),
            color,
            width,
        });
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        self.ops
            .push(DrawOp::FillRoundedRect { rect, radius, color });
    }

    // fixed advance, good enough for layout assertions
    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.6
    }

    fn fill_text(&mut self, origin: Point, text: &str, font_size: f32, color: Color) {
        self.ops.push(DrawOp::FillText {
            origin,
            text: text.to_string(),
            font_size,
            color,
        });
    }
}
