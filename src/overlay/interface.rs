#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A transparent drawing surface laid over the rendered media.
///
/// Coordinates are in surface pixels with the origin at the top-left corner
/// of the media's rendered rectangle.
pub trait Surface {
    /// Width and height the media is rendered at right now.
    fn rendered_size(&self) -> (f32, f32);

    fn clear(&mut self);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);

    fn stroke_polyline(&mut self, points: &[Point], color: Color, width: f32);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color);

    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// `origin` is the top-left corner of the text's bounding box.
    fn fill_text(&mut self, origin: Point, text: &str, font_size: f32, color: Color);
}
