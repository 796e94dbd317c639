use crate::config::{MediaSize, OverlayStyle};
use crate::detection::{BoundingBox, Detection};
use crate::overlay::interface::{Point, Rect, Surface};

/// Draws detection boxes, label chips and corner accents over rendered media.
///
/// Every call clears the surface first, so drawing the same input twice
/// leaves the same picture.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn draw(&self, surface: &mut dyn Surface, detections: &[Detection], intrinsic: MediaSize) {
        surface.clear();

        let rendered = surface.rendered_size();

        for detection in detections {
            let rect = self.project(&detection.bounding_box, intrinsic, rendered);
            self.draw_box(surface, detection, rect);
            self.draw_label(surface, detection, rect);
        }
    }

    /// Maps a detection box into surface pixels. Normalized boxes are first
    /// scaled to the intrinsic media size; both are then scaled to the
    /// rendered size. A box is read one way as a whole.
    pub fn project(
        &self,
        bounding_box: &BoundingBox,
        intrinsic: MediaSize,
        rendered: (f32, f32),
    ) -> Rect {
        let scale_x = scale(rendered.0, intrinsic.width);
        let scale_y = scale(rendered.1, intrinsic.height);

        let [x1, y1, x2, y2] = if bounding_box.is_normalized(self.style.coordinate_convention) {
            let [x1, y1, x2, y2] = bounding_box.0;
            [
                x1 * intrinsic.width,
                y1 * intrinsic.height,
                x2 * intrinsic.width,
                y2 * intrinsic.height,
            ]
        } else {
            bounding_box.0
        };

        Rect {
            x: x1 * scale_x,
            y: y1 * scale_y,
            width: (x2 - x1) * scale_x,
            height: (y2 - y1) * scale_y,
        }
    }

    fn draw_box(&self, surface: &mut dyn Surface, detection: &Detection, rect: Rect) {
        let color = self.style.color_for(&detection.class_label);

        surface.stroke_rect(rect, color, self.style.box_stroke_width);

        let corner = self
            .style
            .corner_max_length
            .min(rect.width * self.style.corner_fraction)
            .min(rect.height * self.style.corner_fraction)
            .max(0.0);

        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.x + rect.width, rect.y + rect.height);

        let corners = [
            [(x1, y1 + corner), (x1, y1), (x1 + corner, y1)],
            [(x2 - corner, y1), (x2, y1), (x2, y1 + corner)],
            [(x1, y2 - corner), (x1, y2), (x1 + corner, y2)],
            [(x2 - corner, y2), (x2, y2), (x2, y2 - corner)],
        ];

        for accent in corners {
            let points = accent.map(|(x, y)| Point { x, y });
            surface.stroke_polyline(&points, color, self.style.corner_stroke_width);
        }
    }

    fn draw_label(&self, surface: &mut dyn Surface, detection: &Detection, rect: Rect) {
        let text = detection.label_text();
        let style = &self.style;

        let font_size = (rect.width * style.label_font_fraction)
            .clamp(style.label_font_min, style.label_font_max);
        let chip_height = font_size + style.label_padding * 2.0;
        let chip_width = surface.measure_text(&text, font_size) + style.label_padding * 2.0;

        // above the box when there is room, else flush inside its top edge
        let chip_y = if rect.y > chip_height + style.label_gap {
            rect.y - chip_height - style.label_gap
        } else {
            rect.y + style.label_gap
        };

        let chip = Rect {
            x: rect.x,
            y: chip_y,
            width: chip_width,
            height: chip_height,
        };

        let chip_color = if detection.healed {
            style.healed_color
        } else {
            style.color_for(&detection.class_label)
        };

        surface.fill_rounded_rect(chip, style.label_radius, chip_color);
        surface.fill_text(
            Point {
                x: chip.x + style.label_padding,
                y: chip.y + style.label_padding,
            },
            &text,
            font_size,
            style.label_text_color,
        );
    }
}

fn scale(rendered: f32, intrinsic: f32) -> f32 {
    if intrinsic > 0.0 && intrinsic.is_finite() && rendered.is_finite() {
        rendered / intrinsic
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassColor;
    use crate::detection::CoordinateConvention;
    use crate::overlay::impl_fake::{DrawOp, SurfaceFake};
    use crate::overlay::interface::Color;

    const INTRINSIC: MediaSize = MediaSize {
        width: 1000.0,
        height: 500.0,
    };

    fn renderer() -> OverlayRenderer {
        let mut style = OverlayStyle::default();
        // distinct from the class colors so healed chips are recognizable
        style.healed_color = Color::from_hex(0xFFD700);
        style.class_colors.push(ClassColor {
            label: "Marker".to_string(),
            color: Color::from_hex(0x123456),
        });
        OverlayRenderer::new(style)
    }

    fn assert_rect_eq(actual: Rect, expected: Rect) {
        let close = |a: f32, b: f32| (a - b).abs() < 1e-3;
        assert!(
            close(actual.x, expected.x)
                && close(actual.y, expected.y)
                && close(actual.width, expected.width)
                && close(actual.height, expected.height),
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_normalized_box_is_scaled_by_intrinsic_then_rendered_size() {
        let rect = renderer().project(&BoundingBox([0.1, 0.2, 0.5, 0.6]), INTRINSIC, (500.0, 250.0));

        assert_rect_eq(
            rect,
            Rect {
                x: 50.0,
                y: 50.0,
                width: 200.0,
                height: 100.0,
            },
        );
    }

    #[test]
    fn test_absolute_box_only_gets_render_scale() {
        let rect = renderer().project(
            &BoundingBox([100.0, 50.0, 300.0, 250.0]),
            INTRINSIC,
            (500.0, 250.0),
        );

        assert_rect_eq(
            rect,
            Rect {
                x: 50.0,
                y: 25.0,
                width: 100.0,
                height: 100.0,
            },
        );
    }

    #[test]
    fn test_single_large_component_makes_whole_box_absolute() {
        let rect = renderer().project(&BoundingBox([0.5, 0.5, 0.9, 2.0]), INTRINSIC, (1000.0, 500.0));

        assert_rect_eq(
            rect,
            Rect {
                x: 0.5,
                y: 0.5,
                width: 0.4,
                height: 1.5,
            },
        );
    }

    #[test]
    fn test_declared_convention_overrides_heuristic() {
        let mut style = OverlayStyle::default();
        style.coordinate_convention = CoordinateConvention::Absolute;
        let rect = OverlayRenderer::new(style).project(
            &BoundingBox([0.1, 0.2, 0.5, 0.6]),
            INTRINSIC,
            (1000.0, 500.0),
        );

        assert!((rect.width - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_redraw_is_idempotent() {
        let renderer = renderer();
        let detections = vec![
            Detection::new("OxygenTank", 0.9, [0.1, 0.3, 0.4, 0.9]),
            Detection::new("FireAlarm", 0.5, [600.0, 100.0, 900.0, 400.0]),
        ];
        let mut surface = SurfaceFake::new(800.0, 400.0);

        renderer.draw(&mut surface, &detections, INTRINSIC);
        let first = surface.ops().to_vec();
        renderer.draw(&mut surface, &detections, INTRINSIC);

        assert_eq!(surface.ops(), first.as_slice());
        assert_eq!(surface.clear_count(), 2);
    }

    #[test]
    fn test_empty_detections_clear_surface() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(800.0, 400.0);
        renderer.draw(&mut surface, &[Detection::new("A", 0.5, [0.1, 0.1, 0.2, 0.2])], INTRINSIC);

        renderer.draw(&mut surface, &[], INTRINSIC);

        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_box_and_four_corner_accents_use_class_color() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);

        renderer.draw(
            &mut surface,
            &[Detection::new("Marker", 0.7, [100.0, 100.0, 400.0, 300.0])],
            INTRINSIC,
        );

        let marker = Color::from_hex(0x123456);
        let rects: Vec<_> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeRect { color, width, .. } => Some((*color, *width)),
                _ => None,
            })
            .collect();
        assert_eq!(rects, vec![(marker, 4.0)]);

        let accents: Vec<_> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokePolyline { points, color, .. } => Some((points.clone(), *color)),
                _ => None,
            })
            .collect();
        assert_eq!(accents.len(), 4);
        assert!(accents.iter().all(|(_, color)| *color == marker));
        // 300x200 box: min(20, 45, 30) = 20
        assert_eq!(accents[0].0[0], Point { x: 100.0, y: 120.0 });
    }

    #[test]
    fn test_corner_accent_shrinks_for_small_boxes() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);

        renderer.draw(
            &mut surface,
            &[Detection::new("Marker", 0.7, [100.0, 100.0, 140.0, 200.0])],
            INTRINSIC,
        );

        let first_accent = surface.ops().iter().find_map(|op| match op {
            DrawOp::StrokePolyline { points, .. } => Some(points.clone()),
            _ => None,
        });
        // 40 wide: 0.15 * 40 = 6
        assert_eq!(first_accent.unwrap()[2], Point { x: 106.0, y: 100.0 });
    }

    #[test]
    fn test_unknown_class_uses_fallback_color() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);

        renderer.draw(&mut surface, &[Detection::new("Toaster", 0.7, [0.1, 0.1, 0.2, 0.2])], INTRINSIC);

        let fallback = OverlayStyle::default().fallback_color;
        assert!(surface.ops().iter().any(|op| matches!(
            op,
            DrawOp::StrokeRect { color, .. } if *color == fallback
        )));
    }

    #[test]
    fn test_label_above_box_when_room() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);

        renderer.draw(
            &mut surface,
            &[Detection::new("Marker", 0.7, [100.0, 200.0, 300.0, 300.0])],
            INTRINSIC,
        );

        let chip = surface.chips()[0].0;
        // 200 wide: font clamp(24, 18, 28) = 24, chip 40 high
        assert!((chip.height - 40.0).abs() < 1e-3);
        assert!((chip.y - 155.0).abs() < 1e-3);
    }

    #[test]
    fn test_label_inside_box_when_no_room_above() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);

        renderer.draw(
            &mut surface,
            &[Detection::new("Marker", 0.7, [100.0, 10.0, 300.0, 300.0])],
            INTRINSIC,
        );

        let chip = surface.chips()[0].0;
        assert!((chip.y - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_chip_width_follows_measured_text() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);
        let detection = Detection::new("Marker", 0.7, [100.0, 200.0, 300.0, 300.0]);

        renderer.draw(&mut surface, &[detection.clone()], INTRINSIC);

        let chip = surface.chips()[0].0;
        let expected = surface.measure_text(&detection.label_text(), 24.0) + 16.0;
        assert!((chip.width - expected).abs() < 1e-3);
    }

    #[test]
    fn test_healed_detection_uses_healed_color_and_check_mark() {
        let renderer = renderer();
        let mut surface = SurfaceFake::new(1000.0, 500.0);
        let mut detection = Detection::new("Marker", 0.83, [100.0, 200.0, 300.0, 300.0]);
        detection.healed = true;

        renderer.draw(&mut surface, &[detection], INTRINSIC);

        let (_, chip_color) = surface.chips()[0];
        assert_eq!(chip_color, Color::from_hex(0xFFD700));
        assert_ne!(chip_color, Color::from_hex(0x123456));
        assert!(surface.texts()[0].ends_with("83% ✓"));
    }
}
