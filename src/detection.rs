use serde_json::Value;

pub const UNKNOWN_CLASS: &str = "Unknown";

/// `[x1, y1, x2, y2]`, either fractions of the media size or pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox(pub [f32; 4]);

/// How the coordinates of a [`BoundingBox`] are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateConvention {
    /// Normalized when every component is `<= 1`, absolute otherwise.
    #[default]
    Auto,
    Normalized,
    Absolute,
}

impl BoundingBox {
    pub fn is_normalized(&self, convention: CoordinateConvention) -> bool {
        match convention {
            CoordinateConvention::Auto => self.0.iter().all(|v| *v <= 1.0),
            CoordinateConvention::Normalized => true,
            CoordinateConvention::Absolute => false,
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        let Some(Value::Array(items)) = value else {
            return Self::default();
        };

        if items.len() < 4 {
            return Self::default();
        }

        let mut coords = [0.0; 4];
        for (coord, item) in coords.iter_mut().zip(items.iter()) {
            *coord = item.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0) as f32;
        }
        Self(coords)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub class_label: String,
    pub track_id: Option<String>,
    pub healed: bool,
}

impl Detection {
    pub fn new(class_label: &str, confidence: f32, bounding_box: [f32; 4]) -> Self {
        Self {
            bounding_box: BoundingBox(bounding_box),
            confidence: clamp_confidence(confidence as f64),
            class_label: class_label.to_string(),
            track_id: None,
            healed: false,
        }
    }

    /// Reads a detection from any of the backend's response shapes.
    /// Missing or malformed fields are defaulted, never rejected.
    pub fn from_json(value: &Value) -> Self {
        let confidence = first_field(value, &["score", "confidence"])
            .and_then(number_from_json)
            .unwrap_or(0.0);

        let class_label = first_field(value, &["label", "class"])
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
            .unwrap_or(UNKNOWN_CLASS)
            .to_string();

        let track_id = first_field(value, &["track_id", "trackId"]).map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        Self {
            bounding_box: BoundingBox::from_json(first_field(value, &["box", "bbox"])),
            confidence: clamp_confidence(confidence),
            class_label,
            track_id,
            healed: first_field(value, &["healed"])
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }

    pub fn label_text(&self) -> String {
        let suffix = if self.healed { " ✓" } else { "" };
        format!(
            "{} {}%{}",
            self.class_label,
            self.confidence_percent(),
            suffix
        )
    }

    pub fn boosted(&self, boost: f32, cap: f32) -> Self {
        Self {
            confidence: (self.confidence + boost).min(cap).clamp(0.0, 1.0),
            healed: true,
            ..self.clone()
        }
    }
}

pub fn detections_from_json(value: Option<&Value>) -> Vec<Detection> {
    match value {
        Some(Value::Array(items)) => items.iter().map(Detection::from_json).collect(),
        _ => vec![],
    }
}

pub fn average_confidence(detections: &[Detection]) -> f32 {
    if detections.is_empty() {
        return 0.0;
    }
    detections.iter().map(|d| d.confidence).sum::<f32>() / detections.len() as f32
}

/// First of `names` present on `value` with a non-null value.
pub fn first_field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(name))
        .find(|v| !v.is_null())
}

pub fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn clamp_confidence(confidence: f64) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_fused_field_names() {
        let detection = Detection::from_json(&json!({
            "box": [10, 20, 110, 220],
            "score": 0.83,
            "label": "OxygenTank",
            "track_id": 7
        }));

        assert_eq!(detection.bounding_box, BoundingBox([10.0, 20.0, 110.0, 220.0]));
        assert!((detection.confidence - 0.83).abs() < 1e-6);
        assert_eq!(detection.class_label, "OxygenTank");
        assert_eq!(detection.track_id.as_deref(), Some("7"));
        assert!(!detection.healed);
    }

    #[test]
    fn test_reads_yolo_field_names() {
        let detection = Detection::from_json(&json!({
            "bbox": [0.1, 0.2, 0.3, 0.4],
            "confidence": 0.5,
            "class": "FireAlarm"
        }));

        assert_eq!(detection.bounding_box, BoundingBox([0.1, 0.2, 0.3, 0.4]));
        assert_eq!(detection.class_label, "FireAlarm");
    }

    #[test]
    fn test_missing_fields_are_defaulted() {
        let detection = Detection::from_json(&json!({ "box": [1, 2] }));

        assert_eq!(detection.bounding_box, BoundingBox::default());
        assert_eq!(detection.confidence, 0.0);
        assert_eq!(detection.class_label, UNKNOWN_CLASS);
        assert_eq!(detection.track_id, None);
    }

    #[test]
    fn test_null_confidence_falls_through_and_empty_label_is_unknown() {
        let detection = Detection::from_json(&json!({
            "score": null,
            "confidence": 0.4,
            "label": "",
            "class": "FirstAidBox"
        }));

        assert!((detection.confidence - 0.4).abs() < 1e-6);
        assert_eq!(detection.class_label, UNKNOWN_CLASS);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Detection::from_json(&json!({ "score": 1.7 })).confidence, 1.0);
        assert_eq!(Detection::from_json(&json!({ "score": -0.2 })).confidence, 0.0);
        assert_eq!(Detection::new("X", f32::NAN, [0.0; 4]).confidence, 0.0);
    }

    #[test]
    fn test_label_text() {
        let mut detection = Detection::new("OxygenTank", 0.83, [0.0; 4]);
        assert_eq!(detection.label_text(), "OxygenTank 83%");

        detection.healed = true;
        assert!(detection.label_text().ends_with("83% ✓"));
    }

    #[test]
    fn test_boost_is_capped_and_marks_healed() {
        let detection = Detection::new("OxygenTank", 0.9, [0.0; 4]).boosted(0.12, 0.98);

        assert!((detection.confidence - 0.98).abs() < 1e-6);
        assert!(detection.healed);
    }

    #[test]
    fn test_auto_convention() {
        assert!(BoundingBox([0.1, 0.2, 1.0, 0.9]).is_normalized(CoordinateConvention::Auto));
        assert!(!BoundingBox([0.1, 0.2, 1.5, 0.9]).is_normalized(CoordinateConvention::Auto));
        assert!(!BoundingBox([0.1, 0.2, 0.3, 0.4]).is_normalized(CoordinateConvention::Absolute));
        assert!(BoundingBox([10.0, 20.0, 30.0, 40.0])
            .is_normalized(CoordinateConvention::Normalized));
    }

    #[test]
    fn test_average_confidence() {
        assert_eq!(average_confidence(&[]), 0.0);
        let detections = vec![
            Detection::new("A", 0.2, [0.0; 4]),
            Detection::new("B", 0.6, [0.0; 4]),
        ];
        assert!((average_confidence(&detections) - 0.4).abs() < 1e-6);
    }
}
