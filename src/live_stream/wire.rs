//! Messages exchanged with the live analyzer.
//!
//! Client: `{"type":"frame","data":"data:image/jpeg;base64,...","session":7}`
//! Server: `{"type":"detection","detections":[...],"latency_ms":..,"fps":..,"falcon_trigger":..}`

use crate::detection::{detections_from_json, first_field, number_from_json, Detection};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde_json::{json, Value};

pub type WireResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveDetection {
    pub detections: Vec<Detection>,
    pub latency_ms: f64,
    pub fps: f64,
    pub falcon_trigger: bool,
    /// Session token echoed by the server, when it echoes one.
    pub session: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Detection(LiveDetection),
    Other(String),
}

pub fn encode_jpeg(frame: &DynamicImage, quality: u8) -> WireResult<Vec<u8>> {
    let rgb = frame.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(bytes)
}

pub fn frame_message(frame: &DynamicImage, quality: u8, session: u64) -> WireResult<String> {
    let jpeg = encode_jpeg(frame, quality)?;
    let data = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));
    Ok(json!({ "type": "frame", "data": data, "session": session }).to_string())
}

pub fn parse_server_message(text: &str) -> WireResult<ServerMessage> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if kind != "detection" {
        return Ok(ServerMessage::Other(kind));
    }

    Ok(ServerMessage::Detection(LiveDetection {
        detections: detections_from_json(value.get("detections")),
        latency_ms: number(&value, &["latency_ms"]),
        fps: number(&value, &["fps"]),
        falcon_trigger: first_field(&value, &["falcon_trigger", "falcon_triggered"])
            .and_then(Value::as_bool)
            .unwrap_or(false),
        session: value.get("session").and_then(Value::as_u64),
    }))
}

fn number(value: &Value, names: &[&str]) -> f64 {
    first_field(value, names)
        .and_then(number_from_json)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_message_carries_jpeg_data_url_and_session() {
        let frame = DynamicImage::new_rgb8(16, 8);

        let message: Value =
            serde_json::from_str(&frame_message(&frame, 80, 42).unwrap()).unwrap();

        assert_eq!(message["type"], "frame");
        assert_eq!(message["session"], 42);

        let data = message["data"].as_str().unwrap();
        let encoded = data.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = STANDARD.decode(encoded).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_parse_detection_message() {
        let message = parse_server_message(
            r#"{"type":"detection","detections":[{"bbox":[0.1,0.1,0.5,0.5],"confidence":0.4,"class":"FireAlarm"}],"latency_ms":35.5,"fps":9.8,"falcon_trigger":true,"session":3}"#,
        )
        .unwrap();

        let ServerMessage::Detection(detection) = message else {
            panic!("expected detection");
        };
        assert_eq!(detection.detections.len(), 1);
        assert_eq!(detection.detections[0].class_label, "FireAlarm");
        assert_eq!(detection.latency_ms, 35.5);
        assert_eq!(detection.fps, 9.8);
        assert!(detection.falcon_trigger);
        assert_eq!(detection.session, Some(3));
    }

    #[test]
    fn test_parse_detection_without_session() {
        let ServerMessage::Detection(detection) =
            parse_server_message(r#"{"type":"detection"}"#).unwrap()
        else {
            panic!("expected detection");
        };

        assert!(detection.detections.is_empty());
        assert_eq!(detection.session, None);
        assert!(!detection.falcon_trigger);
    }

    #[test]
    fn test_other_and_malformed_messages() {
        assert_eq!(
            parse_server_message(r#"{"type":"status","ok":true}"#).unwrap(),
            ServerMessage::Other("status".to_string())
        );
        assert!(parse_server_message("not json").is_err());
    }
}
