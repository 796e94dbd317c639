//! Lenient readers for backend responses. Field names vary between backend
//! versions; missing fields are defaulted.

use crate::annotation_store::FrameDetections;
use crate::backend::interface::{ChatAnswer, HealingResult, ImageDetection, VideoAnalysis};
use crate::config::MediaSize;
use crate::detection::{detections_from_json, first_field, number_from_json};
use serde_json::Value;

pub fn image_detection_from_json(value: &Value) -> ImageDetection {
    let detections = detections_from_json(value.get("detections"));

    let count = first_field(value, &["count", "total_objects"])
        .and_then(Value::as_u64)
        .map(|count| count as usize)
        .unwrap_or(detections.len());

    ImageDetection {
        latency_ms: number_field(value, &["latency_ms", "inference_time"]).unwrap_or(0.0),
        falcon_trigger: bool_field(value, &["falcon_trigger", "falcon_triggered"]),
        count,
        detections,
    }
}

pub fn video_analysis_from_json(value: &Value) -> VideoAnalysis {
    let frames: Vec<FrameDetections> = match value.get("frames") {
        Some(Value::Array(frames)) => frames
            .iter()
            .filter_map(|frame| {
                let index = first_field(frame, &["frame", "frame_index", "index"])
                    .and_then(number_from_json)
                    .filter(|index| {
                        *index >= 0.0 && index.fract() == 0.0 && *index <= f64::from(u32::MAX)
                    })?;
                Some(FrameDetections {
                    index: index as u32,
                    detections: detections_from_json(frame.get("detections")),
                })
            })
            .collect(),
        _ => vec![],
    };

    let info = value.get("video_info").unwrap_or(&Value::Null);

    let media_size = match (
        number_field(info, &["width"]),
        number_field(info, &["height"]),
    ) {
        (Some(width), Some(height)) if width > 0.0 && height > 0.0 => Some(MediaSize {
            width: width as f32,
            height: height as f32,
        }),
        _ => None,
    };

    VideoAnalysis {
        fps: number_field(info, &["fps"]).filter(|fps| *fps > 0.0),
        processed_frames: number_field(info, &["processed_frames"])
            .map(|n| n as u32)
            .unwrap_or(frames.len() as u32),
        media_size,
        avg_latency_ms: number_field(value, &["avg_latency_ms"]).unwrap_or(0.0),
        avg_confidence: number_field(value, &["avg_confidence"]).unwrap_or(0.0) as f32,
        falcon_triggered: bool_field(value, &["falcon_triggered", "falcon_trigger"]),
        frames,
    }
}

pub fn healing_result_from_json(value: &Value) -> HealingResult {
    HealingResult {
        synthetic_images_generated: number_field(value, &["synthetic_images_generated"])
            .map(|n| n as u64)
            .unwrap_or(0),
        improvement_percent: value
            .get("improvement_estimate")
            .and_then(percent_from_json)
            .unwrap_or(0.0),
    }
}

pub fn chat_answer_from_json(value: &Value) -> ChatAnswer {
    ChatAnswer {
        response: first_field(value, &["response", "answer", "summary"])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        is_safe: first_field(value, &["is_safe", "safe"]).and_then(Value::as_bool),
        confidence: number_field(value, &["confidence"]).map(|c| c.clamp(0.0, 1.0) as f32),
        alerts: strings_field(value, "alerts"),
        recommendations: strings_field(value, "recommendations"),
        equipment_detected: first_field(
            value,
            &["equipment_detected", "detected_equipment", "detections_used"],
        )
        .and_then(|field| match field {
            Value::Array(items) => Some(items.len() as u64),
            other => number_from_json(other)
                .filter(|n| *n >= 0.0)
                .map(|n| n as u64),
        }),
    }
}

/// Accepts `12.5`, `"12.5"`, `"+12.5%"`.
pub fn percent_from_json(value: &Value) -> Option<f32> {
    match value {
        Value::String(s) => s
            .trim()
            .trim_start_matches('+')
            .trim_end_matches('%')
            .trim()
            .parse::<f32>()
            .ok(),
        other => number_from_json(other).map(|n| n as f32),
    }
}

fn number_field(value: &Value, names: &[&str]) -> Option<f64> {
    first_field(value, names).and_then(number_from_json)
}

fn strings_field(value: &Value, name: &str) -> Vec<String> {
    match value.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![],
    }
}

fn bool_field(value: &Value, names: &[&str]) -> bool {
    first_field(value, names)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
