use crate::backend::interface::ChatAnswer;
use crate::config::Config;
use crate::device_display::interface::{DeviceDisplay, DisplayFrame, MediaView};
use crate::live_stream::bridge::BridgeState;
use crate::overlay_app::core::{
    ChatExchange, HealingState, HealthState, LogConfidence, LogEntry, Model, PlaybackSession,
    Request,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Render {
    device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
    config: Config,
}

impl Render {
    pub fn new(device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>, config: Config) -> Self {
        Self {
            device_display,
            config,
        }
    }

    pub fn render(&self, model: &Model) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let frame = display_frame(&self.config, model);
        self.device_display
            .lock()
            .map_err(|_| "display lock poisoned")?
            .show(&frame)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn request_line<T>(request: &Request<T>, ready: impl FnOnce(&T) -> String) -> String {
    match request {
        Request::Pending => "Analyzing...".to_string(),
        Request::Ready(value) => ready(value),
        Request::Failed(message) => format!("Failed: {}", message),
    }
}

pub fn display_frame(config: &Config, model: &Model) -> DisplayFrame {
    let mut frame = DisplayFrame {
        exiting: model.exiting,
        ..DisplayFrame::default()
    };

    match &model.session {
        PlaybackSession::Idle => {
            frame.source = "Idle".to_string();
        }
        PlaybackSession::Image(image) => {
            frame.source = format!("Image: {}", file_name(&image.path));
            frame.metrics.push(request_line(&image.detection, |metrics| {
                format!(
                    "{} objects in {:.0} ms",
                    metrics.count, metrics.latency_ms
                )
            }));
            frame.media = Some(MediaView {
                intrinsic: image.media_size(config),
                picture: image.picture.clone(),
                detections: image.detections.clone(),
            });
        }
        PlaybackSession::Video(video) => {
            frame.source = format!("Video: {}", file_name(&video.path));
            frame.metrics.push(request_line(&video.analysis, |metrics| {
                format!(
                    "{} frames, {:.0} ms avg, {:.0}% avg confidence",
                    metrics.processed_frames,
                    metrics.avg_latency_ms,
                    metrics.avg_confidence * 100.0
                )
            }));
            frame.metrics.push(format!(
                "{} {:.2}s @ {} fps",
                if video.playing { "Playing" } else { "Paused" },
                video.current_time,
                video.fps
            ));
            if let Some(resolved) = video.resolved {
                frame.metrics.push(format!(
                    "Frame {} -> annotations of frame {}",
                    resolved.target, resolved.frame
                ));
            }
            frame.media = Some(MediaView {
                intrinsic: video.media_size,
                picture: None,
                detections: video.detections().to_vec(),
            });
        }
        PlaybackSession::LiveStream(live) => {
            frame.source = "Live".to_string();
            frame.metrics.push(match live.bridge {
                BridgeState::Closed => "Disconnected".to_string(),
                BridgeState::Connecting => "Connecting...".to_string(),
                BridgeState::Open => format!(
                    "{} objects, {:.0} ms, {:.1} fps",
                    live.annotations.latest().len(),
                    live.latency_ms,
                    live.fps
                ),
            });
            frame.media = Some(MediaView {
                intrinsic: live
                    .picture
                    .as_ref()
                    .map(|picture| picture.size())
                    .unwrap_or(config.default_media_size),
                picture: live.picture.clone(),
                detections: live.annotations.latest().to_vec(),
            });
        }
    }

    frame.health = match &model.health {
        HealthState::Unknown => "Backend: checking...".to_string(),
        HealthState::Online(status) => format!("Backend: {}", status.status),
        HealthState::Offline(message) => format!("Backend offline: {}", message),
    };

    frame.healing = match &model.healing {
        HealingState::Idle => "Falcon-Link: standby".to_string(),
        HealingState::Running { object_class } => {
            format!("Falcon-Link: healing {}...", object_class)
        }
        HealingState::Healed {
            object_class,
            synthetic_images,
            improvement_percent,
        } => format!(
            "Falcon-Link: {} healed, {} synthetic images, +{:.1}%",
            object_class, synthetic_images, improvement_percent
        ),
        HealingState::Failed(message) => format!("Falcon-Link failed: {}", message),
    };

    if let Some(status) = &model.falcon_status {
        frame.falcon = vec![
            format!("Triggers: {}", status.total_triggers),
            format!("Synthetic images: {}", status.synthetic_images_generated),
            format!("Avg improvement: {:.1}%", status.avg_improvement),
            format!("Cases: {}/{}", status.cases_resolved, status.total_cases),
        ];
    }

    frame.notices = [&model.detection_notice, &model.falcon_notice]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    frame.log = model
        .log
        .iter()
        .map(|entry| log_line(config, entry))
        .collect();

    frame.chat = model.chat.iter().flat_map(chat_lines).collect();
    frame.chat.extend(model.chat_notice.clone());

    frame
}

fn chat_lines(exchange: &ChatExchange) -> Vec<String> {
    let mut lines = vec![format!("You: {}", exchange.question)];
    match &exchange.answer {
        Request::Pending => lines.push("Assistant: thinking...".to_string()),
        Request::Failed(message) => lines.push(format!("Assistant failed: {}", message)),
        Request::Ready(answer) => lines.extend(answer_lines(answer)),
    }
    lines
}

/// The assistant's reply, then its alerts and recommendations indented.
pub fn answer_lines(answer: &ChatAnswer) -> Vec<String> {
    let verdict = match answer.is_safe {
        Some(true) => " [SAFE]",
        Some(false) => " [WARNING]",
        None => "",
    };

    let mut lines = vec![format!("Assistant{}: {}", verdict, answer.response)];
    lines.extend(answer.alerts.iter().map(|alert| format!("  ! {}", alert)));
    lines.extend(
        answer
            .recommendations
            .iter()
            .map(|recommendation| format!("  - {}", recommendation)),
    );
    lines
}

fn log_line(config: &Config, entry: &LogEntry) -> String {
    let confidence = match entry.confidence {
        LogConfidence::Percent(percent) => format!("{}%", percent),
        LogConfidence::NotAvailable => "N/A".to_string(),
        LogConfidence::Boosted => "BOOSTED".to_string(),
    };
    format!(
        "{} {:>2} obj {:>7}{}{}",
        entry
            .time
            .with_timezone(&config.logger_timezone)
            .format("%H:%M:%S"),
        entry.objects,
        confidence,
        if entry.falcon { " FALCON" } else { "" },
        if entry.healed { " HEALED" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::overlay_app::core::{ImageMetrics, ImageSession};
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_idle_frame_has_no_media() {
        let frame = display_frame(&Config::default(), &Model::default());

        assert_eq!(frame.source, "Idle");
        assert!(frame.media.is_none());
        assert_eq!(frame.health, "Backend: checking...");
    }

    #[test]
    fn test_image_frame_without_picture_uses_default_size() {
        let config = Config::default();
        let model = Model {
            session: PlaybackSession::Image(ImageSession {
                path: PathBuf::from("/data/bay.jpg"),
                picture: None,
                detection: Request::Ready(ImageMetrics {
                    latency_ms: 41.0,
                    count: 1,
                }),
                detections: vec![Detection::new("FireAlarm", 0.9, [0.1, 0.1, 0.2, 0.2])],
            }),
            detection_notice: Some("Could not read image: bad".to_string()),
            ..Model::default()
        };

        let frame = display_frame(&config, &model);
        let media = frame.media.unwrap();

        assert_eq!(frame.source, "Image: bay.jpg");
        assert_eq!(frame.metrics, vec!["1 objects in 41 ms".to_string()]);
        assert_eq!(media.intrinsic, config.default_media_size);
        assert_eq!(media.detections.len(), 1);
        assert_eq!(frame.notices, vec!["Could not read image: bad".to_string()]);
    }

    #[test]
    fn test_log_line() {
        let entry = LogEntry {
            time: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap(),
            objects: 3,
            confidence: LogConfidence::Boosted,
            falcon: true,
            healed: true,
        };

        assert_eq!(
            log_line(&Config::default(), &entry),
            "12:30:05  3 obj BOOSTED FALCON HEALED"
        );
    }

    #[test]
    fn test_chat_panel_lines() {
        let model = Model {
            chat: vec![
                ChatExchange {
                    id: 1,
                    question: "is the bay safe?".to_string(),
                    answer: Request::Ready(ChatAnswer {
                        response: "Some equipment has reduced visibility.".to_string(),
                        is_safe: Some(false),
                        alerts: vec!["FireAlarm has low visibility".to_string()],
                        recommendations: vec!["Verify equipment is not obstructed".to_string()],
                        ..ChatAnswer::default()
                    }),
                },
                ChatExchange {
                    id: 2,
                    question: "and now?".to_string(),
                    answer: Request::Pending,
                },
            ],
            chat_notice: Some("Assistant unavailable: timeout".to_string()),
            ..Model::default()
        };

        let frame = display_frame(&Config::default(), &model);

        assert_eq!(
            frame.chat,
            vec![
                "You: is the bay safe?",
                "Assistant [WARNING]: Some equipment has reduced visibility.",
                "  ! FireAlarm has low visibility",
                "  - Verify equipment is not obstructed",
                "You: and now?",
                "Assistant: thinking...",
                "Assistant unavailable: timeout",
            ]
        );
        assert!(frame.notices.is_empty());
    }
}
