use crate::detection::CoordinateConvention;
use crate::overlay::interface::Color;
use chrono::Offset;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct ClassColor {
    pub label: String,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub box_stroke_width: f32,
    pub corner_stroke_width: f32,
    pub corner_max_length: f32,
    pub corner_fraction: f32,
    pub label_padding: f32,
    pub label_gap: f32,
    pub label_radius: f32,
    pub label_font_min: f32,
    pub label_font_max: f32,
    pub label_font_fraction: f32,
    pub label_text_color: Color,
    pub fallback_color: Color,
    pub healed_color: Color,
    pub class_colors: Vec<ClassColor>,
    pub coordinate_convention: CoordinateConvention,
}

impl OverlayStyle {
    pub fn color_for(&self, label: &str) -> Color {
        self.class_colors
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.color)
            .unwrap_or(self.fallback_color)
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        let class_colors = [
            ("OxygenTank", 0x00FF41),
            ("FireExtinguisher", 0xFC3D21),
            ("EmergencyPhone", 0xFFA500),
            ("FireAlarm", 0xFF1744),
            ("SafetyHelmet", 0x2196F3),
            ("NitrogenTank", 0x00CED1),
            ("FirstAidBox", 0xFF69B4),
            ("SafetySwitchPanel", 0x9370DB),
        ]
        .into_iter()
        .map(|(label, hex)| ClassColor {
            label: label.to_string(),
            color: Color::from_hex(hex),
        })
        .collect();

        Self {
            box_stroke_width: 4.0,
            corner_stroke_width: 5.0,
            corner_max_length: 20.0,
            corner_fraction: 0.15,
            label_padding: 8.0,
            label_gap: 5.0,
            label_radius: 6.0,
            label_font_min: 18.0,
            label_font_max: 28.0,
            label_font_fraction: 0.12,
            label_text_color: Color::from_hex(0x000000),
            fallback_color: Color::from_hex(0x00FF41),
            healed_color: Color::from_hex(0x00FF41),
            class_colors,
            coordinate_convention: CoordinateConvention::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealingConfig {
    /// Confidence band (exclusive) that marks a detection as a healing candidate.
    pub trigger_min_confidence: f32,
    pub trigger_max_confidence: f32,
    pub default_class: String,
    pub confidence_boost: f32,
    pub confidence_cap: f32,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            trigger_min_confidence: 0.25,
            trigger_max_confidence: 0.45,
            default_class: "OxygenTank".to_string(),
            confidence_boost: 0.12,
            confidence_cap: 0.98,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub live_stream_url: String,
    pub request_timeout: Duration,
    pub health_poll_rate: Duration,
    pub frame_send_interval: Duration,
    pub player_tick_rate: Duration,
    pub jpeg_quality: u8,
    pub default_fps: f64,
    pub default_media_size: MediaSize,
    pub log_capacity: usize,
    pub chat_capacity: usize,
    pub logger_timezone: chrono::FixedOffset,
    pub overlay: OverlayStyle,
    pub healing: HealingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            live_stream_url: "ws://localhost:8000/ws/webcam".to_string(),
            request_timeout: Duration::from_secs(30),
            health_poll_rate: Duration::from_secs(10),
            frame_send_interval: Duration::from_millis(100),
            player_tick_rate: Duration::from_millis(250),
            jpeg_quality: 80,
            default_fps: 30.0,
            default_media_size: MediaSize {
                width: 1280.0,
                height: 720.0,
            },
            log_capacity: 10,
            chat_capacity: 20,
            logger_timezone: utc(),
            overlay: OverlayStyle::default(),
            healing: HealingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ASTROGUARD_API_URL") {
            config.live_stream_url = live_stream_url_for(&url);
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(url) = std::env::var("ASTROGUARD_WS_URL") {
            config.live_stream_url = url;
        }

        if let Some(offset) = std::env::var("ASTROGUARD_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|hours| hours.trim().parse::<i32>().ok())
            .and_then(|hours| chrono::FixedOffset::east_opt(hours * 3600))
        {
            config.logger_timezone = offset;
        }

        config
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

/// `http://host:8000` -> `ws://host:8000/ws/webcam`
pub fn live_stream_url_for(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws/webcam", ws_base)
}

fn utc() -> chrono::FixedOffset {
    chrono::Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_stream_url_for() {
        assert_eq!(
            live_stream_url_for("http://10.0.0.2:8000/"),
            "ws://10.0.0.2:8000/ws/webcam"
        );
        assert_eq!(
            live_stream_url_for("https://ops.example.com"),
            "wss://ops.example.com/ws/webcam"
        );
    }

    #[test]
    fn test_unknown_class_uses_fallback_color() {
        let style = OverlayStyle::default();

        assert_eq!(style.color_for("FireExtinguisher"), Color::from_hex(0xFC3D21));
        assert_eq!(style.color_for("Toaster"), style.fallback_color);
    }
}
