use crate::annotation_store::FrameDetections;
use crate::config::MediaSize;
use crate::detection::Detection;
use serde::Deserialize;
use std::path::Path;

pub type BackendResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// `POST /detect/fusion`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDetection {
    pub detections: Vec<Detection>,
    pub latency_ms: f64,
    pub falcon_trigger: bool,
    pub count: usize,
}

/// `POST /detect/video`
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnalysis {
    pub frames: Vec<FrameDetections>,
    pub fps: Option<f64>,
    pub processed_frames: u32,
    pub media_size: Option<MediaSize>,
    pub avg_latency_ms: f64,
    pub avg_confidence: f32,
    pub falcon_triggered: bool,
}

/// `GET /system/health`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub modules: Vec<String>,
    pub db_connection: String,
    pub gpu: String,
}

/// `GET /falcon/status`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FalconStatus {
    pub total_triggers: u64,
    pub synthetic_images_generated: u64,
    pub avg_improvement: f64,
    pub cases_resolved: u64,
    pub total_cases: u64,
}

/// `POST /falcon/run-healing`
#[derive(Debug, Clone, PartialEq)]
pub struct HealingResult {
    pub synthetic_images_generated: u64,
    pub improvement_percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyntheticImage {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub object_class: String,
    pub variation: String,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EdgeCase {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub scenario: String,
    pub object_class: String,
    pub description: String,
    pub status: String,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEdgeCase {
    pub scenario: String,
    pub object_class: String,
    pub description: String,
}

/// Answer of the safety assistant, from `POST /chat/safety` (about an image)
/// or `POST /chat/quick` (about the latest detections).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatAnswer {
    pub response: String,
    pub is_safe: Option<bool>,
    pub confidence: Option<f32>,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub equipment_detected: Option<u64>,
}

/// The remote detection, fusion and Falcon-Link service.
pub trait Backend {
    fn health(&self) -> BackendResult<HealthStatus>;

    fn detect_image(&self, file_name: &str, image: Vec<u8>) -> BackendResult<ImageDetection>;

    fn analyze_video(&self, path: &Path) -> BackendResult<VideoAnalysis>;

    fn falcon_status(&self) -> BackendResult<FalconStatus>;

    fn run_healing(&self, object_class: &str) -> BackendResult<HealingResult>;

    fn synthetic_images(&self) -> BackendResult<Vec<SyntheticImage>>;

    fn generate_synthetic(&self, object_class: &str, count: u32) -> BackendResult<u64>;

    fn edge_cases(&self) -> BackendResult<Vec<EdgeCase>>;

    fn add_edge_case(&self, edge_case: &NewEdgeCase) -> BackendResult<EdgeCase>;

    fn resolve_edge_case(&self, id: &str, improvement: f64) -> BackendResult<()>;

    fn chat_query(&self, file_name: &str, image: Vec<u8>, query: &str) -> BackendResult<ChatAnswer>;

    fn chat_quick(&self, query: &str) -> BackendResult<ChatAnswer>;
}
