use crate::annotation_store::FrameDetections;
use crate::backend::interface::{
    Backend, BackendResult, ChatAnswer, EdgeCase, FalconStatus, HealingResult, HealthStatus,
    ImageDetection, NewEdgeCase, SyntheticImage, VideoAnalysis,
};
use crate::detection::{average_confidence, Detection};
use crate::library::logger::interface::Logger;
use rand::Rng;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const SAFETY_CLASSES: [&str; 7] = [
    "OxygenTank",
    "NitrogenTank",
    "FirstAidBox",
    "FireAlarm",
    "SafetySwitchPanel",
    "EmergencyPhone",
    "FireExtinguisher",
];

/// In-process stand-in for the detection service with randomized results.
pub struct BackendFake {
    logger: Arc<dyn Logger + Send + Sync>,
    offline: AtomicBool,
    edge_cases: Mutex<Vec<EdgeCase>>,
    status: Mutex<FalconStatus>,
}

impl BackendFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            logger: logger.with_namespace("backend").with_namespace("fake"),
            offline: AtomicBool::new(false),
            edge_cases: Mutex::new(vec![]),
            status: Mutex::new(FalconStatus::default()),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err("backend unreachable".into());
        }
        Ok(())
    }

    fn random_detections(&self) -> Vec<Detection> {
        let mut rng = rand::rng();
        let count = rng.random_range(1..=4);

        (0..count)
            .map(|_| {
                let x1 = rng.random_range(0.0..0.7);
                let y1 = rng.random_range(0.0..0.7);
                let w = rng.random_range(0.1..0.3);
                let h = rng.random_range(0.1..0.3);
                let class = SAFETY_CLASSES[rng.random_range(0..SAFETY_CLASSES.len())];
                Detection::new(
                    class,
                    rng.random_range(0.3..0.97),
                    [x1, y1, x1 + w, y1 + h],
                )
            })
            .collect()
    }
}

/// Canned assistant reply derived from what was detected.
fn safety_answer(detections: &[Detection]) -> ChatAnswer {
    let low: Vec<&str> = detections
        .iter()
        .filter(|d| d.confidence < 0.45)
        .map(|d| d.class_label.as_str())
        .collect();
    let high = detections.iter().filter(|d| d.confidence > 0.8).count();

    let response = if detections.is_empty() {
        "No equipment detected in current frame. Verify camera angle and lighting.".to_string()
    } else if !low.is_empty() {
        format!(
            "WARNING: Low confidence detection for: {}. Physical inspection recommended.",
            low.join(", ")
        )
    } else {
        format!(
            "SAFE: {} equipment items detected. {} with high confidence.",
            detections.len(),
            high
        )
    };

    let is_safe = !detections.is_empty() && low.is_empty();
    let recommendations = if is_safe {
        vec!["Continue regular monitoring".to_string()]
    } else {
        vec![
            "Conduct physical inspection of flagged equipment".to_string(),
            "Verify equipment is not obstructed".to_string(),
        ]
    };

    ChatAnswer {
        response,
        is_safe: Some(is_safe),
        confidence: Some(if detections.is_empty() { 0.5 } else { 0.85 }),
        alerts: low
            .iter()
            .map(|label| format!("{} has low visibility, possible obstruction", label))
            .collect(),
        recommendations,
        equipment_detected: Some(detections.len() as u64),
    }
}

fn lock_poisoned<T>(_: T) -> Box<dyn std::error::Error + Send + Sync> {
    "fake backend state poisoned".into()
}

impl Backend for BackendFake {
    fn health(&self) -> BackendResult<HealthStatus> {
        self.check_online()?;
        Ok(HealthStatus {
            status: "nominal".to_string(),
            modules: vec!["Inference".to_string(), "Falcon-Link".to_string()],
            db_connection: "connected".to_string(),
            gpu: "active".to_string(),
        })
    }

    fn detect_image(&self, file_name: &str, image: Vec<u8>) -> BackendResult<ImageDetection> {
        self.check_online()?;
        self.logger
            .info(&format!("Detecting {} ({} bytes)...", file_name, image.len()))?;

        let detections = self.random_detections();
        let falcon_trigger = detections.iter().any(|d| d.confidence < 0.45);

        Ok(ImageDetection {
            count: detections.len(),
            latency_ms: rand::rng().random_range(15.0..60.0),
            falcon_trigger,
            detections,
        })
    }

    fn analyze_video(&self, path: &Path) -> BackendResult<VideoAnalysis> {
        self.check_online()?;
        self.logger
            .info(&format!("Analyzing video {}...", path.display()))?;
        std::thread::sleep(std::time::Duration::from_millis(500));

        // every 15th frame of a 10 second clip
        let frames: Vec<FrameDetections> = (0..20)
            .map(|i| FrameDetections {
                index: i * 15,
                detections: self.random_detections(),
            })
            .collect();

        let all: Vec<Detection> = frames
            .iter()
            .flat_map(|f| f.detections.iter().cloned())
            .collect();

        Ok(VideoAnalysis {
            processed_frames: frames.len() as u32,
            fps: Some(30.0),
            media_size: None,
            avg_latency_ms: 25.0,
            avg_confidence: average_confidence(&all),
            falcon_triggered: all.iter().any(|d| d.confidence < 0.45),
            frames,
        })
    }

    fn falcon_status(&self) -> BackendResult<FalconStatus> {
        self.check_online()?;
        Ok(self.status.lock().map_err(lock_poisoned)?.clone())
    }

    fn run_healing(&self, object_class: &str) -> BackendResult<HealingResult> {
        self.check_online()?;
        self.logger
            .info(&format!("Healing {}...", object_class))?;
        std::thread::sleep(std::time::Duration::from_secs(1));

        let mut rng = rand::rng();
        let result = HealingResult {
            synthetic_images_generated: rng.random_range(20..40),
            improvement_percent: rng.random_range(8.0..18.0),
        };

        let mut status = self.status.lock().map_err(lock_poisoned)?;
        status.total_triggers += 1;
        status.synthetic_images_generated += result.synthetic_images_generated;
        status.avg_improvement = f64::from(result.improvement_percent);

        Ok(result)
    }

    fn synthetic_images(&self) -> BackendResult<Vec<SyntheticImage>> {
        self.check_online()?;
        let status = self.status.lock().map_err(lock_poisoned)?;
        Ok((0..status.synthetic_images_generated.min(10))
            .map(|i| SyntheticImage {
                id: format!("synthetic-{}", i),
                object_class: SAFETY_CLASSES[i as usize % SAFETY_CLASSES.len()].to_string(),
                variation: "random".to_string(),
                quality_score: 0.9,
            })
            .collect())
    }

    fn generate_synthetic(&self, _object_class: &str, count: u32) -> BackendResult<u64> {
        self.check_online()?;
        let mut status = self.status.lock().map_err(lock_poisoned)?;
        status.synthetic_images_generated += u64::from(count);
        Ok(u64::from(count))
    }

    fn edge_cases(&self) -> BackendResult<Vec<EdgeCase>> {
        self.check_online()?;
        Ok(self.edge_cases.lock().map_err(lock_poisoned)?.clone())
    }

    fn add_edge_case(&self, edge_case: &NewEdgeCase) -> BackendResult<EdgeCase> {
        self.check_online()?;
        let mut edge_cases = self.edge_cases.lock().map_err(lock_poisoned)?;
        let created = EdgeCase {
            id: format!("case-{}", edge_cases.len() + 1),
            scenario: edge_case.scenario.clone(),
            object_class: edge_case.object_class.clone(),
            description: edge_case.description.clone(),
            status: "active".to_string(),
            improvement: 0.0,
        };
        edge_cases.push(created.clone());
        self.status.lock().map_err(lock_poisoned)?.total_cases += 1;
        Ok(created)
    }

    fn resolve_edge_case(&self, id: &str, improvement: f64) -> BackendResult<()> {
        self.check_online()?;
        let mut edge_cases = self.edge_cases.lock().map_err(lock_poisoned)?;
        let edge_case = edge_cases
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| format!("edge case {} not found", id))?;
        edge_case.status = "resolved".to_string();
        edge_case.improvement = improvement;
        self.status.lock().map_err(lock_poisoned)?.cases_resolved += 1;
        Ok(())
    }

    fn chat_query(&self, file_name: &str, image: Vec<u8>, query: &str) -> BackendResult<ChatAnswer> {
        self.check_online()?;
        self.logger.info(&format!(
            "Asking about {} ({} bytes): {}",
            file_name,
            image.len(),
            query
        ))?;
        Ok(safety_answer(&self.random_detections()))
    }

    fn chat_quick(&self, query: &str) -> BackendResult<ChatAnswer> {
        self.check_online()?;
        self.logger.info(&format!("Quick question: {}", query))?;
        Ok(safety_answer(&self.random_detections()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::logger::impl_console::LoggerConsole;

    fn backend() -> BackendFake {
        BackendFake::new(Arc::new(LoggerConsole::new(
            chrono::FixedOffset::east_opt(0).unwrap(),
        )))
    }

    #[test]
    fn test_offline_fails_every_call() {
        let backend = backend();
        backend.set_offline(true);

        assert!(backend.health().is_err());
        assert!(backend.detect_image("a.jpg", vec![]).is_err());
    }

    #[test]
    fn test_edge_case_lifecycle() {
        let backend = backend();
        let created = backend
            .add_edge_case(&NewEdgeCase {
                scenario: "Low light".to_string(),
                object_class: "OxygenTank".to_string(),
                description: String::new(),
            })
            .unwrap();

        backend.resolve_edge_case(&created.id, 12.0).unwrap();

        let cases = backend.edge_cases().unwrap();
        assert_eq!(cases[0].status, "resolved");
        assert_eq!(backend.falcon_status().unwrap().cases_resolved, 1);
        assert!(backend.resolve_edge_case("missing", 1.0).is_err());
    }

    #[test]
    fn test_random_detections_are_normalized() {
        let detection = backend().detect_image("a.jpg", vec![1, 2, 3]).unwrap();

        assert!(!detection.detections.is_empty());
        assert!(detection
            .detections
            .iter()
            .all(|d| d.bounding_box.0.iter().all(|v| *v <= 1.0)));
    }

    #[test]
    fn test_safety_answer_flags_low_confidence() {
        let answer = safety_answer(&[
            Detection::new("FireAlarm", 0.3, [0.1, 0.1, 0.2, 0.2]),
            Detection::new("OxygenTank", 0.9, [0.3, 0.3, 0.4, 0.4]),
        ]);

        assert_eq!(answer.is_safe, Some(false));
        assert!(answer.response.contains("Low confidence detection for: FireAlarm"));
        assert_eq!(answer.alerts.len(), 1);
        assert_eq!(answer.equipment_detected, Some(2));
    }

    #[test]
    fn test_safety_answer_counts_high_confidence() {
        let answer = safety_answer(&[
            Detection::new("FireAlarm", 0.6, [0.1, 0.1, 0.2, 0.2]),
            Detection::new("OxygenTank", 0.9, [0.3, 0.3, 0.4, 0.4]),
        ]);

        assert_eq!(answer.is_safe, Some(true));
        assert_eq!(answer.response, "SAFE: 2 equipment items detected. 1 with high confidence.");
        assert!(safety_answer(&[]).response.starts_with("No equipment detected"));
    }

    #[test]
    fn test_chat_offline() {
        let backend = backend();
        backend.set_offline(true);

        assert!(backend.chat_quick("status?").is_err());
        assert!(backend.chat_query("bay.jpg", vec![1], "status?").is_err());
    }
}
