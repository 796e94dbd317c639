use crate::backend::interface::{
    Backend, BackendResult, ChatAnswer, EdgeCase, FalconStatus, HealingResult, HealthStatus,
    ImageDetection, NewEdgeCase, SyntheticImage, VideoAnalysis,
};
use crate::backend::wire::{
    chat_answer_from_json, healing_result_from_json, image_detection_from_json,
    video_analysis_from_json,
};
use crate::config::Config;
use crate::library::logger::interface::Logger;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub struct BackendHttp {
    client: Client,
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl BackendHttp {
    pub fn new(config: Config, logger: Arc<dyn Logger + Send + Sync>) -> BackendResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            config,
            logger: logger.with_namespace("backend").with_namespace("http"),
        })
    }

    fn get(&self, path: &str) -> BackendResult<Value> {
        let url = self.config.endpoint(path);
        self.logger.info(&format!("GET {}", url))?;
        let response = self.client.get(&url).send()?.error_for_status()?;
        Ok(response.json::<Value>()?)
    }

    fn post_json(&self, path: &str, body: &Value) -> BackendResult<Value> {
        let url = self.config.endpoint(path);
        self.logger.info(&format!("POST {}", url))?;
        let response = self.client.post(&url).json(body).send()?.error_for_status()?;
        Ok(response.json::<Value>()?)
    }

    fn post_file(
        &self,
        path: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
        fields: &[(&str, &str)],
    ) -> BackendResult<Value> {
        let url = self.config.endpoint(path);
        self.logger
            .info(&format!("POST {} ({}, {} bytes)", url, file_name, bytes.len()))?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = fields
            .iter()
            .fold(multipart::Form::new().part("file", part), |form, (name, value)| {
                form.text(name.to_string(), value.to_string())
            });

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()?
            .error_for_status()?;
        Ok(response.json::<Value>()?)
    }
}

#[derive(Deserialize)]
struct SyntheticImages {
    #[serde(default)]
    images: Vec<SyntheticImage>,
}

#[derive(Deserialize)]
struct EdgeCases {
    #[serde(default)]
    edge_cases: Vec<EdgeCase>,
}

impl Backend for BackendHttp {
    fn health(&self) -> BackendResult<HealthStatus> {
        Ok(serde_json::from_value(self.get("/system/health")?)?)
    }

    fn detect_image(&self, file_name: &str, image: Vec<u8>) -> BackendResult<ImageDetection> {
        let body = self.post_file("/detect/fusion", file_name, mime_for(file_name), image, &[])?;
        Ok(image_detection_from_json(&body))
    }

    fn analyze_video(&self, path: &Path) -> BackendResult<VideoAnalysis> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());
        let body = self.post_file("/detect/video", &file_name, mime_for(&file_name), bytes, &[])?;
        Ok(video_analysis_from_json(&body))
    }

    fn falcon_status(&self) -> BackendResult<FalconStatus> {
        Ok(serde_json::from_value(self.get("/falcon/status")?)?)
    }

    fn run_healing(&self, object_class: &str) -> BackendResult<HealingResult> {
        let body = self.post_json(
            "/falcon/run-healing",
            &json!({ "object_class": object_class }),
        )?;
        Ok(healing_result_from_json(&body))
    }

    fn synthetic_images(&self) -> BackendResult<Vec<SyntheticImage>> {
        let body: SyntheticImages = serde_json::from_value(self.get("/falcon/synthetic-images")?)?;
        Ok(body.images)
    }

    fn generate_synthetic(&self, object_class: &str, count: u32) -> BackendResult<u64> {
        let body = self.post_json(
            "/falcon/generate",
            &json!({ "object_class": object_class, "count": count, "variation": "random" }),
        )?;
        Ok(body
            .get("generated")
            .or_else(|| body.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(count)))
    }

    fn edge_cases(&self) -> BackendResult<Vec<EdgeCase>> {
        let body: EdgeCases = serde_json::from_value(self.get("/falcon/edge-cases")?)?;
        Ok(body.edge_cases)
    }

    fn add_edge_case(&self, edge_case: &NewEdgeCase) -> BackendResult<EdgeCase> {
        let body = self.post_json(
            "/falcon/edge-cases",
            &json!({
                "scenario": edge_case.scenario,
                "object_class": edge_case.object_class,
                "description": edge_case.description,
            }),
        )?;
        let created = body.get("edge_case").cloned().unwrap_or(body);
        Ok(serde_json::from_value(created)?)
    }

    fn resolve_edge_case(&self, id: &str, improvement: f64) -> BackendResult<()> {
        self.post_json(
            &format!("/falcon/edge-cases/{}/resolve", id),
            &json!({ "improvement": improvement }),
        )?;
        Ok(())
    }

    fn chat_query(&self, file_name: &str, image: Vec<u8>, query: &str) -> BackendResult<ChatAnswer> {
        let body = self.post_file(
            "/chat/safety",
            file_name,
            mime_for(file_name),
            image,
            &[("query", query)],
        )?;
        Ok(chat_answer_from_json(&body))
    }

    fn chat_quick(&self, query: &str) -> BackendResult<ChatAnswer> {
        let body = self.post_json("/chat/quick", &json!({ "query": query }))?;
        Ok(chat_answer_from_json(&body))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("frame.JPG"), "image/jpeg");
        assert_eq!(mime_for("clip.mp4"), "video/mp4");
        assert_eq!(mime_for("noextension"), "application/octet-stream");
    }
}
