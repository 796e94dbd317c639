use crate::annotation_store::{FrameAnnotationMap, LiveAnnotationSlot, ResolvedFrame};
use crate::backend::interface::{
    ChatAnswer, FalconStatus, HealingResult, HealthStatus, ImageDetection, VideoAnalysis,
};
use crate::config::{Config, HealingConfig, MediaSize};
use crate::detection::{average_confidence, Detection};
use crate::device_display::interface::DisplayInput;
use crate::device_player::interface::{MediaEvent, MediaEventKind};
use crate::live_stream::bridge::BridgeState;
use crate::live_stream::wire::LiveDetection;
use crate::picture::Picture;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum Request<T> {
    Pending,
    Ready(T),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetrics {
    pub latency_ms: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageSession {
    pub path: PathBuf,
    pub picture: Option<Picture>,
    pub detection: Request<ImageMetrics>,
    pub detections: Vec<Detection>,
}

impl ImageSession {
    pub fn media_size(&self, config: &Config) -> MediaSize {
        self.picture
            .as_ref()
            .map(Picture::size)
            .unwrap_or(config.default_media_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetrics {
    pub processed_frames: u32,
    pub avg_latency_ms: f64,
    pub avg_confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSession {
    pub path: PathBuf,
    pub fps: f64,
    pub media_size: MediaSize,
    pub annotations: FrameAnnotationMap,
    pub analysis: Request<VideoMetrics>,
    pub current_time: f64,
    pub playing: bool,
    pub resolved: Option<ResolvedFrame>,
}

impl VideoSession {
    pub fn detections(&self) -> &[Detection] {
        self.resolved
            .and_then(|resolved| self.annotations.get(resolved.frame))
            .unwrap_or(&[])
    }

    fn resolve(&mut self) {
        self.resolved = self.annotations.resolve_time(self.current_time, self.fps);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveSession {
    pub token: u64,
    pub bridge: BridgeState,
    pub picture: Option<Picture>,
    pub annotations: LiveAnnotationSlot,
    pub latency_ms: f64,
    pub fps: f64,
    pub frames_captured: u64,
}

/// The one media source on screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackSession {
    #[default]
    Idle,
    Image(ImageSession),
    Video(VideoSession),
    LiveStream(LiveSession),
}

impl PlaybackSession {
    pub fn detections(&self) -> &[Detection] {
        match self {
            PlaybackSession::Idle => &[],
            PlaybackSession::Image(image) => &image.detections,
            PlaybackSession::Video(video) => video.detections(),
            PlaybackSession::LiveStream(live) => live.annotations.latest(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HealthState {
    #[default]
    Unknown,
    Online(HealthStatus),
    Offline(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HealingState {
    #[default]
    Idle,
    Running {
        object_class: String,
    },
    Healed {
        object_class: String,
        synthetic_images: u64,
        improvement_percent: f32,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogConfidence {
    Percent(u32),
    NotAvailable,
    Boosted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub objects: usize,
    pub confidence: LogConfidence,
    pub falcon: bool,
    pub healed: bool,
}

/// One question to the safety assistant and its answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    pub id: u64,
    pub question: String,
    pub answer: Request<ChatAnswer>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub session: PlaybackSession,
    pub generation: u64,
    pub health: HealthState,
    pub healing: HealingState,
    pub falcon_status: Option<FalconStatus>,
    pub falcon_notice: Option<String>,
    pub detection_notice: Option<String>,
    pub log: Vec<LogEntry>,
    /// Oldest first.
    pub chat: Vec<ChatExchange>,
    pub chat_asked: u64,
    pub chat_notice: Option<String>,
    pub exiting: bool,
}

impl Model {
    pub fn to_display_string(&self) -> String {
        let session = match &self.session {
            PlaybackSession::Idle => "Idle".to_string(),
            PlaybackSession::Image(image) => format!(
                "Image {{ path: {:?}, picture: {:?}, detection: {:?}, detections: {} }}",
                image.path,
                image.picture,
                image.detection,
                image.detections.len()
            ),
            PlaybackSession::Video(video) => format!(
                "Video {{ path: {:?}, fps: {}, frames: {}, analysis: {:?}, time: {:.2}, playing: {}, resolved: {:?} }}",
                video.path,
                video.fps,
                video.annotations.len(),
                video.analysis,
                video.current_time,
                video.playing,
                video.resolved
            ),
            PlaybackSession::LiveStream(live) => format!(
                "LiveStream {{ token: {}, bridge: {:?}, detections: {}, frames: {} }}",
                live.token,
                live.bridge,
                live.annotations.latest().len(),
                live.frames_captured
            ),
        };
        format!(
            "{} generation={} health={:?} healing={:?} log={} chat={}",
            session,
            self.generation,
            self.health,
            self.healing,
            self.log.len(),
            self.chat.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Seek(f64),
}

#[derive(Debug)]
pub enum Event {
    LoadImage(PathBuf),
    LoadVideo(PathBuf),
    StartLiveStream,
    StopLiveStream,
    Play,
    Pause,
    Seek(f64),
    Heal,
    RefreshFalconStatus,
    Ask(String),
    Quit,
    HealthTick,
    HealthDone(Result<HealthStatus, Error>),
    ImageDecoded {
        generation: u64,
        result: Result<Picture, Error>,
    },
    ImageDetectDone {
        generation: u64,
        result: Result<ImageDetection, Error>,
    },
    VideoOpenFailed {
        generation: u64,
        error: String,
    },
    VideoAnalyzeDone {
        generation: u64,
        result: Result<VideoAnalysis, Error>,
    },
    Media {
        generation: u64,
        event: MediaEvent,
    },
    LiveStreamOpened {
        token: u64,
    },
    LiveFrameCaptured {
        token: u64,
        picture: Picture,
    },
    LiveDetection {
        token: u64,
        detection: LiveDetection,
    },
    LiveStreamClosed {
        token: u64,
        error: Option<String>,
    },
    HealingDone {
        generation: u64,
        object_class: String,
        result: Result<HealingResult, Error>,
    },
    FalconStatusDone(Result<FalconStatus, Error>),
    ChatDone {
        id: u64,
        result: Result<ChatAnswer, Error>,
    },
}

impl Event {
    pub fn to_display_string(&self) -> String {
        match self {
            Event::VideoAnalyzeDone {
                generation,
                result: Ok(analysis),
            } => format!(
                "VideoAnalyzeDone {{ generation: {}, frames: {} }}",
                generation,
                analysis.frames.len()
            ),
            event => format!("{:?}", event),
        }
    }
}

impl From<DisplayInput> for Event {
    fn from(input: DisplayInput) -> Self {
        match input {
            DisplayInput::LoadImage(path) => Event::LoadImage(path),
            DisplayInput::LoadVideo(path) => Event::LoadVideo(path),
            DisplayInput::StartLiveStream => Event::StartLiveStream,
            DisplayInput::StopLiveStream => Event::StopLiveStream,
            DisplayInput::Play => Event::Play,
            DisplayInput::Pause => Event::Pause,
            DisplayInput::Seek(seconds) => Event::Seek(seconds),
            DisplayInput::Heal => Event::Heal,
            DisplayInput::RefreshFalconStatus => Event::RefreshFalconStatus,
            DisplayInput::Ask(question) => Event::Ask(question),
            DisplayInput::Quit => Event::Quit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SubscribeTick,
    SubscribeToDisplayInput,
    DecodeImage { generation: u64, path: PathBuf },
    DetectImage { generation: u64, path: PathBuf },
    OpenVideo { generation: u64, path: PathBuf },
    AnalyzeVideo { generation: u64, path: PathBuf },
    ControlPlayer(PlayerCommand),
    CloseVideo,
    OpenLiveStream { token: u64 },
    CloseLiveStream { token: u64 },
    CheckHealth,
    RunHealing { generation: u64, object_class: String },
    FetchFalconStatus,
    /// Asks about the still image when one is loaded, else a quick question.
    AskChat { id: u64, question: String, image: Option<PathBuf> },
}

impl Effect {
    /// Effects that run for the lifetime of the session.
    pub fn is_subscription(&self) -> bool {
        matches!(self, Effect::SubscribeTick | Effect::SubscribeToDisplayInput)
    }

    /// Effects that acquire or release the player or the camera. These run
    /// one at a time in the order they were emitted.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Effect::OpenVideo { .. }
                | Effect::ControlPlayer(_)
                | Effect::CloseVideo
                | Effect::OpenLiveStream { .. }
                | Effect::CloseLiveStream { .. }
        )
    }
}

pub fn init() -> (Model, Vec<Effect>) {
    (
        Model::default(),
        vec![
            Effect::SubscribeToDisplayInput,
            Effect::SubscribeTick,
            Effect::CheckHealth,
            Effect::FetchFalconStatus,
        ],
    )
}

/// Effects that release whatever the current source holds.
fn teardown(session: &PlaybackSession) -> Vec<Effect> {
    match session {
        PlaybackSession::LiveStream(live) => vec![Effect::CloseLiveStream { token: live.token }],
        PlaybackSession::Video(_) => vec![Effect::CloseVideo],
        PlaybackSession::Idle | PlaybackSession::Image(_) => vec![],
    }
}

/// Swaps in a new source under a fresh generation.
fn replace_source(model: &mut Model, session: impl FnOnce(u64) -> PlaybackSession) -> Vec<Effect> {
    let effects = teardown(&model.session);
    model.generation += 1;
    model.session = session(model.generation);
    model.detection_notice = None;
    effects
}

/// Class to heal: the weakest detection inside the trigger band, else the
/// configured default.
pub fn healing_class(detections: &[Detection], config: &HealingConfig) -> String {
    detections
        .iter()
        .filter(|d| {
            d.confidence > config.trigger_min_confidence
                && d.confidence < config.trigger_max_confidence
        })
        .min_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|d| d.class_label.clone())
        .unwrap_or_else(|| config.default_class.clone())
}

fn start_healing(config: &Config, model: &mut Model) -> Vec<Effect> {
    if matches!(model.healing, HealingState::Running { .. }) {
        return vec![];
    }
    let object_class = healing_class(model.session.detections(), &config.healing);
    model.healing = HealingState::Running {
        object_class: object_class.clone(),
    };
    vec![Effect::RunHealing {
        generation: model.generation,
        object_class,
    }]
}

fn push_log(config: &Config, model: &mut Model, entry: LogEntry) {
    model.log.insert(0, entry);
    model.log.truncate(config.log_capacity);
}

fn detection_log_entry(detections: &[Detection], falcon: bool) -> LogEntry {
    LogEntry {
        time: Utc::now(),
        objects: detections.len(),
        confidence: detections
            .first()
            .map(|d| LogConfidence::Percent(d.confidence_percent()))
            .unwrap_or(LogConfidence::NotAvailable),
        falcon,
        healed: false,
    }
}

/// Boosts every detection of `object_class` in the current source.
fn apply_healing(config: &Config, session: &mut PlaybackSession, object_class: &str) {
    let heal = |d: &Detection| {
        if d.class_label == object_class {
            d.boosted(config.healing.confidence_boost, config.healing.confidence_cap)
        } else {
            d.clone()
        }
    };

    match session {
        PlaybackSession::Idle => {}
        PlaybackSession::Image(image) => {
            image.detections = image.detections.iter().map(heal).collect();
        }
        PlaybackSession::Video(video) => {
            video.annotations = video.annotations.map_detections(heal);
        }
        PlaybackSession::LiveStream(live) => {
            let healed = live.annotations.latest().iter().map(heal).collect();
            live.annotations.latest_for_live_stream(healed);
        }
    }
}

fn ask(config: &Config, model: &mut Model, question: String) -> Vec<Effect> {
    let question = question.trim().to_string();
    if question.is_empty() {
        return vec![];
    }

    model.chat_asked += 1;
    let id = model.chat_asked;
    let image = match &model.session {
        PlaybackSession::Image(image) => Some(image.path.clone()),
        _ => None,
    };

    model.chat.push(ChatExchange {
        id,
        question: question.clone(),
        answer: Request::Pending,
    });
    let overflow = model.chat.len().saturating_sub(config.chat_capacity);
    model.chat.drain(..overflow);

    vec![Effect::AskChat {
        id,
        question,
        image,
    }]
}

pub fn transition(config: &Config, model: Model, event: Event) -> (Model, Vec<Effect>) {
    let mut model = model;

    let effects = match event {
        // Operator commands
        Event::LoadImage(path) => {
            let mut effects = replace_source(&mut model, |_| {
                PlaybackSession::Image(ImageSession {
                    path: path.clone(),
                    picture: None,
                    detection: Request::Pending,
                    detections: vec![],
                })
            });
            effects.push(Effect::DecodeImage {
                generation: model.generation,
                path: path.clone(),
            });
            effects.push(Effect::DetectImage {
                generation: model.generation,
                path,
            });
            effects
        }
        Event::LoadVideo(path) => {
            let mut effects = replace_source(&mut model, |_| {
                PlaybackSession::Video(VideoSession {
                    path: path.clone(),
                    fps: config.default_fps,
                    media_size: config.default_media_size,
                    annotations: FrameAnnotationMap::default(),
                    analysis: Request::Pending,
                    current_time: 0.0,
                    playing: false,
                    resolved: None,
                })
            });
            effects.push(Effect::OpenVideo {
                generation: model.generation,
                path: path.clone(),
            });
            effects.push(Effect::AnalyzeVideo {
                generation: model.generation,
                path,
            });
            effects
        }
        Event::StartLiveStream => {
            if matches!(model.session, PlaybackSession::LiveStream(_)) {
                vec![]
            } else {
                let mut effects = replace_source(&mut model, |token| {
                    PlaybackSession::LiveStream(LiveSession {
                        token,
                        bridge: BridgeState::Connecting,
                        picture: None,
                        annotations: LiveAnnotationSlot::default(),
                        latency_ms: 0.0,
                        fps: 0.0,
                        frames_captured: 0,
                    })
                });
                effects.push(Effect::OpenLiveStream {
                    token: model.generation,
                });
                effects
            }
        }
        Event::StopLiveStream => match &model.session {
            PlaybackSession::LiveStream(live) => {
                let token = live.token;
                model.session = PlaybackSession::Idle;
                vec![Effect::CloseLiveStream { token }]
            }
            _ => vec![],
        },
        Event::Play => match &model.session {
            PlaybackSession::Video(_) => vec![Effect::ControlPlayer(PlayerCommand::Play)],
            _ => vec![],
        },
        Event::Pause => match &model.session {
            PlaybackSession::Video(_) => vec![Effect::ControlPlayer(PlayerCommand::Pause)],
            _ => vec![],
        },
        Event::Seek(seconds) => match &model.session {
            PlaybackSession::Video(_) if seconds.is_finite() => {
                vec![Effect::ControlPlayer(PlayerCommand::Seek(seconds.max(0.0)))]
            }
            _ => vec![],
        },
        Event::Heal => start_healing(config, &mut model),
        Event::RefreshFalconStatus => vec![Effect::FetchFalconStatus],
        Event::Ask(question) => ask(config, &mut model, question),
        Event::Quit => {
            model.exiting = true;
            let effects = teardown(&model.session);
            model.session = PlaybackSession::Idle;
            effects
        }

        // Health polling
        Event::HealthTick => vec![Effect::CheckHealth],
        Event::HealthDone(result) => {
            model.health = match result {
                Ok(status) => HealthState::Online(status),
                Err(e) => HealthState::Offline(e.to_string()),
            };
            vec![]
        }

        // Image source
        Event::ImageDecoded { generation, result } => {
            if generation == model.generation {
                if let PlaybackSession::Image(image) = &mut model.session {
                    match result {
                        Ok(picture) => image.picture = Some(picture),
                        Err(e) => {
                            model.detection_notice = Some(format!("Could not read image: {}", e))
                        }
                    }
                }
            }
            vec![]
        }
        Event::ImageDetectDone { generation, result } => {
            let current = generation == model.generation;
            match &mut model.session {
                PlaybackSession::Image(image) if current => match result {
                    Ok(detection) => {
                        image.detection = Request::Ready(ImageMetrics {
                            latency_ms: detection.latency_ms,
                            count: detection.count,
                        });
                        image.detections = detection.detections;
                        let entry =
                            detection_log_entry(&image.detections, detection.falcon_trigger);
                        push_log(config, &mut model, entry);

                        if detection.falcon_trigger {
                            start_healing(config, &mut model)
                        } else {
                            vec![]
                        }
                    }
                    Err(e) => {
                        image.detection = Request::Failed(e.to_string());
                        model.detection_notice = Some(format!("Detection failed: {}", e));
                        vec![]
                    }
                },
                _ => vec![],
            }
        }

        // Video source
        Event::VideoOpenFailed { generation, error } => {
            if generation == model.generation && matches!(model.session, PlaybackSession::Video(_))
            {
                model.detection_notice = Some(format!("Could not open video: {}", error));
            }
            vec![]
        }
        Event::VideoAnalyzeDone { generation, result } => {
            let current = generation == model.generation;
            match &mut model.session {
                PlaybackSession::Video(video) if current => match result {
                    Ok(analysis) => {
                        video.fps = analysis
                            .fps
                            .filter(|fps| fps.is_finite() && *fps > 0.0)
                            .unwrap_or(config.default_fps);
                        video.media_size = analysis.media_size.unwrap_or(config.default_media_size);
                        video.analysis = Request::Ready(VideoMetrics {
                            processed_frames: analysis.processed_frames,
                            avg_latency_ms: analysis.avg_latency_ms,
                            avg_confidence: analysis.avg_confidence,
                        });
                        video.annotations = FrameAnnotationMap::load(analysis.frames);
                        // first draw without waiting for playback
                        video.resolve();

                        let all: Vec<Detection> = video.annotations.all_detections().cloned().collect();
                        let entry = LogEntry {
                            time: Utc::now(),
                            objects: all.len(),
                            confidence: if all.is_empty() {
                                LogConfidence::NotAvailable
                            } else {
                                LogConfidence::Percent(
                                    (average_confidence(&all) * 100.0).round() as u32
                                )
                            },
                            falcon: analysis.falcon_triggered,
                            healed: false,
                        };
                        push_log(config, &mut model, entry);

                        if analysis.falcon_triggered {
                            start_healing(config, &mut model)
                        } else {
                            vec![]
                        }
                    }
                    Err(e) => {
                        video.analysis = Request::Failed(e.to_string());
                        model.detection_notice = Some(format!("Video analysis failed: {}", e));
                        vec![]
                    }
                },
                _ => vec![],
            }
        }
        Event::Media { generation, event } => {
            if generation == model.generation {
                if let PlaybackSession::Video(video) = &mut model.session {
                    video.current_time = event.current_time.max(0.0);
                    match event.kind {
                        MediaEventKind::Play => video.playing = true,
                        MediaEventKind::Pause => video.playing = false,
                        MediaEventKind::LoadedData
                        | MediaEventKind::TimeUpdate
                        | MediaEventKind::Seeked => {}
                    }
                    video.resolve();
                }
            }
            vec![]
        }

        // Live source
        Event::LiveStreamOpened { token } => {
            if let PlaybackSession::LiveStream(live) = &mut model.session {
                if live.token == token {
                    live.bridge = BridgeState::Open;
                }
            }
            vec![]
        }
        Event::LiveFrameCaptured { token, picture } => {
            if let PlaybackSession::LiveStream(live) = &mut model.session {
                if live.token == token {
                    live.picture = Some(picture);
                    live.frames_captured += 1;
                }
            }
            vec![]
        }
        Event::LiveDetection { token, detection } => match &mut model.session {
            PlaybackSession::LiveStream(live) if live.token == token => {
                live.latency_ms = detection.latency_ms;
                live.fps = detection.fps;
                live.annotations
                    .latest_for_live_stream(detection.detections);
                let entry =
                    detection_log_entry(live.annotations.latest(), detection.falcon_trigger);
                push_log(config, &mut model, entry);

                if detection.falcon_trigger {
                    start_healing(config, &mut model)
                } else {
                    vec![]
                }
            }
            _ => vec![],
        },
        Event::LiveStreamClosed { token, error } => {
            if matches!(&model.session, PlaybackSession::LiveStream(live) if live.token == token) {
                model.session = PlaybackSession::Idle;
                model.detection_notice =
                    Some(error.unwrap_or_else(|| "Live stream closed".to_string()));
            }
            vec![]
        }

        // Self-healing
        Event::HealingDone {
            generation,
            object_class,
            result,
        } => match result {
            Ok(result) => {
                if generation == model.generation {
                    apply_healing(config, &mut model.session, &object_class);
                }
                model.healing = HealingState::Healed {
                    object_class,
                    synthetic_images: result.synthetic_images_generated,
                    improvement_percent: result.improvement_percent,
                };
                let objects = model.session.detections().len();
                push_log(
                    config,
                    &mut model,
                    LogEntry {
                        time: Utc::now(),
                        objects,
                        confidence: LogConfidence::Boosted,
                        falcon: true,
                        healed: true,
                    },
                );
                vec![Effect::FetchFalconStatus]
            }
            Err(e) => {
                model.healing = HealingState::Failed(e.to_string());
                vec![]
            }
        },
        Event::FalconStatusDone(result) => {
            match result {
                Ok(status) => {
                    model.falcon_status = Some(status);
                    model.falcon_notice = None;
                }
                Err(e) => model.falcon_notice = Some(format!("Falcon status unavailable: {}", e)),
            }
            vec![]
        }

        // Safety assistant
        Event::ChatDone { id, result } => {
            let answer = match result {
                Ok(answer) => {
                    model.chat_notice = None;
                    Request::Ready(answer)
                }
                Err(e) => {
                    model.chat_notice = Some(format!("Assistant unavailable: {}", e));
                    Request::Failed(e.to_string())
                }
            };
            if let Some(exchange) = model.chat.iter_mut().find(|exchange| exchange.id == id) {
                exchange.answer = answer;
            }
            vec![]
        }
    };

    (model, effects)
}
