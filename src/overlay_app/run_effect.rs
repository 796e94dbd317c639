use crate::backend::interface::Backend;
use crate::config::Config;
use crate::device_display::interface::DeviceDisplay;
use crate::device_player::interface::DevicePlayer;
use crate::library::logger::interface::Logger;
use crate::live_stream::bridge::{BridgeEvent, LiveStreamBridge};
use crate::overlay_app::core::{Effect, Event, PlayerCommand};
use crate::picture::Picture;
use std::path::Path;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct RunEffect {
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
    backend: Arc<dyn Backend + Send + Sync>,
    device_player: Arc<dyn DevicePlayer + Send + Sync>,
    device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
    live_stream: LiveStreamBridge,
    event_sender: Sender<Event>,
}

impl RunEffect {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        backend: Arc<dyn Backend + Send + Sync>,
        device_player: Arc<dyn DevicePlayer + Send + Sync>,
        device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
        live_stream: LiveStreamBridge,
        event_sender: Sender<Event>,
    ) -> Self {
        Self {
            config,
            logger: logger.with_namespace("effect"),
            backend,
            device_player,
            device_display,
            live_stream,
            event_sender,
        }
    }

    fn send(&self, event: Event) {
        let _ = self.event_sender.send(event);
    }

    /// Runs one effect. Media effects return once the device has been
    /// acquired or released; their event streams continue on threads.
    pub fn run_effect(&self, effect: Effect) {
        let _ = self.logger.info(&format!("Running effect: {:?}", effect));

        match effect {
            Effect::SubscribeTick => loop {
                std::thread::sleep(self.config.health_poll_rate);
                if self.event_sender.send(Event::HealthTick).is_err() {
                    break;
                }
            },
            Effect::SubscribeToDisplayInput => {
                let inputs = match self.device_display.lock() {
                    Ok(mut device_display) => device_display.inputs(),
                    Err(_) => Err("display lock poisoned".into()),
                };
                let inputs = match inputs {
                    Ok(inputs) => inputs,
                    Err(e) => {
                        let _ = self.logger.error(&format!("No display input: {}", e));
                        return;
                    }
                };
                for input in inputs {
                    if self.event_sender.send(Event::from(input)).is_err() {
                        break;
                    }
                }
            }
            Effect::DecodeImage { generation, path } => {
                let result = image::open(&path)
                    .map(Picture::new)
                    .map_err(|e| e.into());
                self.send(Event::ImageDecoded { generation, result });
            }
            Effect::DetectImage { generation, path } => {
                let result = read_file(&path)
                    .and_then(|(file_name, bytes)| self.backend.detect_image(&file_name, bytes));
                self.send(Event::ImageDetectDone { generation, result });
            }
            Effect::OpenVideo { generation, path } => match self.device_player.load(&path) {
                Ok(media_events) => {
                    let event_sender = self.event_sender.clone();
                    std::thread::spawn(move || {
                        for event in media_events {
                            if event_sender.send(Event::Media { generation, event }).is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => self.send(Event::VideoOpenFailed {
                    generation,
                    error: e.to_string(),
                }),
            },
            Effect::AnalyzeVideo { generation, path } => {
                let result = self.backend.analyze_video(&path);
                self.send(Event::VideoAnalyzeDone { generation, result });
            }
            Effect::ControlPlayer(command) => {
                let result = match command {
                    PlayerCommand::Play => self.device_player.play(),
                    PlayerCommand::Pause => self.device_player.pause(),
                    PlayerCommand::Seek(seconds) => self.device_player.seek(seconds),
                };
                if let Err(e) = result {
                    let _ = self.logger.error(&format!("Player command failed: {}", e));
                }
            }
            Effect::CloseVideo => {
                if let Err(e) = self.device_player.close() {
                    let _ = self.logger.error(&format!("Player close failed: {}", e));
                }
            }
            Effect::OpenLiveStream { token } => {
                let (bridge_sender, bridge_events) = channel();
                let event_sender = self.event_sender.clone();
                std::thread::spawn(move || {
                    for event in bridge_events {
                        if event_sender.send(Event::from(event)).is_err() {
                            break;
                        }
                    }
                });
                let live_stream = self.live_stream.clone();
                std::thread::spawn(move || live_stream.start(token, bridge_sender));
            }
            Effect::CloseLiveStream { token } => self.live_stream.stop(token),
            Effect::CheckHealth => {
                let result = self.backend.health();
                self.send(Event::HealthDone(result));
            }
            Effect::RunHealing {
                generation,
                object_class,
            } => {
                let result = self.backend.run_healing(&object_class);
                self.send(Event::HealingDone {
                    generation,
                    object_class,
                    result,
                });
            }
            Effect::FetchFalconStatus => {
                let result = self.backend.falcon_status();
                self.send(Event::FalconStatusDone(result));
            }
            Effect::AskChat {
                id,
                question,
                image,
            } => {
                let result = match image {
                    Some(path) => read_file(&path).and_then(|(file_name, bytes)| {
                        self.backend.chat_query(&file_name, bytes, &question)
                    }),
                    None => self.backend.chat_quick(&question),
                };
                self.send(Event::ChatDone { id, result });
            }
        }
    }
}

impl From<BridgeEvent> for Event {
    fn from(event: BridgeEvent) -> Self {
        match event {
            BridgeEvent::Opened { token } => Event::LiveStreamOpened { token },
            BridgeEvent::FrameCaptured { token, picture } => {
                Event::LiveFrameCaptured { token, picture }
            }
            BridgeEvent::Detection { token, detection } => {
                Event::LiveDetection { token, detection }
            }
            BridgeEvent::Closed { token, error } => Event::LiveStreamClosed { token, error },
        }
    }
}

fn read_file(
    path: &Path,
) -> Result<(String, Vec<u8>), Box<dyn std::error::Error + Send + Sync>> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok((file_name, bytes))
}
