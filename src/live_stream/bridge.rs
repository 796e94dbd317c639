use crate::config::Config;
use crate::device_camera::interface::DeviceCamera;
use crate::duplex::interface::{DuplexChannel, DuplexConnector};
use crate::library::logger::interface::Logger;
use crate::live_stream::wire::{frame_message, parse_server_message, LiveDetection, ServerMessage};
use crate::picture::Picture;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    #[default]
    Closed,
    Connecting,
    Open,
}

/// Everything the bridge reports is tagged with the session token it was
/// started with.
#[derive(Debug)]
pub enum BridgeEvent {
    Opened { token: u64 },
    FrameCaptured { token: u64, picture: Picture },
    Detection { token: u64, detection: LiveDetection },
    Closed { token: u64, error: Option<String> },
}

#[derive(Default)]
struct Inner {
    state: BridgeState,
    token: Option<u64>,
    channel: Option<Arc<dyn DuplexChannel + Send + Sync>>,
    /// Highest token passed to `stop`. Starting at or below it is refused.
    stopped_through: u64,
    camera_running: bool,
}

/// Streams camera frames to the live analyzer and hands its detections back.
#[derive(Clone)]
pub struct LiveStreamBridge {
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
    camera: Arc<dyn DeviceCamera + Send + Sync>,
    connector: Arc<dyn DuplexConnector + Send + Sync>,
    inner: Arc<Mutex<Inner>>,
}

impl LiveStreamBridge {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        camera: Arc<dyn DeviceCamera + Send + Sync>,
        connector: Arc<dyn DuplexConnector + Send + Sync>,
    ) -> Self {
        Self {
            config,
            logger: logger.with_namespace("live_stream"),
            camera,
            connector,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.inner()
            .map(|inner| inner.state)
            .unwrap_or(BridgeState::Closed)
    }

    pub fn token(&self) -> Option<u64> {
        self.inner().ok().and_then(|inner| inner.token)
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>, Box<dyn std::error::Error + Send + Sync>> {
        self.inner.lock().map_err(|_| "live stream lock poisoned".into())
    }

    fn is_current(&self, token: u64) -> bool {
        self.token() == Some(token)
    }

    /// Opens a stream for `token`, replacing any stream still running, then
    /// runs the capture loop on the calling thread until the stream stops.
    ///
    /// A token that was already stopped, or is older than the running one,
    /// never opens: the stop may have been issued before this call got to run.
    pub fn start(&self, token: u64, events: Sender<BridgeEvent>) {
        let (started, replaced) = match self.inner() {
            Ok(mut inner) => {
                if token <= inner.stopped_through
                    || inner.token.is_some_and(|current| current > token)
                {
                    let _ = self
                        .logger
                        .info(&format!("Live stream {} superseded before it started", token));
                    return;
                }

                let replaced = match inner.token {
                    Some(previous) => {
                        inner.stopped_through = inner.stopped_through.max(previous);
                        Some((previous, self.release(&mut inner)))
                    }
                    None => None,
                };

                inner.state = BridgeState::Connecting;
                inner.token = Some(token);

                // camera tracks only change while the lock is held
                let started = self.camera.start();
                inner.camera_running = started.is_ok();
                (started, replaced)
            }
            Err(e) => {
                let _ = events.send(BridgeEvent::Closed {
                    token,
                    error: Some(e.to_string()),
                });
                return;
            }
        };

        if let Some((previous, channel)) = replaced {
            let _ = self.logger.info(&format!("Replacing live stream {}", previous));
            self.close_channel(channel);
        }

        if let Err(e) = started {
            let _ = self.logger.error(&format!("Camera start failed: {}", e));
            self.abort(token, &events, format!("Camera unavailable: {}", e));
            return;
        }

        let capture = {
            let bridge = self.clone();
            let events = events.clone();
            std::thread::spawn(move || bridge.capture_loop(token, events))
        };

        let channel = match self.connector.connect(&self.config.live_stream_url) {
            Ok(channel) => channel,
            Err(e) => {
                let _ = self.logger.error(&format!("Connection failed: {}", e));
                self.abort(token, &events, format!("Live stream connection failed: {}", e));
                let _ = capture.join();
                return;
            }
        };

        let opened = match self.inner() {
            Ok(mut inner) if inner.token == Some(token) => {
                inner.state = BridgeState::Open;
                inner.channel = Some(channel.clone());
                true
            }
            _ => false,
        };

        if !opened {
            // stopped while connecting
            self.close_channel(Some(channel));
            let _ = capture.join();
            return;
        }

        let _ = self.logger.info(&format!("Live stream {} open", token));
        let _ = events.send(BridgeEvent::Opened { token });

        self.receive_loop(token, channel, &events);
        let _ = capture.join();
    }

    /// Tears down the stream started with `token`. Closes the transport,
    /// stops the camera tracks and forgets the session. A stale token is
    /// ignored, but no stream with a token up to `token` can open afterwards.
    pub fn stop(&self, token: u64) {
        let channel = match self.inner() {
            Ok(mut inner) => {
                inner.stopped_through = inner.stopped_through.max(token);
                if inner.token != Some(token) {
                    return;
                }
                self.release(&mut inner)
            }
            Err(_) => return,
        };

        let _ = self.logger.info(&format!("Stopped live stream {}", token));
        self.close_channel(channel);
    }

    /// Forgets the current session and stops the camera. Called with the
    /// lock held; the returned transport is closed by the caller.
    fn release(&self, inner: &mut Inner) -> Option<Arc<dyn DuplexChannel + Send + Sync>> {
        inner.state = BridgeState::Closed;
        inner.token = None;

        if inner.camera_running {
            inner.camera_running = false;
            if let Err(e) = self.camera.stop() {
                let _ = self.logger.error(&format!("Camera stop failed: {}", e));
            }
        }

        inner.channel.take()
    }

    fn close_channel(&self, channel: Option<Arc<dyn DuplexChannel + Send + Sync>>) {
        if let Some(channel) = channel {
            if let Err(e) = channel.close() {
                let _ = self.logger.error(&format!("Close failed: {}", e));
            }
        }
    }

    fn abort(&self, token: u64, events: &Sender<BridgeEvent>, error: String) {
        self.stop(token);
        let _ = events.send(BridgeEvent::Closed {
            token,
            error: Some(error),
        });
    }

    fn open_channel(&self, token: u64) -> Option<Arc<dyn DuplexChannel + Send + Sync>> {
        let inner = self.inner().ok()?;
        if inner.token != Some(token) || inner.state != BridgeState::Open {
            return None;
        }
        inner.channel.clone().filter(|channel| channel.is_open())
    }

    fn capture_loop(&self, token: u64, events: Sender<BridgeEvent>) {
        while self.is_current(token) {
            match self.camera.capture_frame() {
                Ok(frame) => {
                    // not open yet: skip the send, keep polling
                    if let Some(channel) = self.open_channel(token) {
                        match frame_message(&frame, self.config.jpeg_quality, token) {
                            Ok(message) => {
                                if let Err(e) = channel.send(&message) {
                                    let _ = self.logger.error(&format!("Send failed: {}", e));
                                }
                            }
                            Err(e) => {
                                let _ = self.logger.error(&format!("Encode failed: {}", e));
                            }
                        }
                    }

                    let picture = Picture::new(frame);
                    if events
                        .send(BridgeEvent::FrameCaptured { token, picture })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    if self.is_current(token) {
                        let _ = self.logger.error(&format!("Capture failed: {}", e));
                    }
                }
            }

            std::thread::sleep(self.config.frame_send_interval);
        }
    }

    fn receive_loop(
        &self,
        token: u64,
        channel: Arc<dyn DuplexChannel + Send + Sync>,
        events: &Sender<BridgeEvent>,
    ) {
        let error = loop {
            if !self.is_current(token) {
                return;
            }

            let text = match channel.recv() {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => break e.to_string(),
            };

            match parse_server_message(&text) {
                Ok(ServerMessage::Detection(detection)) => {
                    if detection.session.is_some_and(|session| session != token) {
                        let _ = self.logger.info("Dropping detection for another session");
                        continue;
                    }
                    if events
                        .send(BridgeEvent::Detection { token, detection })
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(ServerMessage::Other(_)) => {}
                Err(e) => {
                    let _ = self.logger.error(&format!("Unreadable message: {}", e));
                }
            }
        };

        // transport ended on its own; no reconnect
        if self.is_current(token) {
            let _ = self.logger.error(&format!("Live stream {} closed: {}", token, error));
            self.stop(token);
            let _ = events.send(BridgeEvent::Closed {
                token,
                error: Some(format!("Live stream closed: {}", error)),
            });
        }
    }
}
