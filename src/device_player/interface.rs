use std::path::Path;
use std::sync::mpsc::Receiver;

pub type PlayerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEventKind {
    LoadedData,
    Play,
    Pause,
    TimeUpdate,
    Seeked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaEvent {
    pub kind: MediaEventKind,
    /// Playback position in seconds.
    pub current_time: f64,
}

/// Playback clock of the loaded video.
pub trait DevicePlayer {
    /// Replaces the loaded media. The returned channel carries this media's
    /// events until the next `load` or `close`.
    fn load(&self, path: &Path) -> PlayerResult<Receiver<MediaEvent>>;

    fn play(&self) -> PlayerResult<()>;

    fn pause(&self) -> PlayerResult<()>;

    fn seek(&self, seconds: f64) -> PlayerResult<()>;

    fn close(&self) -> PlayerResult<()>;
}
