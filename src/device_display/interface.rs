use crate::config::MediaSize;
use crate::detection::Detection;
use crate::picture::Picture;
use std::error::Error;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

/// What the media area shows: a picture (or a blank rect of the intrinsic
/// size when there is none) with the overlay's detections.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaView {
    pub intrinsic: MediaSize,
    pub picture: Option<Picture>,
    pub detections: Vec<Detection>,
}

/// One rendered state of the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFrame {
    pub source: String,
    pub media: Option<MediaView>,
    pub metrics: Vec<String>,
    pub health: String,
    pub healing: String,
    pub falcon: Vec<String>,
    pub notices: Vec<String>,
    pub log: Vec<String>,
    pub chat: Vec<String>,
    pub exiting: bool,
}

/// Operator commands coming from the display.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayInput {
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
}

impl DisplayInput {
    /// Parses a console command such as `seek 2.5` or `video clip.mp4`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        let path = |argument: &str| {
            if argument.is_empty() {
                Err(format!("{} needs a path", command))
            } else {
                Ok(PathBuf::from(argument))
            }
        };

        match command.to_ascii_lowercase().as_str() {
            "image" => path(argument).map(DisplayInput::LoadImage),
            "video" => path(argument).map(DisplayInput::LoadVideo),
            "live" => Ok(DisplayInput::StartLiveStream),
            "stop" => Ok(DisplayInput::StopLiveStream),
            "play" => Ok(DisplayInput::Play),
            "pause" => Ok(DisplayInput::Pause),
            "seek" => argument
                .parse::<f64>()
                .ok()
                .filter(|seconds| seconds.is_finite())
                .map(DisplayInput::Seek)
                .ok_or_else(|| format!("seek needs seconds, got {:?}", argument)),
            "heal" => Ok(DisplayInput::Heal),
            "falcon" | "status" => Ok(DisplayInput::RefreshFalconStatus),
            "ask" if argument.is_empty() => Err("ask needs a question".to_string()),
            "ask" => Ok(DisplayInput::Ask(argument.to_string())),
            "quit" | "exit" | "q" => Ok(DisplayInput::Quit),
            other => Err(format!("unknown command {:?}", other)),
        }
    }
}

pub trait DeviceDisplay: Send + Sync {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Operator input stream. Only the first caller gets a live receiver.
    fn inputs(&mut self) -> Result<Receiver<DisplayInput>, Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(DisplayInput::parse("play"), Ok(DisplayInput::Play));
        assert_eq!(DisplayInput::parse("  seek 2.5 "), Ok(DisplayInput::Seek(2.5)));
        assert_eq!(
            DisplayInput::parse("video /tmp/my clip.mp4"),
            Ok(DisplayInput::LoadVideo(PathBuf::from("/tmp/my clip.mp4")))
        );
        assert_eq!(DisplayInput::parse("QUIT"), Ok(DisplayInput::Quit));
        assert_eq!(
            DisplayInput::parse("ask is the fire alarm visible?"),
            Ok(DisplayInput::Ask("is the fire alarm visible?".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(DisplayInput::parse("seek soon").is_err());
        assert!(DisplayInput::parse("image").is_err());
        assert!(DisplayInput::parse("ask  ").is_err());
        assert!(DisplayInput::parse("dance").is_err());
    }
}
