use crate::device_player::interface::{DevicePlayer, MediaEvent, MediaEventKind, PlayerResult};
use crate::library::logger::interface::Logger;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Clock {
    load_id: u64,
    sender: Option<Sender<MediaEvent>>,
    position: f64,
    playing_since: Option<Instant>,
}

impl Clock {
    fn current_time(&self) -> f64 {
        self.position
            + self
                .playing_since
                .map(|since| since.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }

    fn emit(&mut self, kind: MediaEventKind) {
        let event = MediaEvent {
            kind,
            current_time: self.current_time(),
        };
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                self.sender = None;
            }
        }
    }
}

/// Wall-clock media timeline. Emits `TimeUpdate` every `tick_rate` while
/// playing; no frames are decoded.
pub struct DevicePlayerClock {
    logger: Arc<dyn Logger + Send + Sync>,
    tick_rate: Duration,
    clock: Arc<Mutex<Clock>>,
}

impl DevicePlayerClock {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>, tick_rate: Duration) -> Self {
        Self {
            logger: logger.with_namespace("player").with_namespace("clock"),
            tick_rate,
            clock: Arc::new(Mutex::new(Clock::default())),
        }
    }

    fn clock(&self) -> PlayerResult<MutexGuard<'_, Clock>> {
        self.clock.lock().map_err(|_| "player clock lock poisoned".into())
    }
}

impl DevicePlayer for DevicePlayerClock {
    fn load(&self, path: &Path) -> PlayerResult<Receiver<MediaEvent>> {
        if !path.is_file() {
            return Err(format!("no such video: {}", path.display()).into());
        }
        self.logger.info(&format!("Loading {}", path.display()))?;

        let (sender, receiver) = channel();
        let load_id = {
            let mut clock = self.clock()?;
            clock.load_id += 1;
            clock.sender = Some(sender);
            clock.position = 0.0;
            clock.playing_since = None;
            clock.emit(MediaEventKind::LoadedData);
            clock.load_id
        };

        let clock = self.clock.clone();
        let tick_rate = self.tick_rate;
        std::thread::spawn(move || loop {
            std::thread::sleep(tick_rate);
            let Ok(mut clock) = clock.lock() else {
                break;
            };
            if clock.load_id != load_id || clock.sender.is_none() {
                break;
            }
            if clock.playing_since.is_some() {
                clock.emit(MediaEventKind::TimeUpdate);
            }
        });

        Ok(receiver)
    }

    fn play(&self) -> PlayerResult<()> {
        let mut clock = self.clock()?;
        if clock.playing_since.is_none() {
            clock.playing_since = Some(Instant::now());
        }
        clock.emit(MediaEventKind::Play);
        Ok(())
    }

    fn pause(&self) -> PlayerResult<()> {
        let mut clock = self.clock()?;
        clock.position = clock.current_time();
        clock.playing_since = None;
        clock.emit(MediaEventKind::Pause);
        Ok(())
    }

    fn seek(&self, seconds: f64) -> PlayerResult<()> {
        let mut clock = self.clock()?;
        clock.position = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if clock.playing_since.is_some() {
            clock.playing_since = Some(Instant::now());
        }
        clock.emit(MediaEventKind::Seeked);
        Ok(())
    }

    fn close(&self) -> PlayerResult<()> {
        let mut clock = self.clock()?;
        clock.load_id += 1;
        clock.sender = None;
        clock.playing_since = None;
        clock.position = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::logger::impl_console::LoggerConsole;

    fn player() -> DevicePlayerClock {
        DevicePlayerClock::new(
            Arc::new(LoggerConsole::new(chrono::FixedOffset::east_opt(0).unwrap())),
            Duration::from_millis(10),
        )
    }

    fn video_file() -> std::path::PathBuf {
        let path = std::env::temp_dir().join("astroguard_player_clock_test.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }

    #[test]
    fn test_load_emits_loaded_data_at_zero() {
        let player = player();
        let events = player.load(&video_file()).unwrap();

        assert_eq!(
            events.recv().unwrap(),
            MediaEvent {
                kind: MediaEventKind::LoadedData,
                current_time: 0.0
            }
        );
    }

    #[test]
    fn test_seek_while_paused() {
        let player = player();
        let events = player.load(&video_file()).unwrap();
        let _ = events.recv();

        player.seek(2.5).unwrap();

        assert_eq!(
            events.recv().unwrap(),
            MediaEvent {
                kind: MediaEventKind::Seeked,
                current_time: 2.5
            }
        );
    }

    #[test]
    fn test_playing_emits_time_updates() {
        let player = player();
        let events = player.load(&video_file()).unwrap();
        player.play().unwrap();

        let update = events
            .iter()
            .find(|event| event.kind == MediaEventKind::TimeUpdate)
            .unwrap();

        assert!(update.current_time > 0.0);
    }

    #[test]
    fn test_close_ends_event_stream() {
        let player = player();
        let events = player.load(&video_file()).unwrap();

        player.close().unwrap();

        let remaining: Vec<MediaEvent> = events.iter().collect();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        assert!(player().load(Path::new("/nonexistent/clip.mp4")).is_err());
    }
}
