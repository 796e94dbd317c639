use crate::device_player::interface::{DevicePlayer, MediaEvent, PlayerResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load(PathBuf),
    Play,
    Pause,
    Seek(f64),
    Close,
}

/// Records calls; media events are pushed by the test with [`DevicePlayerFake::emit`].
#[derive(Default)]
pub struct DevicePlayerFake {
    calls: Mutex<Vec<PlayerCall>>,
    sender: Mutex<Option<Sender<MediaEvent>>>,
}

impl DevicePlayerFake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn emit(&self, event: MediaEvent) {
        if let Ok(sender) = self.sender.lock() {
            if let Some(sender) = sender.as_ref() {
                let _ = sender.send(event);
            }
        }
    }

    fn record(&self, call: PlayerCall) -> PlayerResult<()> {
        self.calls
            .lock()
            .map_err(|_| "fake player lock poisoned")?
            .push(call);
        Ok(())
    }
}

impl DevicePlayer for DevicePlayerFake {
    fn load(&self, path: &Path) -> PlayerResult<Receiver<MediaEvent>> {
        self.record(PlayerCall::Load(path.to_path_buf()))?;
        let (sender, receiver) = channel();
        *self.sender.lock().map_err(|_| "fake player lock poisoned")? = Some(sender);
        Ok(receiver)
    }

    fn play(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Play)
    }

    fn pause(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Pause)
    }

    fn seek(&self, seconds: f64) -> PlayerResult<()> {
        self.record(PlayerCall::Seek(seconds))
    }

    fn close(&self) -> PlayerResult<()> {
        *self.sender.lock().map_err(|_| "fake player lock poisoned")? = None;
        self.record(PlayerCall::Close)
    }
}
