use crate::device_display::interface::{DeviceDisplay, DisplayFrame, DisplayInput};
use std::error::Error;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Keeps every shown frame; inputs are injected with [`DeviceDisplayFake::input`].
pub struct DeviceDisplayFake {
    frames: Arc<Mutex<Vec<DisplayFrame>>>,
    sender: Sender<DisplayInput>,
    receiver: Mutex<Option<Receiver<DisplayInput>>>,
}

impl DeviceDisplayFake {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            frames: Arc::new(Mutex::new(vec![])),
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    pub fn input(&self, input: DisplayInput) {
        let _ = self.sender.send(input);
    }

    pub fn last_frame(&self) -> Option<DisplayFrame> {
        self.frames.lock().ok().and_then(|frames| frames.last().cloned())
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }
}

impl DeviceDisplay for DeviceDisplayFake {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.frames
            .lock()
            .map_err(|_| "fake display lock poisoned")?
            .push(frame.clone());
        Ok(())
    }

    fn inputs(&mut self) -> Result<Receiver<DisplayInput>, Box<dyn Error + Send + Sync>> {
        self.receiver
            .lock()
            .map_err(|_| "fake display lock poisoned")?
            .take()
            .ok_or_else(|| "display input already subscribed".into())
    }
}
