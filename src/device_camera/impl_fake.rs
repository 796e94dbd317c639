use crate::device_camera::interface::{CameraResult, DeviceCamera};
use crate::library::logger::interface::Logger;
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Synthetic camera producing a moving gradient.
pub struct DeviceCameraFake {
    logger: Arc<dyn Logger + Send + Sync>,
    width: u32,
    height: u32,
    tracks: AtomicUsize,
    frame_count: AtomicU32,
    deny_access: AtomicBool,
}

impl DeviceCameraFake {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            logger: logger.with_namespace("camera").with_namespace("fake"),
            width: 320,
            height: 240,
            tracks: AtomicUsize::new(0),
            frame_count: AtomicU32::new(0),
            deny_access: AtomicBool::new(false),
        }
    }

    pub fn deny_access(&self, deny: bool) {
        self.deny_access.store(deny, Ordering::SeqCst);
    }

    pub fn frames_captured(&self) -> u32 {
        self.frame_count.load(Ordering::SeqCst)
    }
}

impl DeviceCamera for DeviceCameraFake {
    fn start(&self) -> CameraResult<()> {
        if self.deny_access.load(Ordering::SeqCst) {
            return Err("camera permission denied".into());
        }
        self.logger.info("Starting camera...")?;
        self.tracks.store(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> CameraResult<()> {
        if self.tracks.swap(0, Ordering::SeqCst) > 0 {
            self.logger.info("Camera stopped")?;
        }
        Ok(())
    }

    fn capture_frame(&self) -> CameraResult<DynamicImage> {
        if self.active_tracks() == 0 {
            return Err("camera not started".into());
        }

        let shift = self.frame_count.fetch_add(1, Ordering::SeqCst);
        let frame = RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                ((x + shift) % 256) as u8,
                (y % 256) as u8,
                ((x + y + shift) % 256) as u8,
            ])
        });
        Ok(DynamicImage::ImageRgb8(frame))
    }

    fn active_tracks(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::logger::impl_console::LoggerConsole;

    fn camera() -> DeviceCameraFake {
        DeviceCameraFake::new(Arc::new(LoggerConsole::new(
            chrono::FixedOffset::east_opt(0).unwrap(),
        )))
    }

    #[test]
    fn test_capture_requires_start() {
        let camera = camera();

        assert!(camera.capture_frame().is_err());

        camera.start().unwrap();
        let frame = camera.capture_frame().unwrap();

        assert_eq!((frame.width(), frame.height()), (320, 240));
        assert_eq!(camera.active_tracks(), 1);

        camera.stop().unwrap();

        assert_eq!(camera.active_tracks(), 0);
    }

    #[test]
    fn test_denied_access() {
        let camera = camera();
        camera.deny_access(true);

        assert!(camera.start().is_err());
        assert_eq!(camera.active_tracks(), 0);
    }
}
