use crate::device_camera::interface::{CameraResult, DeviceCamera};
use crate::library::logger::interface::Logger;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Replays a still image as a camera feed.
pub struct DeviceCameraImageFile {
    logger: Arc<dyn Logger + Send + Sync>,
    path: PathBuf,
    frame: Mutex<Option<DynamicImage>>,
}

impl DeviceCameraImageFile {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>, path: PathBuf) -> Self {
        Self {
            logger: logger.with_namespace("camera").with_namespace("image_file"),
            path,
            frame: Mutex::new(None),
        }
    }

    fn frame(&self) -> CameraResult<std::sync::MutexGuard<'_, Option<DynamicImage>>> {
        self.frame.lock().map_err(|_| "camera lock poisoned".into())
    }
}

impl DeviceCamera for DeviceCameraImageFile {
    fn start(&self) -> CameraResult<()> {
        self.logger
            .info(&format!("Opening {}...", self.path.display()))?;
        let image = image::open(&self.path)
            .map_err(|e| format!("cannot open camera source {}: {}", self.path.display(), e))?;
        *self.frame()? = Some(image);
        Ok(())
    }

    fn stop(&self) -> CameraResult<()> {
        if self.frame()?.take().is_some() {
            self.logger.info("Camera source released")?;
        }
        Ok(())
    }

    fn capture_frame(&self) -> CameraResult<DynamicImage> {
        self.frame()?
            .clone()
            .ok_or_else(|| "camera not started".into())
    }

    fn active_tracks(&self) -> usize {
        self.frame()
            .map(|frame| usize::from(frame.is_some()))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::logger::impl_console::LoggerConsole;

    #[test]
    fn test_missing_file_fails_start() {
        let camera = DeviceCameraImageFile::new(
            Arc::new(LoggerConsole::new(chrono::FixedOffset::east_opt(0).unwrap())),
            PathBuf::from("/nonexistent/frame.png"),
        );

        assert!(camera.start().is_err());
        assert_eq!(camera.active_tracks(), 0);
        assert!(camera.capture_frame().is_err());
    }

    #[test]
    fn test_replays_image() {
        let path = std::env::temp_dir().join("astroguard_camera_image_file_test.png");
        DynamicImage::new_rgb8(8, 6).save(&path).unwrap();

        let camera = DeviceCameraImageFile::new(
            Arc::new(LoggerConsole::new(chrono::FixedOffset::east_opt(0).unwrap())),
            path,
        );
        camera.start().unwrap();

        assert_eq!(camera.capture_frame().unwrap().width(), 8);
        assert_eq!(camera.active_tracks(), 1);

        camera.stop().unwrap();
        assert_eq!(camera.active_tracks(), 0);
    }
}
