use image::DynamicImage;

pub type CameraResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A capture device feeding the live stream.
pub trait DeviceCamera {
    /// Acquires the device. Fails when it is missing or access is denied.
    fn start(&self) -> CameraResult<()>;

    /// Releases every capture track. Safe to call when not started.
    fn stop(&self) -> CameraResult<()>;

    fn capture_frame(&self) -> CameraResult<DynamicImage>;

    fn active_tracks(&self) -> usize;
}
