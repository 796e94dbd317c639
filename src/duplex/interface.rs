use std::sync::Arc;

pub type DuplexResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A persistent text-message connection to the remote analyzer.
pub trait DuplexChannel {
    fn send(&self, text: &str) -> DuplexResult<()>;

    /// Waits briefly for the next text message. `Ok(None)` means nothing
    /// arrived yet; an error means the channel is gone.
    fn recv(&self) -> DuplexResult<Option<String>>;

    fn close(&self) -> DuplexResult<()>;

    fn is_open(&self) -> bool;
}

pub trait DuplexConnector {
    fn connect(&self, url: &str) -> DuplexResult<Arc<dyn DuplexChannel + Send + Sync>>;
}
