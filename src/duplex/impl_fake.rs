use crate::duplex::interface::{DuplexChannel, DuplexConnector, DuplexResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<String>>,
    replies: Mutex<VecDeque<String>>,
    channels: Mutex<Vec<Arc<DuplexChannelFake>>>,
    refuse: AtomicBool,
}

/// Records what is sent and plays back queued server messages.
#[derive(Clone, Default)]
pub struct DuplexConnectorFake {
    shared: Arc<Shared>,
}

impl DuplexConnectorFake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn push_reply(&self, text: &str) {
        if let Ok(mut replies) = self.shared.replies.lock() {
            replies.push_back(text.to_string());
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn connections(&self) -> usize {
        self.shared
            .channels
            .lock()
            .map(|channels| channels.len())
            .unwrap_or(0)
    }

    pub fn open_channels(&self) -> usize {
        self.shared
            .channels
            .lock()
            .map(|channels| channels.iter().filter(|c| c.is_open()).count())
            .unwrap_or(0)
    }

    /// Simulates the server dropping every open connection.
    pub fn drop_connections(&self) {
        if let Ok(channels) = self.shared.channels.lock() {
            for channel in channels.iter() {
                channel.open.store(false, Ordering::SeqCst);
            }
        }
    }
}

impl DuplexConnector for DuplexConnectorFake {
    fn connect(&self, url: &str) -> DuplexResult<Arc<dyn DuplexChannel + Send + Sync>> {
        if self.shared.refuse.load(Ordering::SeqCst) {
            return Err(format!("connection to {} refused", url).into());
        }

        let channel = Arc::new(DuplexChannelFake {
            shared: self.shared.clone(),
            open: AtomicBool::new(true),
        });
        self.shared
            .channels
            .lock()
            .map_err(|_| "fake duplex lock poisoned")?
            .push(channel.clone());
        Ok(channel)
    }
}

pub struct DuplexChannelFake {
    shared: Arc<Shared>,
    open: AtomicBool,
}

impl DuplexChannel for DuplexChannelFake {
    fn send(&self, text: &str) -> DuplexResult<()> {
        if !self.is_open() {
            return Err("channel closed".into());
        }
        self.shared
            .sent
            .lock()
            .map_err(|_| "fake duplex lock poisoned")?
            .push(text.to_string());
        Ok(())
    }

    fn recv(&self) -> DuplexResult<Option<String>> {
        if !self.is_open() {
            return Err("channel closed".into());
        }
        let reply = self
            .shared
            .replies
            .lock()
            .map_err(|_| "fake duplex lock poisoned")?
            .pop_front();
        if reply.is_none() {
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(reply)
    }

    fn close(&self) -> DuplexResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_channel_lifecycle() {
        let connector = DuplexConnectorFake::new();
        connector.push_reply("hello");

        let channel = connector.connect("ws://fake").unwrap();
        channel.send("frame").unwrap();

        assert_eq!(channel.recv().unwrap(), Some("hello".to_string()));
        assert_eq!(channel.recv().unwrap(), None);
        assert_eq!(connector.sent(), vec!["frame".to_string()]);
        assert_eq!(connector.open_channels(), 1);

        channel.close().unwrap();

        assert_eq!(connector.open_channels(), 0);
        assert!(channel.send("late").is_err());
        assert!(channel.recv().is_err());
    }

    #[test]
    fn test_refused_connection() {
        let connector = DuplexConnectorFake::new();
        connector.refuse_connections(true);

        assert!(connector.connect("ws://fake").is_err());
        assert_eq!(connector.connections(), 0);
    }
}
