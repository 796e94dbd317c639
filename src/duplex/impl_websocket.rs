use crate::duplex::interface::{DuplexChannel, DuplexConnector, DuplexResult};
use crate::library::logger::interface::Logger;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

pub struct DuplexConnectorWebSocket {
    logger: Arc<dyn Logger + Send + Sync>,
    poll_interval: Duration,
}

impl DuplexConnectorWebSocket {
    pub fn new(logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            logger: logger.with_namespace("duplex").with_namespace("websocket"),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl DuplexConnector for DuplexConnectorWebSocket {
    fn connect(&self, url: &str) -> DuplexResult<Arc<dyn DuplexChannel + Send + Sync>> {
        self.logger.info(&format!("Connecting to {}...", url))?;
        let (socket, response) = tungstenite::connect(url)?;
        self.logger
            .info(&format!("Connected ({})", response.status()))?;

        // reads must time out so senders get a turn at the socket lock
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => set_read_timeout(stream, self.poll_interval)?,
            MaybeTlsStream::Rustls(stream) => set_read_timeout(stream.get_ref(), self.poll_interval)?,
            _ => {}
        }

        Ok(Arc::new(DuplexChannelWebSocket {
            socket: Mutex::new(socket),
            open: AtomicBool::new(true),
            logger: self.logger.clone(),
        }))
    }
}

fn set_read_timeout(stream: &TcpStream, timeout: Duration) -> DuplexResult<()> {
    stream.set_read_timeout(Some(timeout))?;
    Ok(())
}

pub struct DuplexChannelWebSocket {
    socket: Mutex<WebSocket<MaybeTlsStream<TcpStream>>>,
    open: AtomicBool,
    logger: Arc<dyn Logger + Send + Sync>,
}

impl DuplexChannelWebSocket {
    fn socket(
        &self,
    ) -> DuplexResult<std::sync::MutexGuard<'_, WebSocket<MaybeTlsStream<TcpStream>>>> {
        self.socket
            .lock()
            .map_err(|_| "websocket lock poisoned".into())
    }
}

impl DuplexChannel for DuplexChannelWebSocket {
    fn send(&self, text: &str) -> DuplexResult<()> {
        if !self.is_open() {
            return Err("websocket closed".into());
        }
        let result = self.socket()?.send(Message::Text(text.to_string()));
        if let Err(e) = result {
            self.open.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    fn recv(&self) -> DuplexResult<Option<String>> {
        if !self.is_open() {
            return Err("websocket closed".into());
        }

        let result = self.socket()?.read();
        match result {
            Ok(Message::Text(text)) => Ok(Some(text)),
            Ok(Message::Close(frame)) => {
                self.open.store(false, Ordering::SeqCst);
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "closed by server".to_string());
                Err(reason.into())
            }
            // binary, ping, pong
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(e) => {
                self.open.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    fn close(&self) -> DuplexResult<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.logger.info("Closing websocket")?;

        let mut socket = self.socket()?;
        match socket.close(None) {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
