//! Live session transport
//!
//! The orchestrator talks to the remote conversational service through the
//! [`LiveConnector`]/[`LiveTransport`] seams; the concrete implementation
//! dials the hosted WebSocket endpoint, sends the setup frame, and runs one
//! reader and one writer task for the lifetime of the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ServicesConfig;
use crate::session::events::ServerEvent;
use crate::session::wire;
use crate::{Error, Result};

/// Inbound event channel depth
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything needed to open one live session
#[derive(Debug, Clone)]
pub struct SessionSetup {
    /// Live model identifier
    pub model: String,
    /// Personalized system instruction
    pub system_instruction: String,
    /// Tool declarations advertised to the model
    pub tool_declarations: serde_json::Value,
}

/// Outbound half of an open live session
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Send one realtime audio frame (raw PCM16 bytes)
    async fn send_audio(&self, frame: &[u8]) -> Result<()>;

    /// Send one tool response correlated by call id
    async fn send_tool_response(&self, id: &str, name: &str, result: &str) -> Result<()>;

    /// Close the connection; idempotent
    async fn close(&self);
}

/// Opens live sessions
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Open a duplex session, returning the outbound transport and the
    /// inbound event stream
    async fn connect(
        &self,
        setup: SessionSetup,
    ) -> Result<(Arc<dyn LiveTransport>, mpsc::Receiver<ServerEvent>)>;
}

enum Outbound {
    Frame(String),
    Close,
}

/// WebSocket client for the hosted live endpoint
pub struct GeminiLiveConnector {
    url: String,
    api_key: SecretString,
}

impl GeminiLiveConnector {
    /// Create a connector from the services configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "API key required for live sessions".to_string(),
            ));
        }
        Ok(Self {
            url: config.live_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(
        &self,
        setup: SessionSetup,
    ) -> Result<(Arc<dyn LiveTransport>, mpsc::Receiver<ServerEvent>)> {
        let url = format!("{}?key={}", self.url, self.api_key.expose_secret());

        let (stream, _) = connect_async(url.as_str()).await.map_err(|e| {
            tracing::error!(error = %e, "live connection failed");
            Error::Transport(e.to_string())
        })?;
        let (mut sink, mut source) = stream.split();

        // The setup frame must be the first thing on the wire
        let setup_frame = wire::setup_message(
            &setup.model,
            &setup.system_instruction,
            &setup.tool_declarations,
        );
        sink.send(Message::Text(setup_frame.into()))
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        tracing::info!(model = %setup.model, "live session connected");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();

        // Writer: outbound frames until close
        tokio::spawn(async move {
            while let Some(command) = out_rx.recv().await {
                match command {
                    Outbound::Frame(frame) => {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        });

        // Reader: inbound frames to server events
        tokio::spawn(async move {
            let mut terminal_sent = false;
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        for event in wire::parse_server_frame(&text) {
                            if events_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Binary(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes);
                        for event in wire::parse_server_frame(&text) {
                            if events_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed the session".to_string());
                        let _ = events_tx.send(ServerEvent::Closed(reason)).await;
                        terminal_sent = true;
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events_tx.send(ServerEvent::Error(e.to_string())).await;
                        terminal_sent = true;
                        break;
                    }
                }
            }
            if !terminal_sent {
                let _ = events_tx
                    .send(ServerEvent::Closed("connection ended".to_string()))
                    .await;
            }
        });

        let transport = GeminiLiveTransport {
            out_tx,
            closed: AtomicBool::new(false),
        };
        Ok((Arc::new(transport), events_rx))
    }
}

struct GeminiLiveTransport {
    out_tx: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
}

impl GeminiLiveTransport {
    fn send_frame(&self, frame: String) -> Result<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::Transport("session closed".to_string()));
        }
        self.out_tx
            .send(Outbound::Frame(frame))
            .map_err(|_| Error::Transport("session closed".to_string()))
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn send_audio(&self, frame: &[u8]) -> Result<()> {
        self.send_frame(wire::realtime_audio_message(frame))
    }

    async fn send_tool_response(&self, id: &str, name: &str, result: &str) -> Result<()> {
        self.send_frame(wire::tool_response_message(id, name, result))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            let _ = self.out_tx.send(Outbound::Close);
            tracing::debug!("live transport closed");
        }
    }
}
