//! Control-channel connection manager.
//!
//! Owns at most one live connection, decodes inbound job frames and
//! reconnects after a fixed delay whenever the connection fails or closes.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use relay_core::PromptJob;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::frame::decode_inbound;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One established connection, split into its text-frame halves.
pub struct Channel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("connection closed by peer")]
    Closed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Channel, TransportError>;
}

#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    endpoint: String,
}

impl WebSocketConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Channel, TransportError> {
        let (socket, _response) = connect_async(self.endpoint.as_str()).await?;
        let (sink, stream) = socket.split();
        let sink = sink.with(|text: String| {
            future::ready(Ok::<_, TransportError>(Message::Text(text.into())))
        });
        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => Some(Err(TransportError::Closed)),
                Ok(_) => None,
                Err(err) => Some(Err(err.into())),
            })
        });
        Ok(Channel {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub reconnect_delay: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

#[derive(Default)]
struct Shared {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    attempts: AtomicU64,
    discarded: AtomicU64,
}

/// Cheap, cloneable view of the current connection.
#[derive(Clone, Default)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    /// Queues `frame` on the open connection; returns `false` and drops it otherwise.
    ///
    /// `true` only means the frame was queued. Frames still queued when the
    /// connection ends are discarded and counted in [`ConnectionHandle::discarded`].
    pub fn try_send(&self, frame: String) -> bool {
        match self.outbound().as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.outbound().is_some()
    }

    /// Connection attempts made so far, including the first.
    pub fn attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::Relaxed)
    }

    /// Queued frames dropped because their connection ended before they were written.
    pub fn discarded(&self) -> u64 {
        self.shared.discarded.load(Ordering::Relaxed)
    }

    fn open(&self, tx: mpsc::UnboundedSender<String>) {
        *self.outbound() = Some(tx);
    }

    fn close(&self) {
        *self.outbound() = None;
    }

    fn outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<String>>> {
        self.shared
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    handle: ConnectionHandle,
    jobs: mpsc::UnboundedSender<PromptJob>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Starts the connect/serve/reconnect loop. Decoded jobs go to `jobs`.
    ///
    /// Retries never stop on their own; only `cancel` ends the loop.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        settings: ConnectionSettings,
        jobs: mpsc::UnboundedSender<PromptJob>,
        cancel: CancellationToken,
    ) -> (ConnectionHandle, JoinHandle<()>) {
        let handle = ConnectionHandle::default();
        let manager = Self {
            connector,
            settings,
            handle: handle.clone(),
            jobs,
            cancel,
        };
        let task = tokio::spawn(async move { manager.run().await });
        (handle, task)
    }

    async fn run(self) {
        let delay = self.settings.reconnect_delay;
        loop {
            let attempt = self.handle.shared.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            engine_info!("Connecting to control channel (attempt {})", attempt);
            let connected = tokio::select! {
                result = self.connector.connect() => result,
                _ = self.cancel.cancelled() => return,
            };
            match connected {
                Ok(channel) => {
                    engine_info!("Control channel established");
                    self.serve(channel).await;
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    engine_warn!(
                        "Control channel closed; reconnecting in {} ms",
                        delay.as_millis()
                    );
                }
                Err(err) => {
                    engine_warn!(
                        "Control channel error: {}; reconnecting in {} ms",
                        err,
                        delay.as_millis()
                    );
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    /// Runs one connection until it fails or shutdown is requested.
    async fn serve(&self, channel: Channel) {
        let Channel {
            mut sink,
            mut stream,
        } = channel;
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        self.handle.open(tx);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                outgoing = rx.recv() => {
                    let Some(frame) = outgoing else { break };
                    if let Err(err) = sink.send(frame).await {
                        engine_warn!("Control channel send failed: {}", err);
                        break;
                    }
                }
                incoming = stream.next() => match incoming {
                    Some(Ok(raw)) => self.dispatch(&raw),
                    Some(Err(err)) => {
                        engine_warn!("Control channel error: {}", err);
                        break;
                    }
                    None => break,
                },
            }
        }

        self.handle.close();
        let mut unsent: u64 = 0;
        while rx.try_recv().is_ok() {
            unsent += 1;
        }
        if unsent > 0 {
            self.handle.shared.discarded.fetch_add(unsent, Ordering::Relaxed);
            engine_debug!("Discarded {} unsent status frame(s) with the closed connection", unsent);
        }
    }

    fn dispatch(&self, raw: &str) {
        match decode_inbound(raw) {
            Ok(frame) => {
                engine_info!("[{}] job received", frame.prompt_id);
                if self
                    .jobs
                    .send(PromptJob::new(frame.prompt_id, frame.text))
                    .is_err()
                {
                    engine_warn!("Job dispatcher stopped; dropping job");
                }
            }
            Err(err) => engine_warn!("Dropping malformed frame {:?}: {}", raw, err),
        }
    }
}
