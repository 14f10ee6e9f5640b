//! Controller side of the control channel: a WebSocket server that
//! generates prompts, broadcasts them to connected bridges and records the
//! statuses they report back.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use relay_core::{DispatchLedger, DispatchLimits, Gate, RequestId, Wildcards};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::TransportError;
use crate::frame::{decode_outbound, encode_inbound, InboundFrame};

pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(5000);
pub const DEFAULT_GATE_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub template: String,
    pub recursion_depth: usize,
    /// Pause after every send.
    pub send_delay: Duration,
    /// How often a closed gate is re-checked.
    pub gate_poll: Duration,
    pub limits: DispatchLimits,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            template: "a [STYLE] [TYPE] character".to_string(),
            recursion_depth: 5,
            send_delay: DEFAULT_SEND_DELAY,
            gate_poll: DEFAULT_GATE_POLL,
            limits: DispatchLimits::default(),
        }
    }
}

/// Shared, lock-protected ledger of everything the controller sent.
#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<DispatchLedger>>,
}

impl SharedLedger {
    pub fn new(limits: DispatchLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DispatchLedger::new(limits))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, DispatchLedger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
struct Clients {
    senders: Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>>,
    next_id: Arc<AtomicU64>,
}

impl Clients {
    fn add(&self, tx: mpsc::UnboundedSender<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.senders().insert(id, tx);
        id
    }

    fn remove(&self, id: u64) {
        self.senders().remove(&id);
    }

    fn len(&self) -> usize {
        self.senders().len()
    }

    /// Queues `frame` for every client; returns how many accepted it.
    fn broadcast(&self, frame: &str) -> usize {
        self.senders()
            .values()
            .filter(|tx| tx.send(frame.to_string()).is_ok())
            .count()
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<String>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Controller {
    listener: TcpListener,
    settings: ControllerSettings,
    wildcards: Wildcards,
    ledger: SharedLedger,
    clients: Clients,
}

impl Controller {
    pub async fn bind(
        addr: &str,
        settings: ControllerSettings,
        wildcards: Wildcards,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        engine_info!("Controller listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            ledger: SharedLedger::new(settings.limits),
            settings,
            wildcards,
            clients: Clients::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    /// Generates prompts until the total cap is reached, then waits for the
    /// outstanding ones to finish. Returns how many prompts were sent.
    ///
    /// Without a cap this only returns once `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> usize {
        let Self {
            listener,
            settings,
            wildcards,
            ledger,
            clients,
        } = self;

        let server_cancel = cancel.child_token();
        tokio::spawn(accept_loop(
            listener,
            clients.clone(),
            ledger.clone(),
            server_cancel.clone(),
        ));

        let generator = Generator {
            settings: &settings,
            wildcards: &wildcards,
            ledger: &ledger,
            clients: &clients,
        };
        let sent = generator.generate(&cancel).await;
        generator.drain(&cancel).await;

        server_cancel.cancel();
        sent
    }
}

struct Generator<'a> {
    settings: &'a ControllerSettings,
    wildcards: &'a Wildcards,
    ledger: &'a SharedLedger,
    clients: &'a Clients,
}

impl Generator<'_> {
    async fn generate(&self, cancel: &CancellationToken) -> usize {
        let mut rng = StdRng::from_entropy();
        loop {
            let gate = self.ledger.lock().gate(self.clients.len());
            let pause = match gate {
                Gate::Exhausted => {
                    engine_info!("Reached the limit of {} prompts; generation stopped", self.ledger.lock().sent());
                    break;
                }
                Gate::NoClients | Gate::AtCapacity => {
                    engine_debug!("Dispatch gate closed: {:?}", gate);
                    self.settings.gate_poll
                }
                Gate::Ready => {
                    let text = self.wildcards.expand(
                        &self.settings.template,
                        self.settings.recursion_depth,
                        &mut rng,
                    );
                    self.send(RequestId::new(Uuid::new_v4().to_string()), text);
                    self.settings.send_delay
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => break,
            }
        }
        self.ledger.lock().sent()
    }

    fn send(&self, id: RequestId, text: String) {
        let frame = InboundFrame {
            prompt_id: id.clone(),
            text,
        };
        match encode_inbound(&frame) {
            Ok(raw) => {
                let delivered = self.clients.broadcast(&raw);
                self.ledger.lock().record_sent(id.clone());
                engine_info!("[{}] sent to {} client(s): {}", id, delivered, frame.text);
            }
            Err(err) => engine_error!("[{}] failed to encode prompt: {}", id, err),
        }
    }

    /// Waits until no sent prompt is still outstanding.
    async fn drain(&self, cancel: &CancellationToken) {
        loop {
            let in_flight = self.ledger.lock().in_flight();
            if in_flight == 0 {
                return;
            }
            engine_debug!("Waiting for {} prompt(s) to finish", in_flight);
            tokio::select! {
                _ = tokio::time::sleep(self.settings.gate_poll) => {}
                _ = cancel.cancelled() => return,
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    clients: Clients,
    ledger: SharedLedger,
    cancel: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = cancel.cancelled() => return,
        };
        match accepted {
            Ok((stream, peer)) => {
                tokio::spawn(serve_client(
                    stream,
                    peer,
                    clients.clone(),
                    ledger.clone(),
                    cancel.clone(),
                ));
            }
            Err(err) => engine_warn!("Accept failed: {}", err),
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    clients: Clients,
    ledger: SharedLedger,
    cancel: CancellationToken,
) {
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(err) => {
            engine_warn!("WebSocket handshake with {} failed: {}", peer, err);
            return;
        }
    };
    let (mut sink, mut source) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client = clients.add(tx);
    engine_info!("Client {} connected from {}", client, peer);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
            outgoing = rx.recv() => {
                let Some(frame) = outgoing else { break };
                if let Err(err) = sink.send(Message::Text(frame.into())).await {
                    engine_warn!("Send to client {} failed: {}", client, err);
                    break;
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => record_status(&ledger, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    engine_warn!("Client {} error: {}", client, err);
                    break;
                }
            },
        }
    }

    clients.remove(client);
    engine_info!("Client {} disconnected", client);
}

fn record_status(ledger: &SharedLedger, raw: &str) {
    match decode_outbound(raw) {
        Ok(frame) => {
            let changed = ledger
                .lock()
                .record_status(frame.prompt_id.clone(), frame.status.as_wire());
            if changed {
                engine_info!("[{}] status: {}", frame.prompt_id, frame.status);
            }
        }
        Err(err) => engine_warn!("Ignoring malformed status frame {:?}: {}", raw, err),
    }
}
