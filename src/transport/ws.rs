//! WebSocket transport.
//!
//! One peer listens, the other dials. After the upgrade both sides send their
//! player id as a text frame; every later frame is a binary payload. The link
//! is a single ordered stream, so both delivery modes share it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::models::PlayerId;
use crate::protocol::DeliveryMode;
use crate::session::{BusError, BusEvents, Matchmaker, SessionBus};

/// Delay between dial attempts while the listener is not up yet.
const DIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How this peer reaches its opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEndpoint {
    /// Accept one connection on this port.
    Listen(u16),
    /// Dial a `ws://host:port` URL.
    Dial(String),
}

struct Inner {
    endpoint: WsEndpoint,
    local_id: PlayerId,
    events: BusEvents,
    search: Mutex<Option<JoinHandle<()>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

/// WebSocket-backed session bus and matchmaker.
#[derive(Clone)]
pub struct WsTransport {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WsTransport {
    pub fn new(endpoint: WsEndpoint, local_id: PlayerId, events: BusEvents) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                local_id,
                events,
                search: Mutex::new(None),
                outbound: Mutex::new(None),
            }),
        }
    }
}

impl SessionBus for WsTransport {
    fn send(&self, payload: Vec<u8>, _mode: DeliveryMode) -> Result<(), BusError> {
        match lock(&self.inner.outbound).as_ref() {
            Some(tx) => tx.send(payload).map_err(|_| BusError::Closed),
            None => Err(BusError::NotConnected),
        }
    }
}

impl Matchmaker for WsTransport {
    fn find_match(&self) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = match inner.endpoint.clone() {
                WsEndpoint::Listen(port) => accept(&inner, port).await,
                WsEndpoint::Dial(url) => dial(&inner, &url).await,
            };
            if let Err(reason) = result {
                warn!(%reason, "websocket matchmaking failed");
                inner.events.match_failed(reason);
            }
        });

        if let Some(previous) = lock(&self.inner.search).replace(task) {
            previous.abort();
        }
    }

    fn cancel(&self) {
        if let Some(task) = lock(&self.inner.search).take() {
            task.abort();
        }
    }
}

async fn accept(inner: &Arc<Inner>, port: u16) -> Result<(), String> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| format!("failed to listen on port {port}: {e}"))?;
    info!(port, "waiting for opponent");

    let (stream, addr) = listener
        .accept()
        .await
        .map_err(|e| format!("failed to accept connection: {e}"))?;
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| format!("websocket handshake with {addr} failed: {e}"))?;
    establish(inner, ws).await
}

async fn dial(inner: &Arc<Inner>, url: &str) -> Result<(), String> {
    let ws = loop {
        match tokio_tungstenite::connect_async(url).await {
            Ok((ws, _)) => break ws,
            Err(e) => {
                debug!(%url, error = %e, "dial failed, retrying");
                tokio::time::sleep(DIAL_RETRY_DELAY).await;
            }
        }
    };
    establish(inner, ws).await
}

/// Exchange ids, then hand the stream to a link task that outlives the search.
async fn establish<S>(inner: &Arc<Inner>, ws: WebSocketStream<S>) -> Result<(), String>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();

    sink.send(Message::Text(inner.local_id.to_string().into()))
        .await
        .map_err(|e| format!("failed to send player id: {e}"))?;

    let peer = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => break PlayerId::from(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                return Err("peer closed during handshake".to_string());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(format!("handshake failed: {e}")),
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    *lock(&inner.outbound) = Some(tx);
    info!(%peer, "websocket link established");

    inner.events.match_found();
    inner.events.connected(peer.clone());
    tokio::spawn(run_link(Arc::clone(inner), peer, sink, stream, rx));
    Ok(())
}

async fn run_link<S>(
    inner: Arc<Inner>,
    peer: PlayerId,
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut stream: SplitStream<WebSocketStream<S>>,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if let Err(e) = sink.send(Message::Binary(payload.into())).await {
                warn!(error = %e, "websocket send failed");
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Binary(data)) => {
                if !inner.events.received(peer.clone(), data.to_vec()) {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%peer, error = %e, "websocket receive failed");
                break;
            }
        }
    }

    lock(&inner.outbound).take();
    writer.abort();
    inner.events.disconnected(peer);
}
