//! UDP listener for the WSJT-X feed.
//!
//! This module owns the UDP socket, decodes each datagram and feeds it to
//! an [`AlertEngine`] running on its own task. Engine events are handed to
//! the caller over a channel.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace};

use crate::confirmed::ConfirmedSource;
use crate::engine::{AlertEngine, EngineEvent};
use crate::stats::WatchStats;
use crate::wire::parse_datagram;

/// Default address WSJT-X sends its UDP messages to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default WSJT-X UDP server port.
pub const DEFAULT_PORT: u16 = 2238;

/// Configuration for the UDP listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Receive buffer size; longer datagrams are truncated.
    pub recv_buffer_size: usize,

    /// Capacity of the event channel.
    pub channel_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            recv_buffer_size: 8192,
            channel_capacity: 1000,
        }
    }
}

impl ListenerConfig {
    /// Create a configuration bound to the given host and port.
    pub fn with_addr(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }
}

/// Errors that end a listener session before it starts.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind UDP {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Events from the listener.
#[derive(Debug)]
pub enum WatchEvent {
    /// The socket is bound and receiving.
    Listening(SocketAddr),

    /// The engine produced an observation or alert.
    Engine(EngineEvent),

    /// Receiving failed; the session is over.
    Error(String),

    /// The receive loop has exited.
    Stopped,
}

/// Decode one datagram and run it through the engine.
///
/// Malformed and unsupported datagrams are counted and dropped without
/// touching the engine.
pub fn process_datagram<S: ConfirmedSource>(
    buf: &[u8],
    engine: &mut AlertEngine<S>,
    stats: &WatchStats,
) -> Option<EngineEvent> {
    stats.record_datagram(buf.len());

    let message = match parse_datagram(buf) {
        Ok(message) => message,
        Err(e) => {
            stats.record_rejection(&e);
            trace!("Dropped datagram ({} bytes): {}", buf.len(), e);
            return None;
        }
    };

    stats.record_message(&message);
    let event = engine.process(message)?;
    stats.record_event(&event);
    Some(event)
}

/// Async UDP listener.
pub struct Listener {
    config: ListenerConfig,
}

impl Listener {
    /// Create a new listener with the given configuration.
    pub fn new(config: ListenerConfig) -> Self {
        Self { config }
    }

    /// Bind the socket and start receiving.
    ///
    /// Bind failures are returned directly. Once bound, the receive loop
    /// runs in a background task that owns `engine` and stops when
    /// `shutdown` becomes `true`, the returned receiver is dropped, or a
    /// receive fails.
    pub async fn start<S>(
        self,
        engine: AlertEngine<S>,
        stats: Arc<WatchStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<WatchEvent>, ListenerError>
    where
        S: ConfirmedSource + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let bind_error = |source| ListenerError::Bind {
            addr: addr.clone(),
            source,
        };

        let socket = UdpSocket::bind(&addr).await.map_err(bind_error)?;
        let local = socket.local_addr().map_err(bind_error)?;
        info!("Listening UDP {}...", local);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        tokio::spawn(async move {
            self.run(socket, local, engine, stats, shutdown, tx).await;
        });

        Ok(rx)
    }

    /// Receive datagrams until shutdown or failure.
    async fn run<S: ConfirmedSource>(
        self,
        socket: UdpSocket,
        local: SocketAddr,
        mut engine: AlertEngine<S>,
        stats: Arc<WatchStats>,
        mut shutdown: watch::Receiver<bool>,
        tx: mpsc::Sender<WatchEvent>,
    ) {
        let _ = tx.send(WatchEvent::Listening(local)).await;
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        loop {
            let stop = *shutdown.borrow_and_update();
            if stop {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender dropped
                        break;
                    }
                }

                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            debug!("Received {} bytes from {}", len, peer);
                            let Some(event) = process_datagram(&buf[..len], &mut engine, &stats) else {
                                continue;
                            };
                            if tx.send(WatchEvent::Engine(event)).await.is_err() {
                                // Receiver dropped
                                break;
                            }
                        }
                        Err(e) => {
                            error!("UDP receive error: {}", e);
                            let _ = tx.send(WatchEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                }
            }
        }

        info!("Listener on {} stopped", local);
        let _ = tx.send(WatchEvent::Stopped).await;
    }
}
