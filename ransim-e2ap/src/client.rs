//! E2AP transport
//!
//! The E2 node originates every association. [`Dialer::connect`] returns an
//! [`E2ClientConn`] used for node-initiated procedures, while RIC-initiated
//! procedures received on the same association are handed to the
//! [`E2NodeHandler`] supplied at connect time.
//!
//! ```text
//!            +-------------+   E2 Setup / Config Update / Indication
//! E2 node -->| E2ClientConn|------------------------------------------> RIC
//!            +-------------+
//!            | E2NodeHandler|<-- Subscription / Control / ConnectionUpdate
//!            +-------------+
//! ```
//!
//! [`TcpDialer`] implements the transport over TCP using the frame codec.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ransim_common::logging::{log_e2ap_message, Direction};

use crate::cause::Cause;
use crate::codec::{decode_frame, encode_frame, read_frame_body, E2apPdu, Frame};
use crate::error::E2apError;
use crate::procedures::*;
use crate::types::Outcome;

/// Outcome of an E2 Setup.
pub type E2SetupOutcome = Outcome<E2SetupResponse, E2SetupFailure>;
/// Outcome of an E2 Node Configuration Update.
pub type ConfigurationUpdateOutcome =
    Outcome<E2NodeConfigurationUpdateAcknowledge, E2NodeConfigurationUpdateFailure>;
/// Outcome of an E2 Connection Update.
pub type ConnectionUpdateOutcome = Outcome<E2ConnectionUpdateAcknowledge, E2ConnectionUpdateFailure>;
/// Outcome of a RIC Subscription.
pub type SubscriptionOutcome = Outcome<RicSubscriptionResponse, RicSubscriptionFailure>;
/// Outcome of a RIC Subscription Delete.
pub type SubscriptionDeleteOutcome =
    Outcome<RicSubscriptionDeleteResponse, RicSubscriptionDeleteFailure>;
/// Outcome of a RIC Control.
pub type ControlOutcome = Outcome<RicControlAcknowledge, RicControlFailure>;

/// Node side of an established E2 association.
#[async_trait]
pub trait E2ClientConn: Send + Sync {
    /// Runs the E2 Setup procedure.
    async fn e2_setup(&self, request: E2SetupRequest) -> Result<E2SetupOutcome, E2apError>;

    /// Runs the E2 Node Configuration Update procedure.
    async fn e2_configuration_update(
        &self,
        request: E2NodeConfigurationUpdate,
    ) -> Result<ConfigurationUpdateOutcome, E2apError>;

    /// Sends a RIC Indication.
    async fn ric_indication(&self, indication: RicIndication) -> Result<(), E2apError>;

    /// Closes the association. Completes [`E2ClientConn::context`].
    async fn close(&self) -> Result<(), E2apError>;

    /// Token cancelled once the association is lost or closed.
    fn context(&self) -> CancellationToken;
}

/// Receiver of RIC-initiated procedures.
///
/// An `Err` means no answer could be produced; the transport then reports an
/// Error Indication to the RIC.
#[async_trait]
pub trait E2NodeHandler: Send + Sync {
    async fn ric_control(
        &self,
        request: RicControlRequest,
    ) -> ransim_common::Result<ControlOutcome>;

    async fn ric_subscription(
        &self,
        request: RicSubscriptionRequest,
    ) -> ransim_common::Result<SubscriptionOutcome>;

    async fn ric_subscription_delete(
        &self,
        request: RicSubscriptionDeleteRequest,
    ) -> ransim_common::Result<SubscriptionDeleteOutcome>;

    async fn e2_connection_update(
        &self,
        request: E2ConnectionUpdate,
    ) -> ransim_common::Result<ConnectionUpdateOutcome>;
}

/// Opens E2 associations.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connects to the RIC at `address` (`host:port`).
    async fn connect(
        &self,
        address: &str,
        handler: Arc<dyn E2NodeHandler>,
    ) -> Result<Arc<dyn E2ClientConn>, E2apError>;
}

// ============================================================================
// TCP transport
// ============================================================================

/// Transport timers and buffers.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for establishing the association
    pub connect_timeout: Duration,
    /// Timeout for a node-initiated procedure answer
    pub request_timeout: Duration,
    /// Outbound frame queue capacity
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            channel_capacity: 256,
        }
    }
}

/// [`Dialer`] over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    config: TransportConfig,
}

impl TcpDialer {
    /// Creates a dialer with the given transport configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn connect(
        &self,
        address: &str,
        handler: Arc<dyn E2NodeHandler>,
    ) -> Result<Arc<dyn E2ClientConn>, E2apError> {
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| E2apError::Timeout(format!("connect to {address}")))??;
        stream.set_nodelay(true)?;
        let remote = stream.peer_addr()?;
        info!("E2 association established with {}", remote);

        let (reader, writer) = stream.into_split();
        let client = TcpE2Client::spawn(remote, reader, writer, handler, self.config.clone());
        Ok(client)
    }
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<E2apPdu>>>>;

/// Client side of a TCP E2 association.
pub struct TcpE2Client {
    remote: SocketAddr,
    outbound: mpsc::Sender<Frame>,
    pending: PendingMap,
    next_seq: AtomicU64,
    ctx: CancellationToken,
    config: TransportConfig,
}

impl TcpE2Client {
    /// Starts the reader and writer tasks of an association over any byte stream.
    pub fn spawn<R, W>(
        remote: SocketAddr,
        reader: R,
        writer: W,
        handler: Arc<dyn E2NodeHandler>,
        config: TransportConfig,
    ) -> Arc<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, outbound_rx) = mpsc::channel(config.channel_capacity);
        let ctx = CancellationToken::new();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(write_loop(writer, outbound_rx, ctx.clone()));
        tokio::spawn(read_loop(
            reader,
            outbound.clone(),
            pending.clone(),
            handler,
            ctx.clone(),
            remote,
        ));

        Arc::new(Self {
            remote,
            outbound,
            pending,
            next_seq: AtomicU64::new(1),
            ctx,
            config,
        })
    }

    /// Peer address of the association.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, frame: Frame) -> Result<(), E2apError> {
        if self.ctx.is_cancelled() {
            return Err(E2apError::ConnectionClosed);
        }
        self.outbound
            .send(frame)
            .await
            .map_err(|_| E2apError::ConnectionClosed)
    }

    async fn request(&self, pdu: E2apPdu) -> Result<E2apPdu, E2apError> {
        let seq = self.next_seq();
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(seq, tx);
        }

        let name = pdu.message_type();
        if let Err(e) = self.send(Frame { seq, pdu }).await {
            self.forget(seq);
            return Err(e);
        }

        match timeout(self.config.request_timeout, rx).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(E2apError::ConnectionClosed),
            Err(_) => {
                self.forget(seq);
                Err(E2apError::Timeout(format!("no answer to {name}")))
            }
        }
    }

    fn forget(&self, seq: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&seq);
        }
    }
}

#[async_trait]
impl E2ClientConn for TcpE2Client {
    async fn e2_setup(&self, request: E2SetupRequest) -> Result<E2SetupOutcome, E2apError> {
        match self.request(E2apPdu::E2SetupRequest(request)).await? {
            E2apPdu::E2SetupResponse(resp) => Ok(Outcome::Success(resp)),
            E2apPdu::E2SetupFailure(failure) => Ok(Outcome::Failure(failure)),
            other => Err(E2apError::UnexpectedMessage {
                expected: "E2SetupResponse",
                actual: other.message_type(),
            }),
        }
    }

    async fn e2_configuration_update(
        &self,
        request: E2NodeConfigurationUpdate,
    ) -> Result<ConfigurationUpdateOutcome, E2apError> {
        match self.request(E2apPdu::E2NodeConfigurationUpdate(request)).await? {
            E2apPdu::E2NodeConfigurationUpdateAcknowledge(ack) => Ok(Outcome::Success(ack)),
            E2apPdu::E2NodeConfigurationUpdateFailure(failure) => Ok(Outcome::Failure(failure)),
            other => Err(E2apError::UnexpectedMessage {
                expected: "E2nodeConfigurationUpdateAcknowledge",
                actual: other.message_type(),
            }),
        }
    }

    async fn ric_indication(&self, indication: RicIndication) -> Result<(), E2apError> {
        let seq = self.next_seq();
        self.send(Frame {
            seq,
            pdu: E2apPdu::RicIndication(indication),
        })
        .await
    }

    async fn close(&self) -> Result<(), E2apError> {
        debug!("Closing E2 association with {}", self.remote);
        self.ctx.cancel();
        Ok(())
    }

    fn context(&self) -> CancellationToken {
        self.ctx.clone()
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<Frame>,
    ctx: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = ctx.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                let bytes = match encode_frame(&frame) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Dropping {}: {}", frame.pdu.message_type(), e);
                        continue;
                    }
                };
                log_e2ap_message(Direction::Tx, frame.pdu.message_type(), &bytes);
                if let Err(e) = write_bytes(&mut writer, &bytes).await {
                    warn!("E2AP write failed: {}", e);
                    break;
                }
            }
        }
    }
    ctx.cancel();
}

async fn write_bytes<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    outbound: mpsc::Sender<Frame>,
    pending: PendingMap,
    handler: Arc<dyn E2NodeHandler>,
    ctx: CancellationToken,
    remote: SocketAddr,
) {
    loop {
        let body = tokio::select! {
            _ = ctx.cancelled() => break,
            body = read_frame_body(&mut reader) => body,
        };
        let frame = match body {
            Ok(Some(body)) => match decode_frame(&body) {
                Ok(frame) => {
                    log_e2ap_message(Direction::Rx, frame.pdu.message_type(), &body);
                    frame
                }
                Err(e) => {
                    warn!("Undecodable E2AP frame from {}: {}", remote, e);
                    break;
                }
            },
            Ok(None) => {
                info!("E2 association with {} closed by peer", remote);
                break;
            }
            Err(e) => {
                warn!("E2AP read from {} failed: {}", remote, e);
                break;
            }
        };

        if frame.pdu.is_initiating() {
            let handler = handler.clone();
            let outbound = outbound.clone();
            tokio::spawn(async move {
                if let Some(answer) = dispatch_initiating(handler.as_ref(), frame.pdu).await {
                    let _ = outbound
                        .send(Frame {
                            seq: frame.seq,
                            pdu: answer,
                        })
                        .await;
                }
            });
        } else {
            let waiter = pending
                .lock()
                .ok()
                .and_then(|mut pending| pending.remove(&frame.seq));
            match waiter {
                Some(tx) => {
                    let _ = tx.send(frame.pdu);
                }
                None => warn!(seq = frame.seq, "Unsolicited {}", frame.pdu.message_type()),
            }
        }
    }

    ctx.cancel();
    // dropping the waiters fails every outstanding request
    if let Ok(mut pending) = pending.lock() {
        pending.clear();
    }
}

/// Hands a RIC-initiated PDU to the handler and returns the answer to send.
pub async fn dispatch_initiating(handler: &dyn E2NodeHandler, pdu: E2apPdu) -> Option<E2apPdu> {
    let result = match pdu {
        E2apPdu::RicSubscriptionRequest(req) => handler.ric_subscription(req).await.map(|o| match o {
            Outcome::Success(resp) => E2apPdu::RicSubscriptionResponse(resp),
            Outcome::Failure(failure) => E2apPdu::RicSubscriptionFailure(failure),
        }),
        E2apPdu::RicSubscriptionDeleteRequest(req) => {
            handler.ric_subscription_delete(req).await.map(|o| match o {
                Outcome::Success(resp) => E2apPdu::RicSubscriptionDeleteResponse(resp),
                Outcome::Failure(failure) => E2apPdu::RicSubscriptionDeleteFailure(failure),
            })
        }
        E2apPdu::RicControlRequest(req) => handler.ric_control(req).await.map(|o| match o {
            Outcome::Success(ack) => E2apPdu::RicControlAcknowledge(ack),
            Outcome::Failure(failure) => E2apPdu::RicControlFailure(failure),
        }),
        E2apPdu::E2ConnectionUpdate(req) => handler.e2_connection_update(req).await.map(|o| match o {
            Outcome::Success(ack) => E2apPdu::E2ConnectionUpdateAcknowledge(ack),
            Outcome::Failure(failure) => E2apPdu::E2ConnectionUpdateFailure(failure),
        }),
        other => {
            warn!("Unsupported RIC-initiated message {}", other.message_type());
            return Some(E2apPdu::ErrorIndication {
                cause: Cause::Protocol(crate::cause::CauseProtocol::MessageNotCompatibleWithReceiverState),
            });
        }
    };

    match result {
        Ok(answer) => Some(answer),
        Err(e) => {
            warn!("RIC procedure failed without an answer: {}", e);
            Some(E2apPdu::ErrorIndication {
                cause: Cause::MISC_UNSPECIFIED,
            })
        }
    }
}
