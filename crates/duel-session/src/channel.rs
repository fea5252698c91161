//! The message channel: one per connection to the game server.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use duel_protocol::{
    Codec, ErrorCode, JsonCodec, Message, ProtocolError, RawMessage,
};
use duel_transport::{Connection, ConnectionId};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::pending::{PendingRequests, generate_request_id};
use crate::{ConnectionState, SessionError, SideChannel};

/// Lifecycle and traffic signals emitted by a [`Channel`].
///
/// Side-channel frames and matched responses are consumed by the channel
/// and never appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// The channel is ready. Always the first signal.
    Open,
    /// A game message, in receipt order.
    Message(RawMessage),
    /// The connection is gone. Always the last signal.
    Close,
}

/// Channel tunables.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long [`Channel::request`] waits for its response.
    pub request_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

struct Inner<C, K> {
    conn: C,
    codec: K,
    open: AtomicBool,
    pending: Mutex<PendingRequests>,
    side: SideChannel,
    config: ChannelConfig,
    shutdown: Notify,
}

/// A message-level view of one connection.
///
/// Cloning is cheap and every clone talks over the same connection.
/// A background reader task owns the receive side; it classifies each
/// inbound frame as side-channel, response, or game message, and emits
/// game messages as [`Signal::Message`] in receipt order.
pub struct Channel<C: Connection, K: Codec = JsonCodec> {
    inner: Arc<Inner<C, K>>,
}

impl<C: Connection, K: Codec> Clone for Channel<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection, K: Codec> fmt::Debug for Channel<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.conn.id())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl<C: Connection, K: Codec> Channel<C, K> {
    /// Wraps an established connection and starts its reader task.
    ///
    /// Must be called inside a Tokio runtime. The returned receiver yields
    /// [`Signal::Open`] first and [`Signal::Close`] last.
    pub fn open(
        conn: C,
        codec: K,
        side: SideChannel,
        config: ChannelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Signal>) {
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            conn,
            codec,
            open: AtomicBool::new(true),
            pending: Mutex::new(PendingRequests::default()),
            side,
            config,
            shutdown: Notify::new(),
        });

        info!(conn = %inner.conn.id(), "channel open");
        inner.side.set_state(ConnectionState::Open);
        let _ = signals.send(Signal::Open);
        tokio::spawn(read_loop(Arc::clone(&inner), signals));

        (Self { inner }, signal_rx)
    }

    /// Whether the connection is open for sending.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.inner.conn.id()
    }

    /// The side channel this channel reports to.
    pub fn side(&self) -> &SideChannel {
        &self.inner.side
    }

    /// Sends a message without waiting for anything back.
    ///
    /// Never fails: when the channel is closed the message is dropped
    /// with a log line, and encode or transport failures are logged.
    pub async fn send<P: Serialize>(&self, message: &Message<P>) {
        if !self.is_open() {
            debug!(
                handler = %message.action.handler,
                kind = %message.action.kind,
                "not connected, dropping outgoing message"
            );
            return;
        }
        let bytes = match self.inner.codec.encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode outgoing message");
                return;
            }
        };
        if let Err(e) = self.inner.conn.send(&bytes).await {
            warn!(conn = %self.connection_id(), error = %e, "send failed");
        }
    }

    /// Sends a message and waits for its response.
    ///
    /// A generated `requestId` is added to the payload, which must be a
    /// JSON object. The response is the first frame echoing that id, or
    /// failing that the first response-shaped frame while this is the
    /// oldest outstanding request.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] if the channel is closed
    /// - [`SessionError::Closed`] if it closes before the response
    /// - [`SessionError::Malformed`] if an unparseable frame arrives first
    /// - [`SessionError::Timeout`] after the configured request timeout
    pub async fn request<P: Serialize>(
        &self,
        message: &Message<P>,
    ) -> Result<RawMessage, SessionError> {
        if !self.is_open() {
            return Err(SessionError::NotConnected);
        }

        let mut raw = message.to_raw()?;
        let request_id = generate_request_id();
        let Some(fields) = raw.payload.as_object_mut() else {
            return Err(ProtocolError::InvalidMessage(
                "request payload must be a JSON object".into(),
            )
            .into());
        };
        fields.insert("requestId".into(), Value::String(request_id.clone()));
        let bytes = self.inner.codec.encode(&raw)?;

        let (reply, response) = oneshot::channel();
        self.inner.lock_pending().insert(request_id.clone(), reply);
        // The reader may have shut down between the check above and the
        // insert; it fails pending requests only after clearing `open`.
        if !self.is_open() {
            self.inner.lock_pending().remove(&request_id);
            return Err(SessionError::Closed);
        }

        if let Err(e) = self.inner.conn.send(&bytes).await {
            self.inner.lock_pending().remove(&request_id);
            return Err(e.into());
        }
        debug!(%request_id, kind = %raw.action.kind, "request sent");

        let timeout = self.inner.config.request_timeout;
        match time::timeout(timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => {
                self.inner.lock_pending().remove(&request_id);
                warn!(%request_id, ?timeout, "request timed out");
                Err(SessionError::Timeout(timeout))
            }
        }
    }

    /// Closes the connection.
    ///
    /// The reader stops, pending requests are rejected, and the signal
    /// stream ends with [`Signal::Close`]. Closing twice is harmless.
    pub async fn close(&self) {
        if !self.inner.open.swap(false, Ordering::AcqRel) {
            return;
        }
        info!(conn = %self.connection_id(), "closing channel");
        if let Err(e) = self.inner.conn.close().await {
            warn!(conn = %self.connection_id(), error = %e, "close failed");
        }
        self.inner.shutdown.notify_one();
    }
}

impl<C: Connection, K: Codec> Inner<C, K> {
    fn lock_pending(&self) -> MutexGuard<'_, PendingRequests> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, message: RawMessage, signals: &mpsc::UnboundedSender<Signal>) {
        trace!(
            handler = %message.action.handler,
            kind = %message.action.kind,
            "frame received"
        );

        if message.is_side_channel() {
            self.side.handle(&message);
            return;
        }

        let message = if message.is_response() {
            match self.lock_pending().complete(message) {
                Some(unclaimed) => {
                    debug!("response with no outstanding request");
                    unclaimed
                }
                None => return,
            }
        } else {
            message
        };

        if signals.send(Signal::Message(message)).is_err() {
            trace!("signal receiver dropped");
        }
    }

    fn malformed(&self, error: ProtocolError) {
        warn!(conn = %self.conn.id(), error = %error, "malformed frame");
        let detail = error.to_string();
        let rejected = self
            .lock_pending()
            .fail_all(|| SessionError::Malformed(detail.clone()));
        if rejected > 0 {
            debug!(rejected, "rejected pending requests");
        }
        self.side.report(&ErrorCode::ConnInvalidMessage);
    }
}

async fn read_loop<C: Connection, K: Codec>(
    inner: Arc<Inner<C, K>>,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let id = inner.conn.id();
    loop {
        let frame = tokio::select! {
            frame = inner.conn.recv() => frame,
            () = inner.shutdown.notified() => {
                debug!(conn = %id, "reader stopped");
                break;
            }
        };

        let bytes = match frame {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                info!(conn = %id, "connection closed by peer");
                break;
            }
            Err(e) => {
                warn!(conn = %id, error = %e, "receive failed");
                break;
            }
        };

        match inner.codec.decode::<RawMessage>(&bytes) {
            Ok(message) => inner.route(message, &signals),
            Err(e) => inner.malformed(e),
        }
    }

    inner.open.store(false, Ordering::Release);
    let rejected = inner.lock_pending().fail_all(|| SessionError::Closed);
    if rejected > 0 {
        debug!(conn = %id, rejected, "rejected pending requests on close");
    }
    inner.side.set_state(ConnectionState::Closed);
    let _ = signals.send(Signal::Close);
}

#[cfg(test)]
mod tests {
    use duel_protocol::Action;
    use duel_transport::MemoryConnection;
    use serde_json::json;

    use super::*;

    fn open_pair() -> (
        Channel<MemoryConnection>,
        mpsc::UnboundedReceiver<Signal>,
        MemoryConnection,
    ) {
        let (client, server) = MemoryConnection::pair();
        let (channel, signals) = Channel::open(
            client,
            JsonCodec,
            SideChannel::with_fallback(Default::default(), |_: &str| {}),
            ChannelConfig::default(),
        );
        (channel, signals, server)
    }

    #[tokio::test]
    async fn test_open_emits_open_first() {
        let (channel, mut signals, _server) = open_pair();
        assert_eq!(signals.recv().await, Some(Signal::Open));
        assert!(channel.is_open());
        assert_eq!(channel.side().state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_close_twice_emits_one_close() {
        let (channel, mut signals, _server) = open_pair();
        channel.close().await;
        channel.close().await;
        assert_eq!(signals.recv().await, Some(Signal::Open));
        assert_eq!(signals.recv().await, Some(Signal::Close));
        assert_eq!(signals.recv().await, None);
        assert_eq!(channel.side().state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_request_payload_must_be_object() {
        let (channel, _signals, _server) = open_pair();
        let msg = Message {
            action: Action::new("room", "join"),
            payload: json!("not an object"),
        };
        let err = channel.request(&msg).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::InvalidMessage(_))
        ));
    }
}
