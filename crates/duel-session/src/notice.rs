//! Side-channel notices and connection state.
//!
//! `error`, `disconnected` and `reconnected` frames never reach the game
//! dispatcher. They are turned into user-facing [`Notice`]s and handed to
//! whichever handler the application registered. With no handler
//! registered, a synchronous fallback notification is shown instead
//! (stderr by default), so nothing is dropped silently.
//!
//! ```text
//!   Closed ──(channel open)──→ Open ──(disconnected, room stays)──→ WaitingReconnect
//!     ↑                         ↑ │                                      │
//!     │                         │ └──(disconnected, room closes)──→ Closed
//!     │                         └────────────(reconnected)──────────────┘
//!     └──────────────(connection lost)─── any state
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use duel_protocol::{
    DisconnectedPayload, ErrorCode, ErrorPayload, PlayerId, RawMessage,
    ReconnectedPayload,
};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const ROOM_CLOSING_TITLE: &str = "Connection lost";
const ROOM_CLOSING_MESSAGE: &str =
    "Your opponent disconnected. The room will close.";
const WAITING_MESSAGE: &str =
    "Your opponent disconnected. Waiting for them to return...";

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the session stands, as far as the player is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected and playing.
    Open,
    /// The connection is gone or the room is closing. Terminal.
    Closed,
    /// The opponent dropped; the server holds the room for them.
    WaitingReconnect { opponent: Option<PlayerId> },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A message for the player, with an optional action to run once they
/// acknowledge it.
pub struct Notice {
    pub title: Option<String>,
    pub message: String,
    on_confirm: Option<Box<dyn FnOnce() + Send>>,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            on_confirm: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn on_confirm(mut self, action: impl FnOnce() + Send + 'static) -> Self {
        self.on_confirm = Some(Box::new(action));
        self
    }

    /// Whether acknowledging this notice does something.
    pub fn has_confirm(&self) -> bool {
        self.on_confirm.is_some()
    }

    /// Acknowledges the notice, running its confirm action if any.
    pub fn confirm(self) {
        if let Some(action) = self.on_confirm {
            action();
        }
    }
}

impl fmt::Debug for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notice")
            .field("title", &self.title)
            .field("message", &self.message)
            .field("has_confirm", &self.has_confirm())
            .finish()
    }
}

/// Moves the application to another route (leaving the match screen).
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, route: &str) {
        self(route)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing and routing for room-closing notices.
#[derive(Debug, Clone)]
pub struct SideChannelConfig {
    /// Delay between acknowledging the room-closing notice and leaving.
    pub navigate_delay: Duration,
    /// Delay before leaving when the fallback notification was used.
    pub fallback_navigate_delay: Duration,
    /// Route to leave to.
    pub entrance_route: String,
}

impl Default for SideChannelConfig {
    fn default() -> Self {
        Self {
            navigate_delay: Duration::from_millis(500),
            fallback_navigate_delay: Duration::from_secs(2),
            entrance_route: "/entrance".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// SideChannel
// ---------------------------------------------------------------------------

type NoticeHandler = Arc<dyn Fn(Notice) + Send + Sync>;
type DisconnectHandler = Arc<dyn Fn(bool) + Send + Sync>;
type Fallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    error: Option<NoticeHandler>,
    warning: Option<NoticeHandler>,
    disconnect: Option<DisconnectHandler>,
    navigator: Option<Arc<dyn Navigator>>,
}

struct Inner {
    handlers: RwLock<Handlers>,
    fallback: Fallback,
    state: watch::Sender<ConnectionState>,
    navigated: AtomicBool,
    config: SideChannelConfig,
}

/// Handler registry and connection-state owner for out-of-band frames.
///
/// Cheap to clone; clones share handlers and state.
#[derive(Clone)]
pub struct SideChannel {
    inner: Arc<Inner>,
}

impl Default for SideChannel {
    fn default() -> Self {
        Self::new(SideChannelConfig::default())
    }
}

impl SideChannel {
    /// Creates a side channel whose fallback writes to stderr.
    pub fn new(config: SideChannelConfig) -> Self {
        Self::with_fallback(config, |message: &str| eprintln!("{message}"))
    }

    /// Creates a side channel with a custom fallback notification.
    ///
    /// The fallback runs synchronously whenever a notice has no handler.
    pub fn with_fallback(
        config: SideChannelConfig,
        fallback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            inner: Arc::new(Inner {
                handlers: RwLock::new(Handlers::default()),
                fallback: Arc::new(fallback),
                state,
                navigated: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Registers the handler for error notices.
    pub fn set_error_handler(
        &self,
        handler: impl Fn(Notice) + Send + Sync + 'static,
    ) {
        self.write_handlers().error = Some(Arc::new(handler));
    }

    /// Registers the handler for warnings (the room-closing notice).
    pub fn set_warning_handler(
        &self,
        handler: impl Fn(Notice) + Send + Sync + 'static,
    ) {
        self.write_handlers().warning = Some(Arc::new(handler));
    }

    /// Registers the waiting-for-reconnect overlay toggle.
    ///
    /// Called with `true` when the opponent drops and `false` when they
    /// return.
    pub fn set_disconnect_handler(
        &self,
        handler: impl Fn(bool) + Send + Sync + 'static,
    ) {
        self.write_handlers().disconnect = Some(Arc::new(handler));
    }

    /// Registers where to navigate when the room closes.
    pub fn set_navigator(&self, navigator: impl Navigator) {
        self.write_handlers().navigator = Some(Arc::new(navigator));
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to connection-state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub(crate) fn set_state(&self, next: ConnectionState) {
        let previous = self.inner.state.send_replace(next.clone());
        if previous != next {
            info!(from = ?previous, to = ?next, "connection state changed");
        }
    }

    /// Routes one side-channel frame to its handler.
    pub(crate) fn handle(&self, message: &RawMessage) {
        let outcome = match message.kind() {
            "error" => message
                .decode_payload::<ErrorPayload>()
                .map(|p| self.on_error(p)),
            "disconnected" => message
                .decode_payload::<DisconnectedPayload>()
                .map(|p| self.on_disconnected(p)),
            "reconnected" => message
                .decode_payload::<ReconnectedPayload>()
                .map(|p| self.on_reconnected(p)),
            other => {
                debug!(kind = other, "not a side-channel frame");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(
                kind = message.kind(),
                error = %e,
                "malformed side-channel payload"
            );
            self.report(&ErrorCode::ConnInvalidMessage);
        }
    }

    /// Shows the user-facing message for `code` as an error notice.
    pub fn report(&self, code: &ErrorCode) {
        self.show_error(Notice::new(code.user_message()));
    }

    fn on_error(&self, payload: ErrorPayload) {
        error!(
            code = %payload.error_code,
            category = ?payload.error_code.category(),
            message = %payload.message,
            details = ?payload.details,
            "server reported an error"
        );
        self.report(&payload.error_code);
    }

    fn on_disconnected(&self, payload: DisconnectedPayload) {
        warn!(
            room_will_close = payload.room_will_close,
            player = ?payload.player,
            "opponent disconnected"
        );

        if payload.room_will_close {
            self.set_state(ConnectionState::Closed);
            let warning = self.read_handlers().warning.clone();
            match warning {
                Some(handler) => {
                    let leave = self.leave_after(self.inner.config.navigate_delay);
                    handler(
                        Notice::new(ROOM_CLOSING_MESSAGE)
                            .with_title(ROOM_CLOSING_TITLE)
                            .on_confirm(leave),
                    );
                }
                None => {
                    (self.inner.fallback)(ROOM_CLOSING_MESSAGE);
                    let leave = self
                        .leave_after(self.inner.config.fallback_navigate_delay);
                    leave();
                }
            }
            return;
        }

        self.set_state(ConnectionState::WaitingReconnect {
            opponent: payload.player,
        });
        let disconnect = self.read_handlers().disconnect.clone();
        match disconnect {
            Some(handler) => handler(true),
            None => (self.inner.fallback)(WAITING_MESSAGE),
        }
    }

    fn on_reconnected(&self, payload: ReconnectedPayload) {
        info!(player = ?payload.player, "opponent reconnected");
        self.set_state(ConnectionState::Open);
        let disconnect = self.read_handlers().disconnect.clone();
        match disconnect {
            Some(handler) => handler(false),
            None => debug!("no disconnect handler registered"),
        }
    }

    fn show_error(&self, notice: Notice) {
        let handler = self.read_handlers().error.clone();
        match handler {
            Some(handler) => handler(notice),
            None => (self.inner.fallback)(&notice.message),
        }
    }

    /// Builds the action that leaves the match screen after `delay`.
    ///
    /// The route change happens at most once per side channel, however
    /// many closing notices arrive or get confirmed.
    fn leave_after(&self, delay: Duration) -> impl FnOnce() + Send + 'static {
        let side = self.clone();
        let runtime = Handle::try_current().ok();
        move || {
            let navigate = move || side.navigate_once();
            match runtime {
                Some(runtime) => {
                    runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        navigate();
                    });
                }
                None => navigate(),
            }
        }
    }

    fn navigate_once(&self) {
        if self.inner.navigated.swap(true, Ordering::AcqRel) {
            debug!("already navigated away, ignoring");
            return;
        }
        let route = &self.inner.config.entrance_route;
        let navigator = self.read_handlers().navigator.clone();
        match navigator {
            Some(navigator) => {
                info!(route = %route, "leaving match");
                navigator.navigate(route);
            }
            None => warn!(route = %route, "no navigator registered, staying put"),
        }
    }

    fn read_handlers(&self) -> std::sync::RwLockReadGuard<'_, Handlers> {
        self.inner.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_handlers(&self) -> std::sync::RwLockWriteGuard<'_, Handlers> {
        self.inner.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SideChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideChannel")
            .field("state", &*self.inner.state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
