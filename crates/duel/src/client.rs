//! `DuelClient` builder and signal loop.
//!
//! This is the application root. It ties the layers together:
//! transport → protocol → session (channel) → dispatcher.

use std::sync::Arc;

use duel_effects::EffectScheduler;
use duel_protocol::{ClientPayload, ErrorCode, JsonCodec, Message, RawMessage};
use duel_session::{
    Channel, ChannelConfig, ConnectionState, Navigator, Notice, SideChannel,
    Signal,
};
use duel_transport::{Connection, Connector, WebSocketConnection, WebSocketConnector};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, Outbox, Prompts};
use crate::frontend::{Frontend, Headless};
use crate::store::GameStore;
use crate::turn::TurnController;
use crate::DuelError;

/// Builder for a [`DuelClient`].
///
/// # Example
///
/// ```rust,no_run
/// use duel::prelude::*;
///
/// # async fn run() -> Result<(), DuelError> {
/// let config = ClientConfig::from_env()?;
/// let client = DuelClient::builder(config)
///     .on_error(|notice| eprintln!("{}", notice.message))
///     .connect()
///     .await?;
/// client.run().await
/// # }
/// ```
pub struct DuelClientBuilder {
    config: ClientConfig,
    frontend: Arc<dyn Frontend>,
    side: SideChannel,
}

impl DuelClientBuilder {
    /// Creates a builder with a headless frontend and the stderr fallback
    /// for notices.
    pub fn new(config: ClientConfig) -> Self {
        let config = config.validated();
        let side = SideChannel::new(config.side_channel.clone());
        Self {
            config,
            frontend: Arc::new(Headless),
            side,
        }
    }

    /// Sets what renders prompts and plays cues.
    pub fn frontend(mut self, frontend: impl Frontend) -> Self {
        self.frontend = Arc::new(frontend);
        self
    }

    /// Replaces the side channel, e.g. to supply a custom fallback
    /// notification. Handlers registered earlier are discarded.
    pub fn side_channel(mut self, side: SideChannel) -> Self {
        self.side = side;
        self
    }

    /// Sets the error overlay.
    pub fn on_error(self, handler: impl Fn(Notice) + Send + Sync + 'static) -> Self {
        self.side.set_error_handler(handler);
        self
    }

    /// Sets the warning overlay (the room-closing notice).
    pub fn on_warning(self, handler: impl Fn(Notice) + Send + Sync + 'static) -> Self {
        self.side.set_warning_handler(handler);
        self
    }

    /// Sets the waiting-for-reconnect overlay toggle.
    pub fn on_disconnect(self, handler: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.side.set_disconnect_handler(handler);
        self
    }

    /// Sets where to go when the room closes.
    pub fn navigator(self, navigator: impl Navigator) -> Self {
        self.side.set_navigator(navigator);
        self
    }

    /// Connects to the configured server over WebSocket.
    ///
    /// # Errors
    /// Returns [`DuelError::Transport`] if the connection fails.
    pub async fn connect(self) -> Result<DuelClient<WebSocketConnection>, DuelError> {
        let url = self.config.url();
        info!(%url, player = %self.config.player_id, "connecting");
        let conn = WebSocketConnector.connect(&url).await?;
        Ok(self.attach(conn))
    }

    /// Runs the client over an already-established connection.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn attach<C: Connection>(self, conn: C) -> DuelClient<C> {
        let channel_config = ChannelConfig {
            request_timeout: self.config.request_timeout,
        };
        let (channel, signals) = Channel::open(conn, JsonCodec, self.side, channel_config);
        let dispatcher = Dispatcher::new(self.config, self.frontend, channel);
        DuelClient {
            dispatcher,
            signals,
        }
    }
}

/// A connected client.
///
/// Call [`run()`](Self::run) to start processing server messages. Use
/// [`handle()`](Self::handle) beforehand to keep a way to act and observe.
pub struct DuelClient<C: Connection> {
    dispatcher: Dispatcher<Channel<C>>,
    signals: mpsc::UnboundedReceiver<Signal>,
}

impl DuelClient<WebSocketConnection> {
    /// Creates a new builder.
    pub fn builder(config: ClientConfig) -> DuelClientBuilder {
        DuelClientBuilder::new(config)
    }
}

impl<C: Connection> DuelClient<C> {
    /// A cloneable handle for the UI.
    pub fn handle(&self) -> ClientHandle<C> {
        ClientHandle {
            dispatcher: self.dispatcher.clone(),
        }
    }

    /// Processes server messages until the connection closes.
    ///
    /// Closing is not an error: open prompts are withdrawn and this
    /// returns `Ok(())`. A game message that can't be decoded is reported
    /// through the side channel and skipped.
    pub async fn run(mut self) -> Result<(), DuelError> {
        let channel = self.dispatcher.outbox().clone();
        while let Some(signal) = self.signals.recv().await {
            match signal {
                Signal::Open => {
                    info!(conn = %channel.connection_id(), "connected");
                }
                Signal::Message(message) => {
                    if let Err(e) = self.dispatcher.handle(&message) {
                        warn!(kind = %message.action.kind, error = %e, "undecodable game message");
                        channel.side().report(&ErrorCode::ConnInvalidMessage);
                    }
                }
                Signal::Close => {
                    info!(conn = %channel.connection_id(), "disconnected");
                    self.dispatcher.cancel_prompts();
                    break;
                }
            }
        }
        debug!("client loop finished");
        Ok(())
    }
}

/// What the UI holds on to: game actions plus read access to every piece
/// of client state.
pub struct ClientHandle<C: Connection> {
    dispatcher: Dispatcher<Channel<C>>,
}

impl<C: Connection> Clone for ClientHandle<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C: Connection> ClientHandle<C> {
    fn channel(&self) -> &Channel<C> {
        self.dispatcher.outbox()
    }

    async fn send(&self, payload: ClientPayload) {
        Outbox::send(self.channel(), payload).await;
    }

    fn local(&self) -> duel_protocol::PlayerId {
        self.dispatcher.config().player_id.clone()
    }

    /// Ends the local player's turn.
    ///
    /// Returns `false` without sending anything if the player may not act
    /// right now.
    pub async fn end_turn(&self) -> bool {
        let turn = self.dispatcher.turn();
        if !turn.operable() {
            debug!("turn end ignored, not operable");
            return false;
        }
        self.send(ClientPayload::TurnEnd {
            player: self.local(),
        })
        .await;
        turn.end_turn();
        true
    }

    /// Debug: draws a card.
    pub async fn debug_draw(&self) {
        self.send(ClientPayload::DebugDraw {
            player: self.local(),
        })
        .await;
    }

    /// Debug: adds the catalog card `catalog_id` to the hand.
    pub async fn debug_make(&self, catalog_id: impl Into<String>) {
        self.send(ClientPayload::DebugMake {
            player: self.local(),
            catalog_id: catalog_id.into(),
        })
        .await;
    }

    /// Debug: plays the catalog card `catalog_id` directly.
    pub async fn debug_drive(&self, catalog_id: impl Into<String>) {
        self.send(ClientPayload::DebugDrive {
            player: self.local(),
            catalog_id: catalog_id.into(),
        })
        .await;
    }

    /// Sends a payload and waits for the correlated response.
    ///
    /// # Errors
    /// See [`Channel::request`].
    pub async fn request(&self, payload: ClientPayload) -> Result<RawMessage, DuelError> {
        Ok(self.channel().request(&Message::outgoing(payload)).await?)
    }

    /// Closes the card dialog. A card selection still pending is answered
    /// with nothing selected.
    pub fn close_card_dialog(&self) {
        self.dispatcher.prompts().card.cancel(None);
        self.dispatcher.frontend().close_card_dialog();
    }

    /// Closes the connection; [`DuelClient::run`] then returns.
    pub async fn close(&self) {
        self.channel().close().await;
    }

    pub fn is_open(&self) -> bool {
        self.channel().is_open()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel().side().state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.channel().side().subscribe()
    }

    pub fn side_channel(&self) -> &SideChannel {
        self.channel().side()
    }

    pub fn store(&self) -> &GameStore {
        self.dispatcher.store()
    }

    pub fn turn(&self) -> &TurnController {
        self.dispatcher.turn()
    }

    pub fn effects(&self) -> &EffectScheduler {
        self.dispatcher.effects()
    }

    pub fn prompts(&self) -> &Prompts {
        self.dispatcher.prompts()
    }

    pub fn config(&self) -> &ClientConfig {
        self.dispatcher.config()
    }
}
