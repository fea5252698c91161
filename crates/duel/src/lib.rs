//! # Duel
//!
//! Client core for a real-time card game.
//!
//! The server pushes a stream of game messages; the client reconciles it
//! with the player's input. This crate wires the layers together:
//!
//! - [`DuelClient`] connects, owns the signal loop, and hands out a
//!   [`ClientHandle`] for the UI.
//! - [`Dispatcher`] routes each inbound message: state snapshots to the
//!   [`GameStore`], turn and freeze signals to the [`TurnController`],
//!   visual cues to the effect scheduler, and prompts to a single
//!   interaction worker that sends exactly one reply per prompt.
//! - [`Frontend`] is the rendering side, implemented by the application.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duel::prelude::*;
//!
//! # async fn run() -> Result<(), DuelError> {
//! duel::logging::init();
//! let client = DuelClient::builder(ClientConfig::from_env()?)
//!     .frontend(Headless)
//!     .connect()
//!     .await?;
//! client.run().await
//! # }
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
mod frontend;
pub mod logging;
mod store;
pub mod targeting;
mod turn;

pub use client::{ClientHandle, DuelClient, DuelClientBuilder};
pub use config::{
    ClientConfig, ENV_PLAYER_ID, ENV_SECURE_CONNECTION, ENV_SERVER_HOST,
    ScreenSize,
};
pub use dispatcher::{Dispatcher, Outbox, Prompts};
pub use error::DuelError;
pub use frontend::{
    CardSelector, EffectDialog, Frontend, Headless, InterceptOffer,
    OptionPanel, PanelOption, SelectionMode, UnitSelection,
};
pub use store::GameStore;
pub use turn::TurnController;

pub use duel_effects as effects;
pub use duel_prompt as prompt;
pub use duel_protocol as protocol;
pub use duel_session as session;
pub use duel_timer as timer;
pub use duel_transport as transport;

pub mod prelude {
    //! The types most applications need.

    pub use crate::{
        CardSelector, ClientConfig, ClientHandle, DuelClient,
        DuelClientBuilder, DuelError, EffectDialog, Frontend, Headless,
        InterceptOffer, OptionPanel, SelectionMode, UnitSelection,
    };
    pub use duel_effects::{EffectBoard, Point};
    pub use duel_prompt::{Outcome, PromptResponder};
    pub use duel_protocol::{PlayerId, PromptId, SoundId};
    pub use duel_session::{ConnectionState, Notice};
}
