//! Routing of inbound game messages.
//!
//! Every message goes through [`Dispatcher::handle`] in receipt order.
//! Messages that wait on the player (`DisplayEffect`, `Choices`) are queued
//! for a single interaction worker, which runs them strictly one at a time
//! and sends each prompt's reply. Everything else is applied immediately
//! and never waits behind an open prompt.
//!
//! A `Selected` push can arrive while the option prompt it withdraws is
//! still queued. Such a prompt is marked moot and answered with an empty
//! choice when its turn comes, without ever being shown.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use duel_effects::{CardUsage, EffectScheduler, TurnSide};
use duel_prompt::{Outcome, PromptKind, PromptSlot, PromptTicket};
use duel_protocol::{
    Choices, ClientPayload, Codec, Message, OperationAction, PlayerId,
    PromptId, ProtocolError, Push, RawMessage, SoundId, VisualEffect,
};
use duel_session::Channel;
use duel_transport::Connection;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::frontend::{
    CardSelector, EffectDialog, Frontend, InterceptOffer, OptionPanel,
    SelectionMode, UnitSelection,
};
use crate::store::GameStore;
use crate::targeting;
use crate::turn::TurnController;

/// Where prompt replies and game actions go.
pub trait Outbox: Send + Sync + 'static {
    /// Sends one outgoing payload. Never fails; a closed connection drops
    /// it.
    fn send(&self, payload: ClientPayload) -> impl Future<Output = ()> + Send;
}

impl<C: Connection, K: Codec> Outbox for Channel<C, K> {
    async fn send(&self, payload: ClientPayload) {
        Channel::send(self, &Message::outgoing(payload)).await;
    }
}

/// One prompt slot per prompt family.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub option: PromptSlot,
    pub card: PromptSlot,
    pub unit: PromptSlot,
    pub block: PromptSlot,
    pub intercept: PromptSlot,
    pub effect: PromptSlot,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            option: PromptSlot::new(PromptKind::Option),
            card: PromptSlot::new(PromptKind::Card),
            unit: PromptSlot::new(PromptKind::Unit),
            block: PromptSlot::new(PromptKind::Block),
            intercept: PromptSlot::new(PromptKind::Intercept),
            effect: PromptSlot::new(PromptKind::Effect),
        }
    }
}

impl Prompts {
    fn all(&self) -> [&PromptSlot; 6] {
        [
            &self.option,
            &self.card,
            &self.unit,
            &self.block,
            &self.intercept,
            &self.effect,
        ]
    }

    /// Withdraws every pending prompt. Each still gets its (empty) reply.
    pub fn cancel_all(&self) -> usize {
        self.all()
            .into_iter()
            .filter(|slot| slot.cancel(None))
            .count()
    }

    /// Whether any prompt is waiting on the player.
    pub fn any_pending(&self) -> bool {
        self.all().into_iter().any(PromptSlot::is_pending)
    }
}

/// Work for the interaction worker.
enum Interaction {
    Push(Push),
    /// A prompt whose body couldn't be decoded. It still gets its reply.
    Unreadable(PromptId),
}

/// An option prompt waiting in the interaction queue.
#[derive(Debug)]
struct QueuedOption {
    id: PromptId,
    moot: bool,
}

struct Shared<O> {
    config: ClientConfig,
    frontend: Arc<dyn Frontend>,
    outbox: O,
    store: GameStore,
    turn: TurnController,
    effects: EffectScheduler,
    prompts: Prompts,
    queued_options: Mutex<VecDeque<QueuedOption>>,
}

/// The event dispatcher.
///
/// Cheap to clone. Must be created inside a Tokio runtime; the interaction
/// worker stops once every clone is dropped.
pub struct Dispatcher<O: Outbox> {
    shared: Arc<Shared<O>>,
    interactions: mpsc::UnboundedSender<Interaction>,
}

impl<O: Outbox> Clone for Dispatcher<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            interactions: self.interactions.clone(),
        }
    }
}

impl<O: Outbox> Dispatcher<O> {
    pub fn new(config: ClientConfig, frontend: Arc<dyn Frontend>, outbox: O) -> Self {
        let store = GameStore::new();
        let turn = TurnController::new(
            config.player_id.clone(),
            config.turn_timer,
            config.mulligan,
        );
        let effects = EffectScheduler::new(config.effects.clone());
        let shared = Arc::new(Shared {
            config,
            frontend,
            outbox,
            store,
            turn,
            effects,
            prompts: Prompts::default(),
            queued_options: Mutex::new(VecDeque::new()),
        });

        let (interactions, queue) = mpsc::unbounded_channel();
        tokio::spawn(interaction_worker(Arc::clone(&shared), queue));
        Self {
            shared,
            interactions,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &GameStore {
        &self.shared.store
    }

    pub fn turn(&self) -> &TurnController {
        &self.shared.turn
    }

    pub fn effects(&self) -> &EffectScheduler {
        &self.shared.effects
    }

    pub fn prompts(&self) -> &Prompts {
        &self.shared.prompts
    }

    pub fn frontend(&self) -> &Arc<dyn Frontend> {
        &self.shared.frontend
    }

    pub fn outbox(&self) -> &O {
        &self.shared.outbox
    }

    /// Handles one inbound game message.
    ///
    /// A `Choices` push for the local player that fails to decode is still
    /// answered, with an empty choice, so the server isn't left waiting.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the payload is not a push this
    /// client understands the shape of. Unknown payload types are not an
    /// error; they are logged and skipped.
    pub fn handle(&self, message: &RawMessage) -> Result<(), ProtocolError> {
        match message.decode_payload::<Push>() {
            Ok(push) => {
                self.handle_push(push);
                Ok(())
            }
            Err(e) => {
                if let Some(header) = message.prompt_header() {
                    if header.player == *self.shared.local() {
                        self.enqueue(Interaction::Unreadable(header.prompt_id));
                    }
                }
                Err(e)
            }
        }
    }

    fn enqueue(&self, interaction: Interaction) {
        if self.interactions.send(interaction).is_err() {
            warn!("interaction worker stopped, dropping prompt");
        }
    }

    /// Handles one decoded push.
    pub fn handle_push(&self, push: Push) {
        trace!(kind = push.type_name(), "dispatching");
        let shared = &self.shared;
        match push {
            Push::Sync { body } => {
                shared.store.replace(body);
            }
            Push::MulliganStart {} => {
                shared.frontend.show_mulligan();
                if shared.turn.start_mulligan() {
                    debug!("mulligan countdown started");
                } else {
                    debug!("mulligan countdown already running");
                }
            }
            Push::Selected { prompt_id } => {
                if shared.withdraw_option(prompt_id.as_ref()) {
                    debug!(prompt = ?prompt_id, "option prompt made moot");
                }
                shared.frontend.clear_options();
            }
            Push::SoundEffect { sound_id } => {
                shared.frontend.play_sound(&sound_id);
            }
            Push::VisualEffect { body } => shared.visual_effect(body),
            Push::TurnChange { player, is_first } => {
                shared.play("turnchange");
                let side = if is_first {
                    TurnSide::First
                } else {
                    TurnSide::Second
                };
                shared.effects.show_turn_banner(side);
                shared.turn.turn_changed(player);
            }
            Push::Operation { action } => match action {
                OperationAction::Freeze => shared.turn.freeze(),
                OperationAction::Defrost => shared.turn.defrost(),
            },
            push @ (Push::DisplayEffect { .. } | Push::Choices { .. }) => {
                if let Push::Choices {
                    prompt_id,
                    choices: Choices::Option { .. },
                    ..
                } = &push
                {
                    shared.queued_options().push_back(QueuedOption {
                        id: prompt_id.clone(),
                        moot: false,
                    });
                }
                self.enqueue(Interaction::Push(push));
            }
            Push::Unknown => debug!("ignoring unknown push"),
        }
    }

    /// Withdraws every open prompt, e.g. when the connection closes.
    pub fn cancel_prompts(&self) -> usize {
        let cancelled = self.shared.prompts.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "pending prompts withdrawn");
        }
        cancelled
    }
}

async fn interaction_worker<O: Outbox>(
    shared: Arc<Shared<O>>,
    mut queue: mpsc::UnboundedReceiver<Interaction>,
) {
    while let Some(interaction) = queue.recv().await {
        let push = match interaction {
            Interaction::Push(push) => push,
            Interaction::Unreadable(prompt_id) => {
                warn!(prompt = %prompt_id, "unreadable prompt, answering with nothing");
                let player = shared.local().clone();
                shared
                    .outbox
                    .send(ClientPayload::Choose {
                        player,
                        prompt_id,
                        choice: Vec::new(),
                    })
                    .await;
                continue;
            }
        };
        match push {
            Push::DisplayEffect {
                prompt_id,
                title,
                message,
                unit_id,
                ..
            } => {
                let dialog = EffectDialog {
                    title,
                    message,
                    unit_id,
                };
                shared.display_effect(prompt_id, dialog).await;
            }
            Push::Choices {
                prompt_id,
                player,
                choices,
                deadline_seconds,
            } => {
                let deadline = deadline_seconds.map(|s| Duration::from_secs(s.max(1)));
                shared.choices(prompt_id, player, choices, deadline).await;
            }
            other => warn!(kind = other.type_name(), "not an interaction, skipping"),
        }
    }
    debug!("interaction worker stopped");
}

impl<O: Outbox> Shared<O> {
    fn local(&self) -> &PlayerId {
        &self.config.player_id
    }

    fn play(&self, sound: &str) {
        self.frontend.play_sound(&SoundId::from(sound));
    }

    fn queued_options(&self) -> MutexGuard<'_, VecDeque<QueuedOption>> {
        self.queued_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Withdraws the open option prompt, or marks a queued one moot.
    /// `None` matches whichever comes first.
    fn withdraw_option(&self, id: Option<&PromptId>) -> bool {
        // The worker opens the option slot under this same lock.
        let mut queued = self.queued_options();
        if self.prompts.option.cancel(id) {
            return true;
        }
        match queued
            .iter_mut()
            .find(|entry| !entry.moot && id.is_none_or(|id| entry.id == *id))
        {
            Some(entry) => {
                entry.moot = true;
                true
            }
            None => false,
        }
    }

    /// Opens the option slot for a dequeued prompt, unless it became moot
    /// while queued.
    fn open_option(&self, prompt_id: &PromptId, limit: Duration) -> Option<PromptTicket> {
        let mut queued = self.queued_options();
        let index = queued.iter().position(|entry| entry.id == *prompt_id);
        let moot = index
            .and_then(|index| queued.remove(index))
            .is_some_and(|entry| entry.moot);
        if moot {
            return None;
        }
        Some(self.open(&self.prompts.option, prompt_id, limit))
    }

    async fn display_effect(&self, prompt_id: PromptId, dialog: EffectDialog) {
        self.play("effect");
        self.effects.highlight_unit(dialog.unit_id.clone());

        let ticket = self
            .prompts
            .effect
            .open(prompt_id.clone(), Some(self.config.prompt_watchdog));
        self.frontend.show_effect_dialog(dialog, ticket.responder());
        let outcome = ticket.wait().await;
        if outcome == Outcome::TimedOut {
            warn!(prompt = %prompt_id, "effect dialog not acknowledged, continuing");
        }

        self.effects.highlight_unit(None);
        let player = self.local().clone();
        self.outbox
            .send(ClientPayload::Continue { player, prompt_id })
            .await;
    }

    async fn choices(
        &self,
        prompt_id: PromptId,
        player: PlayerId,
        choices: Choices,
        deadline: Option<Duration>,
    ) {
        let mine = player == *self.local();
        debug!(prompt = %prompt_id, kind = choices.kind_name(), %player, mine, "prompt received");

        // Option panels are shown (and answered) whoever they belong to.
        // Every other family is left to the player it addresses.
        if !mine && !matches!(choices, Choices::Option { .. }) {
            debug!(prompt = %prompt_id, %player, "prompt addressed to another player");
            return;
        }
        self.frontend.close_card_dialog();
        let watchdog = deadline.unwrap_or(self.config.prompt_watchdog);

        match choices {
            Choices::Option { title, items } => {
                let time_limit = self.config.option_deadline;
                let Some(ticket) = self.open_option(&prompt_id, time_limit) else {
                    debug!(prompt = %prompt_id, "option prompt withdrawn while queued");
                    self.choose(PromptKind::Option, prompt_id, Outcome::Cancelled, 1)
                        .await;
                    return;
                };
                let panel = OptionPanel {
                    title,
                    options: items.into_iter().map(Into::into).collect(),
                    player,
                    is_mine: mine,
                    time_limit,
                };
                self.frontend.show_options(panel, ticket.responder());
                self.play("choices");

                let outcome = ticket.wait().await;
                if matches!(&outcome, Outcome::Selected(ids) if !ids.is_empty()) {
                    self.play("select");
                }
                self.frontend.clear_options();
                self.choose(PromptKind::Option, prompt_id, outcome, 1).await;
            }
            Choices::Card { title, items, count } => {
                let time_limit = deadline.unwrap_or(self.config.card_deadline);
                let ticket = self.open(&self.prompts.card, &prompt_id, time_limit);
                let selector = CardSelector {
                    title,
                    items,
                    count,
                    time_limit,
                };
                self.frontend.open_card_selector(selector, ticket.responder());
                let outcome = ticket.wait().await;
                self.frontend.close_card_dialog();
                self.choose(PromptKind::Card, prompt_id, outcome, count).await;
            }
            Choices::Intercept { title, items } => {
                let ticket = self.open(&self.prompts.intercept, &prompt_id, watchdog);
                self.frontend
                    .offer_intercepts(InterceptOffer { title, items }, ticket.responder());
                let outcome = ticket.wait().await;
                self.frontend.clear_intercepts();
                self.choose(PromptKind::Intercept, prompt_id, outcome, 1).await;
            }
            Choices::Unit {
                title,
                items,
                is_cancelable,
            } => {
                let selection = UnitSelection {
                    title,
                    items,
                    mode: SelectionMode::Target,
                    is_cancelable,
                };
                self.select_unit(&self.prompts.unit, prompt_id, selection, watchdog)
                    .await;
            }
            Choices::Block {
                title,
                items,
                is_cancelable,
            } => {
                let selection = UnitSelection {
                    title,
                    items,
                    mode: SelectionMode::Block,
                    is_cancelable,
                };
                self.select_unit(&self.prompts.block, prompt_id, selection, watchdog)
                    .await;
            }
        }
    }

    async fn select_unit(
        &self,
        slot: &PromptSlot,
        prompt_id: PromptId,
        selection: UnitSelection,
        limit: Duration,
    ) {
        let ticket = self.open(slot, &prompt_id, limit);
        self.frontend.select_unit(selection, ticket.responder());
        let outcome = ticket.wait().await;
        self.frontend.clear_unit_selection();
        self.choose(slot.kind(), prompt_id, outcome, 1).await;
    }

    fn open(&self, slot: &PromptSlot, prompt_id: &PromptId, limit: Duration) -> PromptTicket {
        slot.open(prompt_id.clone(), Some(limit))
    }

    /// Sends the one reply a prompt gets, keeping at most `max` ids.
    async fn choose(&self, kind: PromptKind, prompt_id: PromptId, outcome: Outcome, max: usize) {
        match &outcome {
            Outcome::TimedOut => info!(prompt = %prompt_id, %kind, "prompt timed out"),
            Outcome::Cancelled => debug!(prompt = %prompt_id, %kind, "prompt cancelled"),
            Outcome::Selected(ids) => debug!(prompt = %prompt_id, %kind, ?ids, "prompt answered"),
        }
        let mut choice = outcome.into_choice();
        if choice.len() > max {
            warn!(prompt = %prompt_id, %kind, picked = choice.len(), max, "too many picks, truncating");
            choice.truncate(max);
        }
        let player = self.local().clone();
        self.outbox
            .send(ClientPayload::Choose {
                player,
                prompt_id,
                choice,
            })
            .await;
    }

    fn visual_effect(&self, effect: VisualEffect) {
        let position = |unit: &str| self.frontend.unit_position(unit);
        let screen = self.config.screen;
        let timings = self.effects.timings().clone();

        match effect {
            VisualEffect::Attack { attacker_id } => {
                let origin = targeting::attack_origin(attacker_id.as_deref(), position, screen);
                let is_own = targeting::is_own_unit(attacker_id.as_deref(), self.local());
                self.effects.declare_attack(attacker_id, is_own, origin);
            }
            VisualEffect::Block { blocker_id } => {
                let Some(blocker_id) = blocker_id else {
                    return;
                };
                let key = self.effects.add_status_change(&blocker_id, "block", 0);
                self.effects.remove_after(key, timings.status_change);
                self.effects.declare_block(blocker_id);
            }
            VisualEffect::Launch {
                attacker_id,
                blocker_id,
            } => {
                let snapshot = self.store.current();
                let target = targeting::launch_target(
                    attacker_id.as_deref(),
                    blocker_id.as_deref(),
                    position,
                    snapshot.as_deref(),
                    self.local(),
                    screen,
                );
                self.effects.launch(target);
            }
            VisualEffect::Status {
                unit_id,
                kind,
                value,
            } => {
                let key = self.effects.add_status_change(&unit_id, &kind, value);
                self.effects.remove_after(key, timings.status_change);
            }
            VisualEffect::Drive {
                kind,
                player,
                image,
            } => {
                let position = targeting::usage_position(&kind, &player, self.local());
                self.effects.show_card_usage(CardUsage {
                    image,
                    kind,
                    position,
                });
            }
            VisualEffect::LaunchCancel {} => self.effects.cancel_launch(),
            VisualEffect::Select { unit_id } => {
                let key = self.effects.add_select_ring(&unit_id);
                self.effects.remove_after(key, timings.select_ring);
            }
            VisualEffect::Overclock { unit_id } => {
                let key = self.effects.add_overclock(&unit_id);
                self.effects.remove_after(key, timings.overclock);
            }
            VisualEffect::Unknown => debug!("ignoring unknown visual effect"),
        }
    }
}
