//! Deferred, exactly-once prompt resolution.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use duel_protocol::PromptId;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::{Outcome, PromptEvent, PromptKind, PromptState, reduce};

struct Inner {
    state: PromptState,
    waiter: Option<oneshot::Sender<Outcome>>,
}

/// Holds at most one pending prompt of a given family.
///
/// Cheap to clone; clones share the slot. All transitions run through
/// [`reduce`] under one lock, so a choice and a deadline that land at the
/// same moment still produce a single outcome.
#[derive(Clone)]
pub struct PromptSlot {
    kind: PromptKind,
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for PromptSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSlot")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

impl PromptSlot {
    pub fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            inner: Arc::new(Mutex::new(Inner {
                state: PromptState::Idle,
                waiter: None,
            })),
        }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Shows a new prompt. `timeout`, if any, bounds how long it can stay
    /// pending.
    ///
    /// A prompt still pending in this slot resolves as
    /// [`Outcome::Cancelled`] first.
    pub fn open(&self, id: PromptId, timeout: Option<Duration>) -> PromptTicket {
        let deadline = timeout.map(|t| Instant::now() + t);
        let (tx, rx) = oneshot::channel();

        let mut inner = self.lock();
        let state = std::mem::take(&mut inner.state);
        let step = reduce(
            state,
            PromptEvent::Open {
                id: id.clone(),
                deadline,
            },
        );
        inner.state = step.state;
        if let Some((previous, outcome)) = step.resolved {
            debug!(kind = %self.kind, prompt_id = %previous, "prompt superseded");
            if let Some(waiter) = inner.waiter.take() {
                let _ = waiter.send(outcome);
            }
        }
        inner.waiter = Some(tx);
        drop(inner);

        debug!(kind = %self.kind, prompt_id = %id, ?timeout, "prompt opened");
        PromptTicket {
            slot: self.clone(),
            id,
            deadline,
            outcome: rx,
        }
    }

    /// Resolves prompt `id` with the player's choice.
    ///
    /// Returns `false` if `id` is not the pending prompt.
    pub fn select(&self, id: &PromptId, choice: Vec<String>) -> bool {
        self.dispatch(PromptEvent::Select {
            id: id.clone(),
            choice,
        })
    }

    /// Resolves prompt `id` as timed out.
    pub fn expire(&self, id: &PromptId) -> bool {
        self.dispatch(PromptEvent::Expire { id: id.clone() })
    }

    /// Withdraws the pending prompt (or only prompt `id`, if given).
    pub fn cancel(&self, id: Option<&PromptId>) -> bool {
        self.dispatch(PromptEvent::Cancel { id: id.cloned() })
    }

    pub fn state(&self) -> PromptState {
        self.lock().state.clone()
    }

    pub fn pending_id(&self) -> Option<PromptId> {
        self.lock().state.pending_id().cloned()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().state.is_pending()
    }

    fn dispatch(&self, event: PromptEvent) -> bool {
        let mut inner = self.lock();
        let state = std::mem::take(&mut inner.state);
        let step = reduce(state, event);
        inner.state = step.state;

        let Some((id, outcome)) = step.resolved else {
            trace!(kind = %self.kind, "prompt event ignored");
            return false;
        };
        debug!(kind = %self.kind, prompt_id = %id, ?outcome, "prompt resolved");
        if let Some(waiter) = inner.waiter.take() {
            let _ = waiter.send(outcome);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claim on one prompt's outcome.
#[derive(Debug)]
pub struct PromptTicket {
    slot: PromptSlot,
    id: PromptId,
    deadline: Option<Instant>,
    outcome: oneshot::Receiver<Outcome>,
}

impl PromptTicket {
    pub fn id(&self) -> &PromptId {
        &self.id
    }

    /// A handle the UI uses to answer this prompt.
    pub fn responder(&self) -> PromptResponder {
        PromptResponder {
            slot: self.slot.clone(),
            id: self.id.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Waits for the prompt to resolve.
    ///
    /// With a deadline, reaching it resolves the prompt as
    /// [`Outcome::TimedOut`] unless something else resolved it first.
    pub async fn wait(mut self) -> Outcome {
        if let Some(deadline) = self.deadline {
            tokio::select! {
                biased;
                outcome = &mut self.outcome => {
                    return outcome.unwrap_or(Outcome::Cancelled);
                }
                () = time::sleep_until(deadline) => {
                    self.slot.expire(&self.id);
                }
            }
        }
        // Whichever transition won has already sent its outcome (or will,
        // for prompts without a deadline).
        self.outcome.await.unwrap_or(Outcome::Cancelled)
    }
}

/// Answers one specific prompt.
///
/// Handed to whatever presents the prompt. Answers for a prompt that has
/// already resolved (or been superseded) are ignored, so a stale UI can't
/// resolve a newer prompt.
#[derive(Debug, Clone)]
pub struct PromptResponder {
    slot: PromptSlot,
    id: PromptId,
}

impl PromptResponder {
    pub fn prompt_id(&self) -> &PromptId {
        &self.id
    }

    pub fn kind(&self) -> PromptKind {
        self.slot.kind()
    }

    /// Answers with `choice`. Returns `false` if the prompt was no longer
    /// pending.
    pub fn select(&self, choice: Vec<String>) -> bool {
        self.slot.select(&self.id, choice)
    }

    /// Answers with a single id.
    pub fn select_one(&self, id: impl Into<String>) -> bool {
        self.select(vec![id.into()])
    }

    /// Withdraws the prompt; it resolves as [`Outcome::Cancelled`].
    pub fn cancel(&self) -> bool {
        self.slot.cancel(Some(&self.id))
    }

    /// Whether the prompt is still waiting for an answer.
    pub fn is_pending(&self) -> bool {
        self.slot.pending_id().as_ref() == Some(&self.id)
    }
}
