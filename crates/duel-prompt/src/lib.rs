//! Prompt coordination for the duel client.
//!
//! Every server prompt (pick an option, pick cards, pick a target...) is
//! turned into an awaitable result that resolves exactly once, from
//! exactly one of: the player's choice, the deadline, or cancellation.
//!
//! Two layers:
//!
//! - [`PromptState`] + [`reduce`]: a pure state machine. Resolution is a
//!   state transition, and any event that arrives after the prompt has
//!   resolved is a no-op.
//! - [`PromptSlot`]: one per prompt family. Owns the state behind a mutex
//!   and hands out a [`PromptTicket`] whose [`wait`](PromptTicket::wait)
//!   completes with the [`Outcome`].
//!
//! ```text
//!            open                select / expire / cancel
//!   Idle ──────────→ Pending ─────────────────────────────→ Resolved
//!                      │  ↑                                    │
//!                      └──┘ open (previous resolves Cancelled)  │
//!                        ↑───────────────── open ──────────────┘
//! ```

mod slot;
mod state;

pub use slot::{PromptResponder, PromptSlot, PromptTicket};
pub use state::{Outcome, PromptEvent, PromptKind, PromptState, Step, reduce};
