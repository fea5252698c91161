//! Outstanding requests awaiting a response.
//!
//! Every request carries a generated `requestId`. A response that echoes
//! a known id completes that request; a response-shaped frame with no
//! known id completes the oldest outstanding request instead, which keeps
//! servers that answer without echoing the id working for one request at
//! a time.

use std::collections::VecDeque;

use duel_protocol::RawMessage;
use rand::Rng;
use tokio::sync::oneshot;
use tracing::trace;

use crate::SessionError;

pub(crate) type Reply = oneshot::Sender<Result<RawMessage, SessionError>>;

/// Requests in the order they were sent.
#[derive(Default)]
pub(crate) struct PendingRequests {
    waiting: VecDeque<(String, Reply)>,
}

impl PendingRequests {
    pub(crate) fn insert(&mut self, request_id: String, reply: Reply) {
        self.waiting.push_back((request_id, reply));
    }

    /// Forgets a request (timed out or failed to send).
    pub(crate) fn remove(&mut self, request_id: &str) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|(id, _)| id != request_id);
        self.waiting.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Hands `response` to the request it answers.
    ///
    /// Returns the response back when no request is waiting for it.
    pub(crate) fn complete(
        &mut self,
        response: RawMessage,
    ) -> Option<RawMessage> {
        // Waiters that gave up (timeout, dropped future) can't take it.
        self.waiting.retain(|(_, reply)| !reply.is_closed());

        let index = response
            .request_id()
            .and_then(|id| self.waiting.iter().position(|(p, _)| p == id))
            .unwrap_or(0);
        let Some((request_id, reply)) = self.waiting.remove(index) else {
            return Some(response);
        };

        trace!(%request_id, "response matched");
        match reply.send(Ok(response)) {
            Ok(()) => None,
            Err(Ok(unclaimed)) => Some(unclaimed),
            Err(Err(_)) => None,
        }
    }

    /// Rejects every outstanding request. Returns how many were rejected.
    pub(crate) fn fail_all(
        &mut self,
        mut error: impl FnMut() -> SessionError,
    ) -> usize {
        let count = self.waiting.len();
        for (request_id, reply) in self.waiting.drain(..) {
            trace!(%request_id, "rejecting pending request");
            let _ = reply.send(Err(error()));
        }
        count
    }
}

/// Generates a random 32-character hex request id (128 bits).
pub(crate) fn generate_request_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
