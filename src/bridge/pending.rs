//! Single pending-request slot
//!
//! The pedal answers one command at a time, so the bridge tracks at most one
//! outstanding request. Starting a new one fails the previous waiter with
//! `Superseded`; disconnecting fails it with `Disconnected`.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::BridgeError;

pub type Outcome = Result<Value, BridgeError>;

/// Request state
#[derive(Debug)]
pub enum PendingState {
    Idle,
    Awaiting {
        id: u64,
        responder: oneshot::Sender<Outcome>,
    },
}

/// Owner of the pending state, with monotonically increasing request ids
#[derive(Debug)]
pub struct PendingSlot {
    state: PendingState,
    next_id: u64,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self {
            state: PendingState::Idle,
            next_id: 1,
        }
    }

    /// Start awaiting a response; a request already in flight is superseded
    pub fn begin(&mut self) -> (u64, oneshot::Receiver<Outcome>) {
        self.fail(BridgeError::Superseded);

        let id = self.next_id;
        self.next_id += 1;
        let (responder, receiver) = oneshot::channel();
        self.state = PendingState::Awaiting {
            id,
            responder,
        };
        (id, receiver)
    }

    /// Deliver an outcome to the current waiter; returns `false` if idle
    pub fn resolve(&mut self, outcome: Outcome) -> bool {
        match std::mem::replace(&mut self.state, PendingState::Idle) {
            PendingState::Awaiting { responder, .. } => {
                // The waiter may already have timed out and dropped its receiver
                let _ = responder.send(outcome);
                true
            }
            PendingState::Idle => false,
        }
    }

    /// Fail the current waiter, if any
    pub fn fail(&mut self, err: BridgeError) -> bool {
        self.resolve(Err(err))
    }

    /// Return to idle if request `id` is still the one in flight
    pub fn expire(&mut self, id: u64) {
        if self.current_id() == Some(id) {
            self.state = PendingState::Idle;
        }
    }

    pub fn current_id(&self) -> Option<u64> {
        match &self.state {
            PendingState::Awaiting { id, .. } => Some(*id),
            PendingState::Idle => None,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.current_id().is_some()
    }
}

impl Default for PendingSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_delivers_once() {
        let mut slot = PendingSlot::new();
        let (_, rx) = slot.begin();
        assert!(slot.is_awaiting());

        assert!(slot.resolve(Ok(json!({"status": "success"}))));
        assert!(!slot.is_awaiting());
        assert!(!slot.resolve(Ok(json!(null))));

        assert_eq!(rx.await.unwrap().unwrap()["status"], "success");
    }

    #[tokio::test]
    async fn test_begin_supersedes_previous() {
        let mut slot = PendingSlot::new();
        let (first_id, first) = slot.begin();
        let (second_id, _second) = slot.begin();

        assert_ne!(first_id, second_id);
        assert_eq!(first.await.unwrap(), Err(BridgeError::Superseded));
        assert_eq!(slot.current_id(), Some(second_id));
    }

    #[tokio::test]
    async fn test_expire_ignores_stale_ids() {
        let mut slot = PendingSlot::new();
        let (old, _rx1) = slot.begin();
        let (new, _rx2) = slot.begin();

        slot.expire(old);
        assert_eq!(slot.current_id(), Some(new));
        slot.expire(new);
        assert!(!slot.is_awaiting());
    }

    #[tokio::test]
    async fn test_fail_with_disconnect() {
        let mut slot = PendingSlot::new();
        let (_, rx) = slot.begin();
        slot.fail(BridgeError::Disconnected);
        assert_eq!(rx.await.unwrap(), Err(BridgeError::Disconnected));
    }
}
