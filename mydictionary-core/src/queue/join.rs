//! Indexed fan-out/join.
//!
//! A [`JoinGroup`] hands out one [`JoinSlot`] per unit of work. Each slot is
//! filled exactly once (leaving consumes it) and [`JoinGroup::wait`]
//! resolves once every slot has been filled, yielding the values in slot
//! order regardless of completion order.

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    /// A slot was dropped without ever being filled.
    #[error("join slot {index} was dropped without a result")]
    Abandoned { index: usize },
}

pub struct JoinGroup<T> {
    slots: Vec<oneshot::Receiver<T>>,
}

/// A pending entry in a [`JoinGroup`].
#[must_use = "a slot must be left exactly once or the join reports it abandoned"]
pub struct JoinSlot<T> {
    index: usize,
    tx: oneshot::Sender<T>,
}

impl<T> JoinGroup<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Registers one more outstanding unit of work.
    pub fn enter(&mut self) -> JoinSlot<T> {
        let (tx, rx) = oneshot::channel();
        let index = self.slots.len();
        self.slots.push(rx);
        JoinSlot { index, tx }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Waits for every slot. Values come back in the order slots were entered.
    pub async fn wait(self) -> Result<Vec<T>, JoinError> {
        join_all(self.slots)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, value)| value.map_err(|_| JoinError::Abandoned { index }))
            .collect()
    }
}

impl<T> Default for JoinGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JoinSlot<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fills the slot.
    pub fn leave(self, value: T) {
        // The group may already have been dropped; nobody is waiting then.
        let _ = self.tx.send(value);
    }
}
