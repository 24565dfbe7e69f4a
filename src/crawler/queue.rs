//! FIFO queue of pending actions

use std::collections::VecDeque;

use thiserror::Error;

use crate::types::Action;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no elements available in the queue")]
    NoElements,
}

/// Single-producer single-consumer FIFO of pending actions
#[derive(Debug, Default)]
pub struct ActionQueue {
    items: VecDeque<Action>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the back of the queue.
    pub fn offer(&mut self, action: Action) {
        self.items.push_back(action);
    }

    /// Remove and return the action at the front of the queue.
    pub fn get(&mut self) -> Result<Action, QueueError> {
        self.items.pop_front().ok_or(QueueError::NoElements)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }
}
