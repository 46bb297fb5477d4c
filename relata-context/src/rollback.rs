//! Rollback handlers
//!
//! Objects changed inside a transaction register a handler that restores
//! their in-memory state if the transaction is rolled back. One handler is
//! kept per object; on commit every handler is discarded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What happens to the registered handlers when a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseAction {
    Discard,
    Rollback,
}

/// Restores one object's state after a database rollback.
pub trait RollbackHandler: Send {
    /// Identity of the object this handler restores.
    fn object_key(&self) -> &str;

    /// Fold in a later handler for the same object.
    ///
    /// The default keeps this handler, which holds the oldest state.
    fn combine(&mut self, later: Box<dyn RollbackHandler>) {
        let _ = later;
    }

    fn rollback(&mut self);

    fn discard(&mut self) {}
}

/// Handlers of the current transaction, in registration order.
#[derive(Default)]
pub struct RollbackManager {
    handlers: Vec<Box<dyn RollbackHandler>>,
}

impl std::fmt::Debug for RollbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl RollbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, object_key: &str) -> bool {
        self.handlers.iter().any(|h| h.object_key() == object_key)
    }

    /// Register a handler, combining it with an existing one for the same
    /// object.
    pub fn append(&mut self, handler: Box<dyn RollbackHandler>) {
        let key = handler.object_key().to_string();
        match self.handlers.iter_mut().find(|h| h.object_key() == key) {
            Some(existing) => existing.combine(handler),
            None => self.handlers.push(handler),
        }
        debug!(object = %key, "rollback handler added");
    }

    /// Remove and discard the handler of one object.
    pub fn remove(&mut self, object_key: &str) -> bool {
        let Some(index) = self
            .handlers
            .iter()
            .position(|h| h.object_key() == object_key)
        else {
            return false;
        };
        let mut handler = self.handlers.remove(index);
        debug!(object = %object_key, "rollback handler removed");
        handler.discard();
        true
    }

    /// Roll back or discard every handler and forget them.
    pub fn release(&mut self, action: ReleaseAction) {
        if self.handlers.is_empty() {
            return;
        }
        info!(?action, objects = self.handlers.len(), "releasing rollback handlers");
        for mut handler in self.handlers.drain(..) {
            match action {
                ReleaseAction::Rollback => handler.rollback(),
                ReleaseAction::Discard => handler.discard(),
            }
        }
    }
}
