use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};
use crate::session::SessionUser;

/// The signed-in user, handed explicitly to everything that acts on their behalf.
#[derive(Clone)]
pub struct UserContext {
    tx: Arc<watch::Sender<Option<SessionUser>>>,
}

impl Default for UserContext {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }
}

impl UserContext {
    pub fn current(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    /// The signed-in user, or `Unauthorized`.
    pub fn require(&self) -> ClientResult<SessionUser> {
        self.current().ok_or(ClientError::Unauthorized)
    }

    pub fn set(&self, user: SessionUser) {
        self.tx.send_replace(Some(user));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }
}
