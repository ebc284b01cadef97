pub mod reducer;

pub use reducer::{merge_unique, reduce, Action, FeedSnapshot, FeedState};

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Holds the feed state and applies dispatched actions in the order they are issued.
///
/// Cloning a `Store` hands out another handle to the same state.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<FeedState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(FeedState::default())
    }
}

impl Store {
    pub fn new(initial: FeedState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: Action) {
        tracing::debug!(action = action.name(), "dispatch");
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn snapshot(&self) -> FeedState {
        self.tx.borrow().clone()
    }

    /// A receiver that observes every new state; the view re-renders from it.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.tx.subscribe()
    }

    pub fn updates(&self) -> WatchStream<FeedState> {
        WatchStream::new(self.subscribe())
    }
}
