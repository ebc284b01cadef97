// Feed synchronizer - loads posts with their reactions and comments into the store
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::gateway::DynFeedApi;
use crate::store::{merge_unique, Action, FeedSnapshot, Store};

/// Outcome of asking for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// The page arrived; this many posts were new to the feed.
    Appended(usize),
    /// There is no further page.
    Exhausted,
    /// A page request is already outstanding; nothing was sent.
    InFlight,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Merge {
    Keep,
    Replace,
}

pub struct FeedSynchronizer {
    api: DynFeedApi,
    store: Store,
    cursor: Mutex<Option<String>>,
    loading_more: AtomicBool,
}

/// Clears the in-flight flag however the page request ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FeedSynchronizer {
    pub fn new(api: DynFeedApi, store: Store) -> Self {
        Self {
            api,
            store,
            cursor: Mutex::new(None),
            loading_more: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch the first page and merge it into whatever the feed already shows.
    pub async fn load(&self) -> ClientResult<()> {
        self.sync(None, Merge::Keep).await.map(|_| ())
    }

    /// Fetch the first page and show only that, dropping older pages.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.sync(None, Merge::Replace).await.map(|_| ())
    }

    pub fn has_more(&self) -> bool {
        self.cursor().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Fetch the page after the last one loaded. At most one of these runs at a time.
    pub async fn load_more(&self) -> ClientResult<PageLoad> {
        let Some(cursor) = self.cursor()? else {
            return Ok(PageLoad::Exhausted);
        };

        if self
            .loading_more
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("next page already requested");
            return Ok(PageLoad::InFlight);
        }
        let _guard = InFlightGuard(&self.loading_more);

        let added = self.sync(Some(cursor), Merge::Keep).await?;
        Ok(PageLoad::Appended(added))
    }

    /// Returns how many posts were new to the feed.
    async fn sync(&self, cursor: Option<String>, merge: Merge) -> ClientResult<usize> {
        let fetched = tokio::try_join!(
            self.api.posts(cursor.as_deref()),
            self.api.reactions(),
            self.api.comments(),
        );

        let (page, reactions, comments) = match fetched {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load feed");
                self.store.dispatch(Action::SetLoading(false));
                return Err(e);
            }
        };

        let (posts, added) = match merge {
            Merge::Replace => {
                let count = page.results.len();
                (page.results, count)
            }
            Merge::Keep => {
                let existing = self.store.read(|s| s.posts.clone());
                let before = existing.len();
                let posts = merge_unique(existing, page.results, |p| p.id);
                let added = posts.len() - before;
                (posts, added)
            }
        };

        *self.cursor_slot()? = page.next;
        tracing::info!(
            posts = posts.len(),
            reactions = reactions.len(),
            comments = comments.len(),
            "Feed synced"
        );
        self.store.dispatch(Action::SetData(FeedSnapshot {
            posts,
            reactions,
            comments,
        }));

        Ok(added)
    }

    fn cursor(&self) -> ClientResult<Option<String>> {
        Ok(self.cursor_slot()?.clone())
    }

    fn cursor_slot(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.cursor
            .lock()
            .map_err(|_| ClientError::Internal("feed cursor lock poisoned".into()))
    }
}
