// One-to-one chat - conversations under `chats/{pair_id}`
// Messages are keyed by time-ordered ids, so key order is send order.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::{ClientError, ClientResult};
use crate::model::UserId;

/// Order-independent id for the conversation between `a` and `b`.
pub fn pair_id(a: UserId, b: UserId) -> String {
    format!("{}_{}", a.min(b), a.max(b))
}

pub fn channel_path(a: UserId, b: UserId) -> String {
    format!("chats/{}", pair_id(a, b))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: UserId,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Append a message to the conversation at `path`.
    async fn append(&self, path: &str, message: ChatMessage) -> ClientResult<()>;

    /// The conversation at `path`, yielded in full now and after every append.
    fn subscribe(&self, path: &str) -> BoxStream<'static, Vec<ChatMessage>>;
}

pub type DynChatChannel = Arc<dyn ChatChannel>;

type Conversation = IndexMap<String, ChatMessage>;

/// In-process transport backed by one watch channel per conversation.
#[derive(Default)]
pub struct MemoryChatChannel {
    rooms: Mutex<HashMap<String, Arc<watch::Sender<Conversation>>>>,
}

impl MemoryChatChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn room(&self, path: &str) -> ClientResult<Arc<watch::Sender<Conversation>>> {
        let mut rooms = self
            .rooms
            .lock()
            .map_err(|_| ClientError::Internal("chat rooms lock poisoned".into()))?;
        Ok(rooms
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(watch::channel(Conversation::new()).0))
            .clone())
    }
}

#[async_trait]
impl ChatChannel for MemoryChatChannel {
    async fn append(&self, path: &str, message: ChatMessage) -> ClientResult<()> {
        let key = uuid::Uuid::now_v7().to_string();
        self.room(path)?.send_modify(|conversation| {
            conversation.insert(key, message);
        });
        Ok(())
    }

    fn subscribe(&self, path: &str) -> BoxStream<'static, Vec<ChatMessage>> {
        match self.room(path) {
            Ok(room) => WatchStream::new(room.subscribe())
                .map(|conversation| conversation.into_values().collect())
                .boxed(),
            Err(e) => {
                tracing::error!(error = %e, "Chat subscription failed");
                futures::stream::empty().boxed()
            }
        }
    }
}

/// A conversation as seen by one participant.
pub struct ChatSession {
    channel: DynChatChannel,
    me: UserId,
    path: String,
}

impl ChatSession {
    pub fn new(channel: DynChatChannel, me: UserId, peer: UserId) -> Self {
        Self {
            channel,
            me,
            path: channel_path(me, peer),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Send `text` trimmed. Blank messages are dropped; returns whether one was sent.
    pub async fn send(&self, text: &str) -> ClientResult<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        self.channel
            .append(
                &self.path,
                ChatMessage {
                    from: self.me,
                    text: text.to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                },
            )
            .await?;
        tracing::debug!(path = %self.path, "Chat message sent");
        Ok(true)
    }

    pub fn messages(&self) -> BoxStream<'static, Vec<ChatMessage>> {
        self.channel.subscribe(&self.path)
    }
}
