// Local session store - the only on-device persistence this client keeps
use async_trait::async_trait;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::DbPool;
use crate::error::ClientResult;
use crate::model::{User, UserId};

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// The handful of profile fields kept on-device between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub role: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub student_id_verified: Option<bool>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            student_id_verified: user.student_id_verified,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn token(&self) -> ClientResult<Option<String>>;

    async fn save_token(&self, token: &str) -> ClientResult<()>;

    async fn remove_token(&self) -> ClientResult<()>;

    async fn user(&self) -> ClientResult<Option<SessionUser>>;

    async fn save_user(&self, user: &SessionUser) -> ClientResult<()>;

    /// Forget everything (logout).
    async fn clear(&self) -> ClientResult<()>;
}

pub type DynSessionStore = Arc<dyn SessionStore>;

/// SQLite implementation
pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            "SELECT value FROM session_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO session_entries (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM session_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn token(&self) -> ClientResult<Option<String>> {
        self.get(TOKEN_KEY)
    }

    async fn save_token(&self, token: &str) -> ClientResult<()> {
        self.put(TOKEN_KEY, token)
    }

    async fn remove_token(&self) -> ClientResult<()> {
        self.remove(TOKEN_KEY)
    }

    async fn user(&self) -> ClientResult<Option<SessionUser>> {
        match self.get(USER_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_user(&self, user: &SessionUser) -> ClientResult<()> {
        let json = serde_json::to_string(user)?;
        self.put(USER_KEY, &json)
    }

    async fn clear(&self) -> ClientResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM session_entries", [])?;
        Ok(())
    }
}
