use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use crate::{db::DbPool, error::AppError, models::session::SessionSnapshot};

const SESSIONS_DIR: &str = "sessions";

/// Where session snapshots live between requests and restarts.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>, AppError>;
    async fn save(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<(), AppError>;
    async fn delete(&self, session_id: &str) -> Result<(), AppError>;
}

/// One pretty-printed JSON file per session under `<root>/sessions/`.
#[derive(Clone)]
pub struct FileSessionStore {
    root: Arc<PathBuf>,
}

impl FileSessionStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root().join(SESSIONS_DIR)).await?;
        Ok(())
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, AppError> {
        // Ids become file names.
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(AppError::BadRequest("invalid session id".into()));
        }
        Ok(self
            .root()
            .join(SESSIONS_DIR)
            .join(format!("{session_id}.json")))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>, AppError> {
        let path = self.session_path(session_id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let raw = fs::read(&path).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        let snapshot: SessionSnapshot = serde_json::from_slice(&raw)?;
        Ok(Some(snapshot))
    }

    async fn save(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<(), AppError> {
        let path = self.session_path(session_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(snapshot)?;
        fs::write(path, data).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AppError> {
        let path = self.session_path(session_id)?;
        if fs::try_exists(&path).await? {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

/// Snapshots as JSON rows in the `session_state` table.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: DbPool,
}

impl SqliteSessionStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionSnapshot>, AppError> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM session_state WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(&self.db)
                .await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<(), AppError> {
        let payload = serde_json::to_string(snapshot)?;
        sqlx::query(
            r#"INSERT INTO session_state (session_id, payload, updated_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(session_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session_state WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
