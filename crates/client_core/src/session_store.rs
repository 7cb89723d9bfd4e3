use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use storage::{Storage, StoredSession};
use tokio::sync::Mutex;

/// Durable home for the bearer token: read at startup, written on login,
/// cleared on logout.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_token(&self) -> Result<Option<String>>;
    async fn save_token(&self, token: &str) -> Result<()>;
    async fn clear_token(&self) -> Result<()>;
}

pub struct DurableSessionStore {
    store: Storage,
}

impl DurableSessionStore {
    pub async fn initialize(database_url: &str) -> Result<Arc<Self>> {
        let store = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to initialize session storage at '{database_url}'"))?;
        Ok(Arc::new(Self { store }))
    }

    pub fn sqlite_url_for_data_dir(base_dir: &Path) -> String {
        format!(
            "sqlite://{}",
            base_dir.join("task_client_state.sqlite3").display()
        )
    }

    pub async fn session_info(&self) -> Result<Option<StoredSession>> {
        self.store.load_session().await
    }
}

#[async_trait]
impl SessionStore for DurableSessionStore {
    async fn load_token(&self) -> Result<Option<String>> {
        self.store.load_session_token().await
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        self.store.save_session_token(token).await
    }

    async fn clear_token(&self) -> Result<()> {
        self.store.clear_session_token().await
    }
}

/// Process-local store for tests and ephemeral runs; nothing survives exit.
#[derive(Default)]
pub struct InMemorySessionStore {
    token: Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_token(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save_token(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear_token(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}
