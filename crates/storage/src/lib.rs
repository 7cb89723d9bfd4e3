use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

/// Fixed key the session token is stored under. The table is keyed so the
/// schema survives additional named entries later, but the client only ever
/// uses this one.
const SESSION_TOKEN_KEY: &str = "token";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub token: String,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_session_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_session_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_tokens (
                name       TEXT PRIMARY KEY,
                token      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure session_tokens table exists")?;
        Ok(())
    }

    pub async fn save_session_token(&self, token: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_tokens (name, token, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET token = excluded.token, updated_at = excluded.updated_at",
        )
        .bind(SESSION_TOKEN_KEY)
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to persist session token")?;
        Ok(())
    }

    pub async fn load_session_token(&self) -> Result<Option<String>> {
        Ok(self.load_session().await?.map(|session| session.token))
    }

    pub async fn load_session(&self) -> Result<Option<StoredSession>> {
        let row = sqlx::query("SELECT token, updated_at FROM session_tokens WHERE name = ?")
            .bind(SESSION_TOKEN_KEY)
            .fetch_optional(&self.pool)
            .await
            .context("failed to read session token")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token: String = row.try_get("token")?;
        let updated_at_raw: String = row.try_get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
            .with_context(|| format!("invalid session timestamp '{updated_at_raw}'"))?
            .with_timezone(&Utc);

        Ok(Some(StoredSession { token, updated_at }))
    }

    pub async fn clear_session_token(&self) -> Result<()> {
        sqlx::query("DELETE FROM session_tokens WHERE name = ?")
            .bind(SESSION_TOKEN_KEY)
            .execute(&self.pool)
            .await
            .context("failed to clear session token")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_file_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
