use std::fs;

use serde::Deserialize;

/// Fixed base authority of the hosted task service.
pub const DEFAULT_SERVER_URL: &str = "https://to-do-list-backend-fxk9.onrender.com";

const CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            database_url: "sqlite://./data/task_client.db".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    database_url: Option<String>,
}

/// Defaults, overlaid by `client.toml` from the working directory, overlaid
/// by environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileConfig>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_hosted_backend() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
        assert!(settings.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn file_config_overrides_defaults() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "server_url = \"http://localhost:3001\"\ndatabase_url = \"sqlite://./tmp/alt.db\"\n",
        );
        assert_eq!(settings.server_url, "http://localhost:3001");
        assert_eq!(settings.database_url, "sqlite://./tmp/alt.db");
    }

    #[test]
    fn partial_file_config_keeps_remaining_defaults() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "server_url = \"http://localhost:3001\"\n");
        assert_eq!(settings.server_url, "http://localhost:3001");
        assert_eq!(settings.database_url, Settings::default().database_url);
    }

    #[test]
    fn unparseable_file_config_is_ignored() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "not toml at all [");
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
        assert_eq!(
            normalize_database_url("sqlite:./data/test.db"),
            "sqlite://./data/test.db"
        );
    }

    #[test]
    fn leaves_complete_urls_untouched() {
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_database_url("sqlite://./data/test.db"),
            "sqlite://./data/test.db"
        );
    }

    #[test]
    fn empty_database_url_falls_back_to_default() {
        assert_eq!(normalize_database_url("  "), Settings::default().database_url);
    }
}
