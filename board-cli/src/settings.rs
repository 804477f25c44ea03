use anyhow::{Context, Result, anyhow};

use board_client::DEFAULT_PAGE_SIZE;

pub(crate) const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub(crate) const DEFAULT_SESSION_FILE: &str = ".board_session";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) api_url: String,
    pub(crate) session_file: String,
    pub(crate) page_size: u32,
    pub(crate) log_level: String,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self> {
        let api_url = get_or_default("BOARD_API_URL", DEFAULT_API_URL)?;
        let session_file = get_or_default("BOARD_SESSION_FILE", DEFAULT_SESSION_FILE)?;
        let page_size = parse_u32_env("BOARD_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let log_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());

        Ok(Self {
            api_url,
            session_file,
            page_size,
            log_level,
        })
    }
}

fn get_or_default(key: &str, default: &str) -> Result<String> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(anyhow!("{key} must not be empty"));
    }
    Ok(value)
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32> {
    let value = std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

/// Адрес сервера: `--server` важнее переменной окружения.
pub(crate) fn resolve_server(flag: Option<String>, configured: &str) -> String {
    let raw = flag.unwrap_or_else(|| configured.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}
