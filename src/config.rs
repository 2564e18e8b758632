use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    File,
    Sqlite,
}

impl FromStr for SessionBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(AppError::Config(format!(
                "invalid SESSION_BACKEND `{other}` (expected `file` or `sqlite`)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub data_root: PathBuf,
    pub cookie_secret: String,
    pub session_backend: SessionBackend,
    pub booking_api_url: Option<Url>,
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://wayfarer.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_root = env::var("DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/runtime"));

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-wayfarer-cookie-secret".to_string());

        let session_backend = match env::var("SESSION_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => SessionBackend::Sqlite,
        };

        let booking_api_url = match env::var("BOOKING_API_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Url::parse(raw.trim())
                    .map_err(|err| AppError::Config(format!("invalid BOOKING_API_URL: {err}")))?,
            ),
            _ => None,
        };

        let catalog_path = env::var("CATALOG_PATH").ok().map(PathBuf::from);

        Ok(Self {
            database_url,
            listen_addr,
            data_root,
            cookie_secret,
            session_backend,
            booking_api_url,
            catalog_path,
        })
    }
}
