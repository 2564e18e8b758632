use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tracing::info;

use crate::{
    config::{AppConfig, SessionBackend},
    db::{self, DbPool},
    error::AppError,
    services::{
        booking::{BookingGateway, LocalBookingGateway, RemoteBookingGateway},
        catalog::CatalogService,
        sessions::SessionManager,
        storage::{FileSessionStore, SessionStore, SqliteSessionStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub catalog: CatalogService,
    pub sessions: SessionManager,
    /// Gateway used by checkout; local or remote depending on config.
    pub bookings: Arc<dyn BookingGateway>,
    /// Bookings this instance records itself, served under `/api/bookings`.
    pub local_bookings: LocalBookingGateway,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        catalog: CatalogService,
        session_store: Arc<dyn SessionStore>,
        bookings: Arc<dyn BookingGateway>,
    ) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            local_bookings: LocalBookingGateway::new(db.clone()),
            sessions: SessionManager::new(session_store),
            config,
            db,
            catalog,
            bookings,
            cookie_key,
        }
    }

    /// Opens the database, runs migrations and wires every service from `config`.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, AppError> {
        let db = db::init_pool(&config.database_url).await?;
        db::run_migrations(&db).await?;

        let catalog = match &config.catalog_path {
            Some(path) => CatalogService::load(path).await?,
            None => CatalogService::builtin()?,
        };

        let session_store: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::File => {
                let store = FileSessionStore::new(config.data_root.clone());
                store.ensure_structure().await?;
                Arc::new(store)
            }
            SessionBackend::Sqlite => Arc::new(SqliteSessionStore::new(db.clone())),
        };

        let bookings: Arc<dyn BookingGateway> = match &config.booking_api_url {
            Some(url) => {
                info!("checkout submits bookings to {url}");
                Arc::new(RemoteBookingGateway::new(url.clone()))
            }
            None => Arc::new(LocalBookingGateway::new(db.clone())),
        };

        Ok(Self::new(config, db, catalog, session_store, bookings))
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
