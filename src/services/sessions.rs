use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tracing::debug;

use crate::{error::AppError, models::session::SessionSnapshot, services::storage::SessionStore};

/// `None` until the first holder of the lock loads it from the store.
type SessionSlot = Arc<Mutex<Option<SessionSnapshot>>>;
type OpenSessions = Arc<StdMutex<HashMap<String, SessionSlot>>>;

/// Sessions in use, one lock each, written through to a [`SessionStore`].
///
/// Every mutation of one browsing session happens under its lock, so two
/// requests from the same browser never interleave their updates. A slot is
/// dropped from memory once its last user lets go of it; the store keeps the
/// state.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    open: OpenSessions,
}

/// Exclusive access to one session. Releasing it evicts the slot when nobody
/// else is waiting on it.
pub struct SessionGuard {
    guard: OwnedMappedMutexGuard<Option<SessionSnapshot>, SessionSnapshot>,
    open: OpenSessions,
    session_id: String,
}

impl Deref for SessionGuard {
    type Target = SessionSnapshot;

    fn deref(&self) -> &SessionSnapshot {
        &self.guard
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut SessionSnapshot {
        &mut self.guard
    }
}

/// Evicts the slot when `holders` references, counting the map's own, are all
/// that is left of it.
fn release(open: &OpenSessions, session_id: &str, holders: usize) {
    let mut open = open.lock().unwrap_or_else(PoisonError::into_inner);
    let idle = open
        .get(session_id)
        .is_some_and(|slot| Arc::strong_count(slot) <= holders);
    if idle {
        open.remove(session_id);
        debug!("released session {session_id}");
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        release(&self.open, &self.session_id, 2);
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            open: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    fn slot(&self, session_id: &str) -> SessionSlot {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        open.entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Number of sessions currently held in memory.
    pub fn open_count(&self) -> usize {
        self.open.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Current state of the session; fresh sessions start empty.
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, AppError> {
        let guard = self.lock(session_id).await?;
        Ok((*guard).clone())
    }

    /// Runs `f` against the session under its lock and persists the result.
    pub async fn update<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionSnapshot) -> T,
    ) -> Result<T, AppError> {
        let mut guard = self.lock(session_id).await?;
        let out = f(&mut *guard);
        self.store.save(session_id, &*guard).await?;
        Ok(out)
    }

    /// The session stays locked until the guard drops. Changes made through
    /// the guard are only saved by [`Self::persist`].
    pub async fn lock(&self, session_id: &str) -> Result<SessionGuard, AppError> {
        let mut slot = self.slot(session_id).lock_owned().await;
        if slot.is_none() {
            match self.store.load(session_id).await {
                Ok(loaded) => {
                    debug!("opened session {session_id}");
                    *slot = Some(loaded.unwrap_or_default());
                }
                Err(err) => {
                    drop(slot);
                    release(&self.open, session_id, 1);
                    return Err(err);
                }
            }
        }
        let guard = OwnedMutexGuard::try_map(slot, Option::as_mut).map_err(|_| {
            AppError::Other(anyhow::anyhow!("session {session_id} was not loaded"))
        })?;
        Ok(SessionGuard {
            guard,
            open: self.open.clone(),
            session_id: session_id.to_string(),
        })
    }

    pub async fn persist(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<(), AppError> {
        self.store.save(session_id, snapshot).await
    }

    pub async fn forget(&self, session_id: &str) -> Result<(), AppError> {
        let mut guard = self.lock(session_id).await?;
        *guard = SessionSnapshot::default();
        self.store.delete(session_id).await
    }
}
