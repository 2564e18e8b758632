use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "wayfarer_session";

/// The browsing session a request belongs to. Put in place by [`ensure_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| AppError::Other(anyhow::anyhow!("session middleware is not installed")))
    }
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Reads the encrypted session cookie, issuing a fresh session when it is
/// missing or unreadable.
pub async fn ensure_session(jar: PrivateCookieJar, mut request: Request, next: Next) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| Uuid::parse_str(value).is_ok());

    let (jar, id) = match existing {
        Some(id) => (jar, id),
        None => {
            let id = Uuid::new_v4().to_string();
            debug!("starting browsing session {id}");
            (jar.add(session_cookie(id.clone())), id)
        }
    };

    request.extensions_mut().insert(SessionId(id));
    let response = next.run(request).await;
    (jar, response).into_response()
}
