use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use remarks_api::{Db, UserId, USER_COOKIE};

use crate::Error;

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: Arc<dyn Db>,
    pub current_user: UserId,
    /// `Set-Cookie` value identifying the current user
    pub user_cookie: HeaderValue,
}

impl AppState {
    pub fn new(db: Arc<dyn Db>, current_user: UserId) -> anyhow::Result<AppState> {
        let user_cookie = HeaderValue::from_str(&format!(
            "{USER_COOKIE}={current_user}; Path=/; HttpOnly; SameSite=Lax"
        ))
        .map_err(|_| anyhow!("user id {current_user:?} cannot be stored in a cookie"))?;
        Ok(AppState {
            db,
            current_user,
            user_cookie,
        })
    }
}

/// Identity attached to a request by the `session` middleware
#[derive(Clone, Debug)]
pub struct Session {
    pub user: UserId,
}

/// Value of the user cookie, if the request carries one
pub fn user_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|kv| kv.trim().split_once('='))
        .find(|(k, _)| *k == USER_COOKIE)
        .map(|(_, v)| v)
}

/// Attaches the current user to every request, and hands the cookie out to
/// clients that do not have it yet
pub async fn session<B>(State(state): State<AppState>, mut req: Request<B>, next: Next<B>) -> Response {
    let up_to_date = user_cookie(req.headers()) == Some(&state.current_user.0 as &str);
    req.extensions_mut().insert(Session {
        user: state.current_user.clone(),
    });
    let mut resp = next.run(req).await;
    if !up_to_date {
        tracing::debug!(user = %state.current_user, "setting user cookie");
        resp.headers_mut()
            .append(header::SET_COOKIE, state.user_cookie.clone());
    }
    resp
}

pub struct Auth(pub UserId);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<Auth, Error> {
        req.extensions
            .get::<Session>()
            .map(|s| Auth(s.user.clone()))
            .ok_or_else(|| Error::Anyhow(anyhow!("request did not go through the session layer")))
    }
}
