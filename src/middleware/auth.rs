// SPDX-License-Identifier: Apache-2.0

use crate::error::AppError;
use crate::http::messages;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;
use tracing::error;

pub(crate) const IS_ADMIN_KEY: &str = "is_admin";

async fn session_is_admin(session: &Session) -> Result<bool, AppError> {
    session
        .get::<bool>(IS_ADMIN_KEY)
        .await
        .map(|flag| flag.unwrap_or(false))
        .map_err(|e| {
            error!("session read failed: {e}");
            AppError::storage(messages::SESSION_FAILED)
        })
}

/// Guard for JSON routes: rejects with 401 instead of redirecting so fetch
/// callers get a status they can act on.
pub(crate) async fn require_admin_api(request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return AppError::unauthorized(messages::UNAUTHORIZED).into_response();
    };
    match session_is_admin(&session).await {
        Ok(true) => next.run(request).await,
        Ok(false) => AppError::unauthorized(messages::UNAUTHORIZED).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Guard for HTML routes: unauthenticated visitors land on the login page.
pub(crate) async fn require_admin_page(request: Request, next: Next) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return Redirect::to("/login").into_response();
    };
    match session_is_admin(&session).await {
        Ok(true) => next.run(request).await,
        Ok(false) => Redirect::to("/login").into_response(),
        Err(e) => e.into_response(),
    }
}
