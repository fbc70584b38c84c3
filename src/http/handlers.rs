use crate::error::AppError;
use crate::http::messages;
use crate::middleware::auth::IS_ADMIN_KEY;
use crate::{AppState, Contact, ContactInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tower_sessions::Session;
use tracing::error;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Raw request body for create and update. Fields default to empty so a
/// missing key is reported as a validation error, not a deserialization one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContactPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginPayload {
    #[serde(default)]
    password: String,
}

pub(crate) fn validate_contact_payload(payload: &ContactPayload) -> Result<ContactInput, AppError> {
    let name = payload.name.trim();
    let phone = payload.phone.trim();
    let email = payload.email.trim();
    if name.is_empty() || phone.is_empty() || email.is_empty() {
        return Err(AppError::validation(messages::INCOMPLETE_INPUT));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(AppError::validation(messages::INVALID_EMAIL));
    }
    Ok(ContactInput {
        name: name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
    })
}

async fn serve_page(state: &AppState, file: &str) -> Result<Html<String>, AppError> {
    let path = state.config.assets_dir.join(file);
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(Html(body)),
        Err(e) => {
            error!(path = %path.display(), "page read failed: {e}");
            Err(AppError::storage(messages::PAGE_UNAVAILABLE))
        }
    }
}

pub(crate) async fn index_page_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    serve_page(&state, "index.html").await
}

pub(crate) async fn login_page_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    serve_page(&state, "login.html").await
}

pub(crate) async fn admin_page_handler(
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    serve_page(&state, "admin.html").await
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, AppError> {
    if payload.password != state.config.admin_password {
        return Err(AppError::unauthorized(messages::WRONG_PASSWORD));
    }
    session.insert(IS_ADMIN_KEY, true).await.map_err(|e| {
        error!("session write failed: {e}");
        AppError::storage(messages::SESSION_FAILED)
    })?;
    Ok(Json(
        json!({ "success": true, "message": messages::LOGIN_OK }),
    ))
}

pub(crate) async fn logout_handler(session: Session) -> Result<Json<Value>, AppError> {
    session.flush().await.map_err(|e| {
        error!("session destroy failed: {e}");
        AppError::storage(messages::LOGOUT_FAILED)
    })?;
    Ok(Json(
        json!({ "success": true, "message": messages::LOGOUT_OK }),
    ))
}

pub(crate) async fn create_contact_handler(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Value>, AppError> {
    let input = validate_contact_payload(&payload)?;
    let contact = state.store.create(&input).await.map_err(|e| {
        error!("contact insert failed: {e}");
        AppError::storage(messages::SAVE_FAILED)
    })?;
    Ok(Json(json!({
        "success": true,
        "message": messages::SAVED,
        "data": contact,
    })))
}

pub(crate) async fn list_contacts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let contacts = state.store.list_all().await.map_err(|e| {
        error!("contact list failed: {e}");
        AppError::storage(messages::FETCH_FAILED)
    })?;
    Ok(Json(contacts))
}

pub(crate) async fn update_contact_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Value>, AppError> {
    let input = validate_contact_payload(&payload)?;
    let changed = state.store.update(id, &input).await.map_err(|e| {
        error!(id, "contact update failed: {e}");
        AppError::storage(messages::UPDATE_FAILED)
    })?;
    if changed == 0 {
        return Err(AppError::not_found(messages::UPDATE_NOT_FOUND));
    }
    Ok(Json(
        json!({ "success": true, "message": messages::UPDATED }),
    ))
}

pub(crate) async fn delete_contact_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let changed = state.store.delete(id).await.map_err(|e| {
        error!(id, "contact delete failed: {e}");
        AppError::storage(messages::DELETE_FAILED)
    })?;
    if changed == 0 {
        return Err(AppError::not_found(messages::DELETE_NOT_FOUND));
    }
    Ok(Json(
        json!({ "success": true, "message": messages::DELETED }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, phone: &str, email: &str) -> ContactPayload {
        ContactPayload {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn validation_trims_fields_before_storing() {
        let input = validate_contact_payload(&payload("  somchai ", " 081 ", " a@b.co "))
            .expect("valid payload");
        assert_eq!(input.name, "somchai");
        assert_eq!(input.phone, "081");
        assert_eq!(input.email, "a@b.co");
    }

    #[test]
    fn validation_rejects_missing_fields() {
        for bad in [
            payload("", "081", "a@b.co"),
            payload("somchai", "   ", "a@b.co"),
            payload("somchai", "081", ""),
        ] {
            let err = validate_contact_payload(&bad).expect_err("incomplete payload");
            assert_eq!(err.to_string(), messages::INCOMPLETE_INPUT);
        }
    }

    #[test]
    fn validation_rejects_malformed_emails() {
        for email in ["plain", "no-at.example.com", "a@b", "a@.co", "a b@c.co", "a@@b.co"] {
            let err = validate_contact_payload(&payload("somchai", "081", email))
                .expect_err("malformed email");
            assert_eq!(err.to_string(), messages::INVALID_EMAIL);
        }
    }

    #[test]
    fn validation_accepts_simple_addresses() {
        for email in ["a@b.co", "first.last@example.com", "x+y@sub.domain.org"] {
            validate_contact_payload(&payload("somchai", "081", email)).expect("valid email");
        }
    }
}
