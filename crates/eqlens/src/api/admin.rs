//! Administrator endpoints, guarded by HTTP Basic credentials checked
//! against the `admin_users` table.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

use eqlens_db::{verify_password, AssessmentSummary};

use super::{internal, AppState};
use crate::filter::{build_filter, ListParams};

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"eqlens\"")],
        "Admin credentials required",
    )
        .into_response()
}

/// Username and password from an `Authorization: Basic ...` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, Response> {
    let Some((username, password)) = basic_credentials(headers) else {
        return Err(unauthorized());
    };

    // Store guard is dropped here; argon2 runs without the connection lock.
    let stored = state
        .db
        .admin_users()
        .password_hash(&username)
        .map_err(|e| internal(e).into_response())?;

    let valid = match stored {
        Some(stored) => {
            let user = username.clone();
            tokio::task::spawn_blocking(move || verify_password(&user, &stored, &password))
                .await
                .map_err(|e| internal(e).into_response())?
        }
        None => false,
    };

    if valid {
        Ok(username)
    } else {
        warn!(username = %username, "Rejected admin credentials");
        Err(unauthorized())
    }
}

pub async fn list_assessments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AssessmentSummary>>, Response> {
    authorize(&state, &headers).await?;

    let filter = build_filter(params)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;

    let summaries = state
        .db
        .assessments()
        .list(&filter)
        .map_err(|e| internal(e).into_response())?;

    Ok(Json(summaries))
}

pub async fn delete_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Response> {
    let admin = authorize(&state, &headers).await?;

    let deleted = state
        .db
        .assessments()
        .delete(&id)
        .map_err(|e| internal(e).into_response())?;

    if deleted {
        info!(id = %id, admin = %admin, "Assessment deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Assessment not found: {}", id)).into_response())
    }
}
