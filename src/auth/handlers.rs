use std::convert::Infallible;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ConfirmRequest, LoginRequest, PublicUser, RefreshRequest,
            RegisterRequest, ResendConfirmationRequest, SessionInfo,
        },
        events::{SessionChange, SessionEvent},
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo_types::{Session, User},
        services::{is_valid_email, JwtKeys},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/confirm", post(confirm))
        .route("/auth/resend-confirmation", post(resend_confirmation))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(current_session))
        .route("/auth/events", get(session_events))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn public_user(user: &User) -> PublicUser {
    PublicUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
    }
}

/// No mailer is wired up; the confirmation token goes to the log outbox
/// where the delivery job (or a developer) picks it up.
fn send_confirmation(email: &str, token: Uuid) {
    info!(email = %email, token = %token, "confirmation email queued");
}

/// Open a session row and mint the access/refresh pair bound to it.
async fn open_session(state: &AppState, user: &User) -> anyhow::Result<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let session = Session::open(
        &state.db,
        user.id,
        time::Duration::seconds(keys.refresh_ttl.as_secs() as i64),
    )
    .await?;

    let access_token = keys.sign_access(user.id, session.id)?;
    let refresh_token = keys.sign_refresh(user.id, session.id)?;

    state.sessions.publish(SessionEvent {
        user_id: user.id,
        session_id: session.id,
        change: SessionChange::SignedIn,
    });

    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if payload.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // Ensure email is not taken
    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let confirmation_token = Uuid::new_v4();
    let user = match User::create(
        &state.db,
        &payload.name,
        &payload.email,
        payload.role,
        &hash,
        confirmation_token,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    send_confirmation(&user.email, confirmation_token);

    let response = open_session(&state, &user).await.map_err(|e| {
        error!(error = %e, "open session failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user registered");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    if !user.email_confirmed {
        // the one automatic retry path: re-send the confirmation and bail
        let token = Uuid::new_v4();
        if let Err(e) = User::reset_confirmation_token(&state.db, user.id, token).await {
            error!(error = %e, user_id = %user.id, "reset confirmation token failed");
        } else {
            send_confirmation(&user.email, token);
        }
        warn!(user_id = %user.id, "login with unconfirmed email");
        return Err((
            StatusCode::FORBIDDEN,
            "Email not confirmed; a new confirmation has been sent".into(),
        ));
    }

    let response = open_session(&state, &user).await.map_err(|e| {
        error!(error = %e, "open session failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    match User::confirm_email(&state.db, payload.token).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, "email confirmed");
            Ok(Json(public_user(&user)))
        }
        Ok(None) => Err((
            StatusCode::BAD_REQUEST,
            "Invalid or already used confirmation token".into(),
        )),
        Err(e) => {
            error!(error = %e, "confirm_email failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn resend_confirmation(
    State(state): State<AppState>,
    Json(mut payload): Json<ResendConfirmationRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    // Quiet success for unknown or already-confirmed emails; no account probing.
    if let Ok(Some(user)) = User::find_by_email(&state.db, &payload.email).await {
        if !user.email_confirmed {
            let token = Uuid::new_v4();
            User::reset_confirmation_token(&state.db, user.id, token)
                .await
                .map_err(|e| {
                    error!(error = %e, "reset confirmation token failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                })?;
            send_confirmation(&user.email, token);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    // Refresh only works while the session row is live
    let session = Session::find_active(&state.db, claims.sid)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((
            StatusCode::UNAUTHORIZED,
            "Session is no longer active".to_string(),
        ))?;

    let access_token = keys
        .sign_access(claims.sub, session.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(claims.sub, session.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&user),
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser {
        user_id,
        session_id,
    }: AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    let revoked = Session::revoke(&state.db, session_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if revoked {
        state.sessions.publish(SessionEvent {
            user_id,
            session_id,
            change: SessionChange::SignedOut,
        });
        info!(user_id = %user_id, session_id = %session_id, "user signed out");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn current_session(
    State(state): State<AppState>,
    AuthUser {
        user_id,
        session_id,
    }: AuthUser,
) -> Result<Json<SessionInfo>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(SessionInfo {
        session_id,
        user: public_user(&user),
    }))
}

/// Session-change subscription: one SSE event per change affecting the
/// caller. The broadcast receiver is dropped with the stream when the
/// client disconnects.
#[instrument(skip(state))]
pub async fn session_events(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sessions.subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(move |change| match change {
            Ok(event) if event.user_id == user_id => {
                Event::default().event("session").json_data(&event).ok()
            }
            _ => None,
        })
        .map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "user lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(public_user(&user)))
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use crate::auth::repo_types::UserRole;

    #[test]
    fn public_user_serializes_without_secrets() {
        let response = PublicUser {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            role: UserRole::Donor,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("asha@example.com"));
        assert!(json.contains("\"donor\""));
        assert!(!json.contains("password"));
    }

    #[test]
    fn register_request_parses_role() {
        let body = r#"{"name":"Shelter One","email":"ops@shelter.org","password":"longenough","role":"ngo"}"#;
        let parsed: RegisterRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.role, UserRole::Ngo);
    }
}
