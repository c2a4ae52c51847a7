use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::Redirect,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::Session;
use crate::auth::services::{JwtKeys, TokenKind};
use crate::state::AppState;

/// Validated bearer identity: who is calling and which live session backs
/// the token. API routes reject with 401.
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

/// Verify the access token and require its session row to still be live.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, &'static str> {
    let token = bearer_token(parts).ok_or("missing bearer token")?;

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        "invalid or expired token"
    })?;

    if claims.kind != TokenKind::Access {
        return Err("access token required");
    }

    // sign-out revokes the row, killing every token minted for the session
    match Session::find_active(&state.db, claims.sid).await {
        Ok(Some(session)) => Ok(AuthUser {
            user_id: claims.sub,
            session_id: session.id,
        }),
        Ok(None) => {
            warn!(session_id = %claims.sid, "token for revoked or expired session");
            Err("session is no longer active")
        }
        Err(e) => {
            warn!(error = %e, "session lookup failed");
            Err("session lookup failed")
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map_err(|msg| (StatusCode::UNAUTHORIZED, msg.to_string()))
    }
}

/// Page-route variant of [`AuthUser`]: unauthenticated visitors are sent to
/// `/auth` instead of getting a bare 401, before any data is touched.
pub struct PageSession(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for PageSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map(PageSession)
            .map_err(|_| Redirect::to("/auth"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::response::IntoResponse;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/dashboard");
        if let Some(v) = value {
            builder = builder.header(axum::http::header::AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn api_extractor_rejects_missing_header_with_401() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("must reject");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_extractor_rejects_malformed_scheme() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Token abc"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("must reject");
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn page_extractor_redirects_anonymous_visitors_to_auth() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let redirect = PageSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("must redirect");
        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/auth")
        );
    }

    #[tokio::test]
    async fn page_extractor_redirects_on_garbage_token() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer not.a.jwt"));
        let redirect = PageSession::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("must redirect");
        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
