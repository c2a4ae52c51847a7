//! Navigation surface. Public pages are static shells; the protected
//! pages run the session-gated lifecycle: no session means a redirect to
//! `/auth` before any data is read, a live session means the page's
//! records are fetched and returned.

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    auth::{repo_types::User, AuthUser, PageSession, PublicUser},
    dashboard::{self, DashboardResponse},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/auth", get(auth_page))
        .route("/dashboard", get(dashboard_page))
        .route("/donate", get(donate_page))
        .route("/request", get(request_page))
}

async fn home() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>WasteLess ServeMore</title></head>\
         <body><h1>WasteLess ServeMore</h1>\
         <p>Surplus food, served where it matters.</p>\
         <nav><a href=\"/auth\">Sign in</a> <a href=\"/donate\">Donate</a> \
         <a href=\"/request\">Request</a> <a href=\"/dashboard\">Dashboard</a></nav>\
         </body></html>",
    )
}

async fn auth_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Sign in — WasteLess ServeMore</title></head>\
         <body><h1>Sign in or create an account</h1>\
         <p>POST /api/v1/auth/login or /api/v1/auth/register</p>\
         </body></html>",
    )
}

/// Page payload for the donate/request forms: just who is filling them in.
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub user: PublicUser,
}

async fn form_page(
    state: &AppState,
    session: PageSession,
) -> Result<Json<FormPage>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, session.0.user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(FormPage {
        user: PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    }))
}

#[instrument(skip(state, session))]
async fn donate_page(
    State(state): State<AppState>,
    session: PageSession,
) -> Result<Json<FormPage>, (StatusCode, String)> {
    form_page(&state, session).await
}

#[instrument(skip(state, session))]
async fn request_page(
    State(state): State<AppState>,
    session: PageSession,
) -> Result<Json<FormPage>, (StatusCode, String)> {
    form_page(&state, session).await
}

#[instrument(skip(state))]
async fn dashboard_page(
    State(state): State<AppState>,
    PageSession(AuthUser { user_id, .. }): PageSession,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let page = dashboard::load(&state, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "dashboard page load failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(page))
}
