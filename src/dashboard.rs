use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::{repo_types::User, AuthUser, PublicUser},
    donations::{
        repo as donations_repo,
        stats::{self, ImpactStats},
        DonationItem,
    },
    requests::{repo as requests_repo, RequestItem},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: PublicUser,
    pub stats: ImpactStats,
    pub donations: Vec<DonationItem>,
    pub requests: Vec<RequestItem>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Assemble the dashboard from live data: the user's donations and
/// requests, with stats recomputed from the donation list each time.
pub async fn load(state: &AppState, user_id: Uuid) -> anyhow::Result<DashboardResponse> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))?;

    let donations = donations_repo::list_all_by_user(&state.db, user_id).await?;
    let requests = requests_repo::list_all_by_user(&state.db, user_id).await?;

    let stats = stats::compute(&donations);

    Ok(DashboardResponse {
        user: PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
        stats,
        donations: donations.into_iter().map(DonationItem::from).collect(),
        requests: requests.into_iter().map(RequestItem::from).collect(),
    })
}

#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let dashboard = load(&state, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "dashboard load failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(dashboard))
}
