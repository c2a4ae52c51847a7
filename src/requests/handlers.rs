use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{auth::AuthUser, donations::Pagination, state::AppState};

use super::dto::{CreateRequestBody, CreatedRequestResponse, RequestItem};
use super::repo::{self, NewRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", get(list_my_requests).post(create_request))
}

#[instrument(skip(state))]
pub async fn list_my_requests(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<RequestItem>>, (StatusCode, String)> {
    let requests = repo::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(requests.into_iter().map(RequestItem::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_request(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Json(mut body): Json<CreateRequestBody>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedRequestResponse>), (StatusCode, String)> {
    body.organization = body.organization.trim().to_string();
    body.location = body.location.trim().to_string();
    body.contact = body.contact.trim().to_string();

    for (value, name) in [
        (&body.organization, "organization"),
        (&body.location, "location"),
        (&body.contact, "contact"),
    ] {
        if value.is_empty() {
            return Err((StatusCode::BAD_REQUEST, format!("{} is required", name)));
        }
    }
    if body.people_count <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "people_count must be a positive integer".into(),
        ));
    }
    let preferences = body.preferences.as_deref().filter(|p| !p.trim().is_empty());

    let new = NewRequest {
        organization: &body.organization,
        people_count: body.people_count,
        location: &body.location,
        needed_by: body.needed_by,
        urgency: body.urgency,
        preferences,
        contact: &body.contact,
    };

    let request = repo::insert(&state.db, user_id, &new).await.map_err(|e| {
        error!(error = %e, %user_id, "create request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(request_id = %request.id, %user_id, urgency = ?request.urgency, "request submitted");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/requests/{}", request.id)
            .parse()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "bad location header".to_string()))?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedRequestResponse {
            id: request.id,
            status: request.status,
            created_at: request.created_at,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::repo::Urgency;

    #[test]
    fn create_body_parses_the_form_fields() {
        let body = r#"{
            "organization": "Hope Shelter",
            "people_count": 120,
            "location": "Andheri West",
            "needed_by": "2025-01-10T12:00:00Z",
            "urgency": "urgent",
            "contact": "+91 9876543210"
        }"#;
        let parsed: CreateRequestBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.urgency, Urgency::Urgent);
        assert_eq!(parsed.people_count, 120);
        assert!(parsed.preferences.is_none());
    }

    #[test]
    fn create_body_rejects_unknown_urgency() {
        let body = r#"{
            "organization": "Hope Shelter",
            "people_count": 10,
            "location": "Bandra",
            "needed_by": "2025-01-10T12:00:00Z",
            "urgency": "whenever",
            "contact": "+91 9876543210"
        }"#;
        assert!(serde_json::from_str::<CreateRequestBody>(body).is_err());
    }
}
