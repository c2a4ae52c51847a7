use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{FoodRequest, RequestStatus, Urgency};

/// Request body mirroring the NGO request form.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub organization: String,
    pub people_count: i64,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub needed_by: OffsetDateTime,
    pub urgency: Urgency,
    #[serde(default)]
    pub preferences: Option<String>,
    pub contact: String,
}

#[derive(Debug, Serialize)]
pub struct RequestItem {
    pub id: Uuid,
    pub organization: String,
    pub people_count: i64,
    pub location: String,
    pub needed_by: OffsetDateTime,
    pub urgency: Urgency,
    pub preferences: Option<String>,
    pub contact: String,
    pub status: RequestStatus,
    pub created_at: OffsetDateTime,
}

impl From<FoodRequest> for RequestItem {
    fn from(r: FoodRequest) -> Self {
        Self {
            id: r.id,
            organization: r.organization,
            people_count: r.people_count,
            location: r.location,
            needed_by: r.needed_by,
            urgency: r.urgency,
            preferences: r.preferences,
            contact: r.contact,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedRequestResponse {
    pub id: Uuid,
    pub status: RequestStatus,
    pub created_at: OffsetDateTime,
}
