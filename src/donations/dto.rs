use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Donation, DonationStatus};

/// Donation as rendered in lists; owner id stays internal.
#[derive(Debug, Serialize)]
pub struct DonationItem {
    pub id: Uuid,
    pub food_type: String,
    pub quantity: i64,
    pub pickup_location: String,
    pub expires_at: OffsetDateTime,
    pub description: Option<String>,
    pub status: DonationStatus,
    pub created_at: OffsetDateTime,
}

impl From<Donation> for DonationItem {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            food_type: d.food_type,
            quantity: d.quantity,
            pickup_location: d.pickup_location,
            expires_at: d.expires_at,
            description: d.description,
            status: d.status,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedDonationResponse {
    pub id: Uuid,
    pub status: DonationStatus,
    pub created_at: OffsetDateTime,
    pub photo_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
