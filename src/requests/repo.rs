use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Priority tier chosen by the requesting organization; used for display
/// only, never for ordering here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "request_urgency", rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
}

/// A food request submitted by an NGO, shelter or food bank.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodRequest {
    pub id: Uuid,
    pub user_id: Uuid,
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

pub struct NewRequest<'a> {
    pub organization: &'a str,
    pub people_count: i64,
    pub location: &'a str,
    pub needed_by: OffsetDateTime,
    pub urgency: Urgency,
    pub preferences: Option<&'a str>,
    pub contact: &'a str,
}

/// Insert a request, status fixed at `pending`.
pub async fn insert(db: &PgPool, user_id: Uuid, new: &NewRequest<'_>) -> anyhow::Result<FoodRequest> {
    let request = sqlx::query_as::<_, FoodRequest>(
        r#"
        INSERT INTO requests (id, user_id, organization, people_count, location, needed_by, urgency, preferences, contact, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
        RETURNING id, user_id, organization, people_count, location, needed_by, urgency, preferences, contact, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(new.organization)
    .bind(new.people_count)
    .bind(new.location)
    .bind(new.needed_by)
    .bind(new.urgency)
    .bind(new.preferences)
    .bind(new.contact)
    .fetch_one(db)
    .await
    .context("insert request")?;
    Ok(request)
}

/// Every request the user has submitted, newest first.
pub async fn list_all_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<FoodRequest>> {
    let rows = sqlx::query_as::<_, FoodRequest>(
        r#"
        SELECT id, user_id, organization, people_count, location, needed_by, urgency, preferences, contact, status, created_at
        FROM requests
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// The caller's requests, newest first.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<FoodRequest>> {
    let rows = sqlx::query_as::<_, FoodRequest>(
        r#"
        SELECT id, user_id, organization, people_count, location, needed_by, urgency, preferences, contact, status, created_at
        FROM requests
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
