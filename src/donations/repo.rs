use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of a listed donation. Transitions happen outside this
/// service (pickup crews); records start and stay `active` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "donation_status", rename_all = "snake_case")]
pub enum DonationStatus {
    Active,
    PickedUp,
    Delivered,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Donation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_type: String,
    pub quantity: i64,
    pub pickup_location: String,
    pub expires_at: OffsetDateTime,
    pub description: Option<String>,
    pub status: DonationStatus,
    pub created_at: OffsetDateTime,
}

pub struct NewDonation<'a> {
    pub food_type: &'a str,
    pub quantity: i64,
    pub pickup_location: &'a str,
    pub expires_at: OffsetDateTime,
    pub description: Option<&'a str>,
}

/// Insert a donation within a transaction, status fixed at `active`.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    user_id: Uuid,
    new: &NewDonation<'_>,
) -> anyhow::Result<Donation> {
    let donation = sqlx::query_as::<_, Donation>(
        r#"
        INSERT INTO donations (id, user_id, food_type, quantity, pickup_location, expires_at, description, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'active')
        RETURNING id, user_id, food_type, quantity, pickup_location, expires_at, description, status, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(new.food_type)
    .bind(new.quantity)
    .bind(new.pickup_location)
    .bind(new.expires_at)
    .bind(new.description)
    .fetch_one(&mut **tx)
    .await
    .context("insert donation")?;
    Ok(donation)
}

/// Link an uploaded photo to a donation in the same transaction.
pub async fn insert_photo_tx(
    tx: &mut Transaction<'_, Postgres>,
    photo_id: Uuid,
    donation_id: Uuid,
    s3_key: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO photos (id, donation_id, s3_key)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(photo_id)
    .bind(donation_id)
    .bind(s3_key)
    .execute(&mut **tx)
    .await
    .context("insert photo")?;
    Ok(())
}

/// The caller's donations, newest first.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, user_id, food_type, quantity, pickup_location, expires_at, description, status, created_at
        FROM donations
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

/// Every donation the user has listed, newest first. The dashboard stats
/// are computed over this full list, not a page of it.
pub async fn list_all_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, user_id, food_type, quantity, pickup_location, expires_at, description, status, created_at
        FROM donations
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Donations still awaiting pickup, across all donors, newest first.
pub async fn list_open(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Donation>> {
    let rows = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, user_id, food_type, quantity, pickup_location, expires_at, description, status, created_at
        FROM donations
        WHERE status = 'active'
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Storage key of the donation's photo, if one was attached.
pub async fn get_photo_key(db: &PgPool, donation_id: Uuid) -> anyhow::Result<Option<String>> {
    let row = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT s3_key
        FROM photos
        WHERE donation_id = $1
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(donation_id)
    .fetch_optional(db)
    .await
    .context("get photo by donation")?;
    Ok(row.map(|(key,)| key))
}
