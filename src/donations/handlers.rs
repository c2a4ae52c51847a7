use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{auth::AuthUser, state::AppState};

use super::dto::{CreatedDonationResponse, DonationItem, Pagination};
use super::repo::{self, NewDonation};

const PHOTO_PRESIGN_SECS: u64 = 600;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/donations", get(list_my_donations))
        .route("/donations/open", get(list_open_donations))
        .route("/donations/:id/photo", get(get_donation_photo))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/donations", post(create_donation))
        // one image up to 5MB plus the form fields
        .layer(DefaultBodyLimit::max(6 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn list_my_donations(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<DonationItem>>, (StatusCode, String)> {
    let donations = repo::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(internal)?;
    Ok(Json(donations.into_iter().map(DonationItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn list_open_donations(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<DonationItem>>, (StatusCode, String)> {
    let donations = repo::list_open(&state.db, p.limit, p.offset)
        .await
        .map_err(internal)?;
    Ok(Json(donations.into_iter().map(DonationItem::from).collect()))
}

/// POST /donations (multipart)
/// Fields: food_type, quantity, pickup_location, expires_at required;
/// description and a single `image` file optional.
#[instrument(skip(state, mp))]
pub async fn create_donation(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<CreatedDonationResponse>), (StatusCode, String)> {
    let mut food_type: Option<String> = None;
    let mut quantity: Option<String> = None;
    let mut pickup_location: Option<String> = None;
    let mut expires_at: Option<String> = None;
    let mut description: Option<String> = None;
    let mut image: Option<(Bytes, String)> = None;

    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("food_type") => food_type = Some(field.text().await.map_err(bad_request)?),
            Some("quantity") => quantity = Some(field.text().await.map_err(bad_request)?),
            Some("pickup_location") => {
                pickup_location = Some(field.text().await.map_err(bad_request)?)
            }
            Some("expires_at") => expires_at = Some(field.text().await.map_err(bad_request)?),
            Some("description") => description = Some(field.text().await.map_err(bad_request)?),
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(bad_request)?;
                if !data.is_empty() {
                    image = Some((data, content_type));
                }
            }
            _ => {}
        }
    }

    let food_type = required(food_type, "food_type")?;
    let pickup_location = required(pickup_location, "pickup_location")?;
    let expires_at = parse_expiry(&required(expires_at, "expires_at")?)
        .ok_or((StatusCode::BAD_REQUEST, "expires_at is not a valid timestamp".into()))?;
    let quantity: i64 = required(quantity, "quantity")?
        .trim()
        .parse()
        .ok()
        .filter(|q| *q > 0)
        .ok_or((
            StatusCode::BAD_REQUEST,
            "quantity must be a positive integer".to_string(),
        ))?;
    let description = description.filter(|d| !d.trim().is_empty());

    // Upload the photo before touching the database; a failed upload must
    // leave no record behind.
    let donation_id = Uuid::new_v4();
    let mut uploaded: Option<(Uuid, String)> = None;
    if let Some((data, content_type)) = image {
        let ext = ext_from_mime(&content_type).ok_or((
            StatusCode::BAD_REQUEST,
            format!("unsupported image type {}", content_type),
        ))?;
        let photo_id = Uuid::new_v4();
        let key = format!("donations/{}/{}-{}.{}", user_id, donation_id, photo_id, ext);
        state
            .storage
            .put_object(&key, data, &content_type)
            .await
            .map_err(|e| {
                error!(error = %e, key = %key, "photo upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?;
        uploaded = Some((photo_id, key));
    }

    let new = NewDonation {
        food_type: &food_type,
        quantity,
        pickup_location: &pickup_location,
        expires_at,
        description: description.as_deref(),
    };

    let donation = match insert_with_photo(&state, user_id, donation_id, &new, &uploaded).await {
        Ok(d) => d,
        Err(e) => {
            // the record failed; don't leave an orphaned object around
            if let Some((_, key)) = &uploaded {
                if let Err(del) = state.storage.delete_object(key).await {
                    warn!(error = %del, key = %key, "orphan photo cleanup failed");
                }
            }
            error!(error = %e, %user_id, "create donation failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    info!(donation_id = %donation.id, %user_id, quantity, "donation listed");

    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        format!("/donations/{}", donation.id)
            .parse()
            .map_err(|_| internal_msg("bad location header"))?,
    );

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedDonationResponse {
            id: donation.id,
            status: donation.status,
            created_at: donation.created_at,
            photo_id: uploaded.map(|(id, _)| id),
        }),
    ))
}

async fn insert_with_photo(
    state: &AppState,
    user_id: Uuid,
    donation_id: Uuid,
    new: &NewDonation<'_>,
    uploaded: &Option<(Uuid, String)>,
) -> anyhow::Result<super::repo::Donation> {
    let mut tx = state.db.begin().await?;
    let donation = repo::insert_tx(&mut tx, donation_id, user_id, new).await?;
    if let Some((photo_id, key)) = uploaded {
        repo::insert_photo_tx(&mut tx, *photo_id, donation_id, key).await?;
    }
    tx.commit().await?;
    Ok(donation)
}

/// Temporary redirect to a short-lived public URL for the donation's photo.
#[instrument(skip(state))]
pub async fn get_donation_photo(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let key = match repo::get_photo_key(&state.db, id).await {
        Ok(Some(k)) => k,
        Ok(None) => return (StatusCode::NOT_FOUND, "Photo not found").into_response(),
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    match state.storage.presign_get(&key, PHOTO_PRESIGN_SECS).await {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => {
            error!(error = %e, key = %key, "presign failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "presign failed").into_response()
        }
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, (StatusCode, String)> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err((StatusCode::BAD_REQUEST, format!("{} is required", name))),
    }
}

/// Accepts RFC 3339 or the `datetime-local` shape the donation form sends
/// (no offset, taken as UTC).
pub(crate) fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    let local = time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(raw, &local)
        .ok()
        .map(|dt| dt.assume_utc())
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn internal_msg(msg: &str) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
}

fn bad_request<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_from_mime_covers_allowed_types() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/pdf"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn parse_expiry_accepts_rfc3339() {
        let ts = parse_expiry("2025-01-08T18:30:00Z").expect("rfc3339 parses");
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.hour(), 18);
    }

    #[test]
    fn parse_expiry_accepts_datetime_local_as_utc() {
        let ts = parse_expiry("2025-01-08T18:30").expect("datetime-local parses");
        assert_eq!(ts.offset(), time::UtcOffset::UTC);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn parse_expiry_rejects_garbage() {
        assert!(parse_expiry("tomorrow evening").is_none());
        assert!(parse_expiry("").is_none());
    }
}
