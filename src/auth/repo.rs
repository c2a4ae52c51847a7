use crate::auth::repo_types::{Session, User, UserRole};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, password_hash, email_confirmed, confirmation_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, password_hash, email_confirmed, confirmation_token, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password and a pending confirmation token.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        role: UserRole,
        password_hash: &str,
        confirmation_token: Uuid,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role, password_hash, confirmation_token)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, role, password_hash, email_confirmed, confirmation_token, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(password_hash)
        .bind(confirmation_token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Consume a confirmation token. Returns the confirmed user, or None
    /// when the token matches nothing pending.
    pub async fn confirm_email(db: &PgPool, token: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email_confirmed = TRUE, confirmation_token = NULL
            WHERE confirmation_token = $1 AND email_confirmed = FALSE
            RETURNING id, name, email, role, password_hash, email_confirmed, confirmation_token, created_at
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Replace the pending confirmation token for an unconfirmed account.
    pub async fn reset_confirmation_token(
        db: &PgPool,
        user_id: Uuid,
        token: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET confirmation_token = $2
            WHERE id = $1 AND email_confirmed = FALSE
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(db)
        .await?;
        Ok(())
    }
}

impl Session {
    /// Open a new session for a user.
    pub async fn open(db: &PgPool, user_id: Uuid, ttl: Duration) -> anyhow::Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, created_at, expires_at, revoked
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(OffsetDateTime::now_utc() + ttl)
        .fetch_one(db)
        .await?;
        Ok(session)
    }

    /// Fetch a session only if it is still live: not revoked, not expired.
    pub async fn find_active(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, created_at, expires_at, revoked
            FROM sessions
            WHERE id = $1 AND revoked = FALSE AND expires_at > now()
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    /// Revoke a session (sign-out). Returns true when a live row was revoked.
    pub async fn revoke(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
