use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::accounts::repo_types::{User, UserChanges};

const USER_COLUMNS: &str = "id, email, username, password_hash, profile_picture_url, location, \
                            timezone, calculation_method, fcm_token, created_at, updated_at";

/// Failures surfaced by a [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already taken")]
    DuplicateUsername,
    #[error("user {0} does not exist")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records. Implementations must enforce email and
/// username uniqueness themselves; callers only pre-check for friendlier errors.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Insert a new record. Fails with `Duplicate*` on a uniqueness violation.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    /// Apply `changes` to one record in a single atomic step, touching only the
    /// columns present, and move `updated_at` strictly forward. Returns the new row.
    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn value_of(change: &Option<Option<String>>) -> Option<&str> {
    change.as_ref().and_then(|v| v.as_deref())
}

/// Translate unique-constraint violations into the matching domain error.
fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.constraint() {
            Some("users_email_key") => return StoreError::DuplicateEmail,
            Some("users_username_key") => return StoreError::DuplicateUsername,
            _ => {}
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, profile_picture_url, location,
                               timezone, calculation_method, fcm_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.profile_picture_url)
        .bind(&user.location)
        .bind(&user.timezone)
        .bind(&user.calculation_method)
        .bind(&user.fcm_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<User, StoreError> {
        let UserChanges {
            profile_picture_url,
            location,
            timezone,
            calculation_method,
            fcm_token,
        } = changes;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET profile_picture_url = CASE WHEN $2 THEN $3 ELSE profile_picture_url END,
                   location = CASE WHEN $4 THEN $5 ELSE location END,
                   timezone = CASE WHEN $6 THEN $7 ELSE timezone END,
                   calculation_method = CASE WHEN $8 THEN $9 ELSE calculation_method END,
                   fcm_token = CASE WHEN $10 THEN $11 ELSE fcm_token END,
                   updated_at = GREATEST(now(), updated_at + interval '1 microsecond')
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(profile_picture_url.is_some())
        .bind(value_of(profile_picture_url))
        .bind(location.is_some())
        .bind(value_of(location))
        .bind(timezone.is_some())
        .bind(value_of(timezone))
        .bind(calculation_method.is_some())
        .bind(value_of(calculation_method))
        .bind(fcm_token.is_some())
        .bind(value_of(fcm_token))
        .fetch_optional(&self.db)
        .await
        .map_err(map_unique_violation)?;

        user.ok_or(StoreError::NotFound(id))
    }
}
