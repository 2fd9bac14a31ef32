use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo_types::User;

/// Request body for account registration. Fields are optional so a missing
/// key becomes a validation reason rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial settings update. Outer `None` = key absent (leave as is),
/// `Some(None)` = explicit null (clear), `Some(Some(v))` = overwrite.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub timezone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub calculation_method: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub profile_picture_url: Option<Option<String>>,
}

// Only runs when the key exists, so a `null` value still reads as present.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Request body for registering a push-notification device token.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceTokenRequest {
    pub fcm_token: Option<String>,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub profile_picture_url: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub calculation_method: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            profile_picture_url: u.profile_picture_url,
            location: u.location,
            timezone: u.timezone,
            calculation_method: u.calculation_method,
            created_at: u.created_at,
        }
    }
}
