use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub profile_picture_url: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub calculation_method: Option<String>,
    #[serde(skip_serializing)]
    pub fcm_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Column-level changes to an existing user. `None` leaves the stored value,
/// `Some(None)` clears it, `Some(Some(v))` overwrites it.
#[derive(Debug, Default, Clone)]
pub struct UserChanges {
    pub profile_picture_url: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub timezone: Option<Option<String>>,
    pub calculation_method: Option<Option<String>>,
    pub fcm_token: Option<Option<String>>,
}

/// Prayer-time calculation conventions a profile may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculationMethod {
    /// Muslim World League
    Mwl,
    /// Islamic Society of North America
    #[default]
    Isna,
    Egypt,
    Makkah,
    Karachi,
    Tehran,
    Jafari,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 7] = [
        CalculationMethod::Mwl,
        CalculationMethod::Isna,
        CalculationMethod::Egypt,
        CalculationMethod::Makkah,
        CalculationMethod::Karachi,
        CalculationMethod::Tehran,
        CalculationMethod::Jafari,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::Mwl => "MWL",
            CalculationMethod::Isna => "ISNA",
            CalculationMethod::Egypt => "Egypt",
            CalculationMethod::Makkah => "Makkah",
            CalculationMethod::Karachi => "Karachi",
            CalculationMethod::Tehran => "Tehran",
            CalculationMethod::Jafari => "Jafari",
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCalculationMethod;

impl FromStr for CalculationMethod {
    type Err = UnknownCalculationMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalculationMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or(UnknownCalculationMethod)
    }
}
