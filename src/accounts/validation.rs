//! Per-operation input checks.
//!
//! Every rule for a payload runs, and all failures are reported together as a
//! field -> reasons map. Nothing here touches the store.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::accounts::{
    dto::{DeviceTokenRequest, LoginRequest, RegisterRequest, SettingsPatch},
    repo_types::CalculationMethod,
};

pub const EMAIL_MAX_LEN: usize = 120;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 80;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const LOCATION_MAX_LEN: usize = 100;
pub const TIMEZONE_MAX_LEN: usize = 50;
pub const PICTURE_URL_MAX_LEN: usize = 500;
pub const FCM_TOKEN_MAX_LEN: usize = 255;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
}

/// Field name -> ordered human-readable reasons.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, reason: impl Into<String>) {
        self.0.entry(field).or_default().push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trim and lower-case an email before it is validated, looked up or stored.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(errors: &mut ValidationErrors, email: Option<&str>) {
    match email {
        None => errors.add("email", "Email is required"),
        Some(email) if !is_valid_email(email) => errors.add("email", "Invalid email format"),
        Some(_) => {}
    }
}

/// A registration payload that passed every rule. Email is normalized.
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Login credentials that passed every rule. Email is normalized.
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_register(req: RegisterRequest) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let email = req.email.as_deref().map(normalize_email);

    check_email(&mut errors, email.as_deref());
    if email.as_deref().is_some_and(|e| e.chars().count() > EMAIL_MAX_LEN) {
        errors.add(
            "email",
            format!("Email must be at most {EMAIL_MAX_LEN} characters"),
        );
    }

    match req.username.as_deref() {
        None => errors.add("username", "Username is required"),
        Some(username) => {
            let len = username.chars().count();
            if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
                errors.add(
                    "username",
                    format!(
                        "Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"
                    ),
                );
            }
            if !USERNAME_RE.is_match(username) {
                errors.add(
                    "username",
                    "Username can only contain letters, numbers, and underscores",
                );
            }
        }
    }

    match req.password.as_deref() {
        None => errors.add("password", "Password is required"),
        Some(password) if password.chars().count() < PASSWORD_MIN_LEN => errors.add(
            "password",
            format!("Password must be at least {PASSWORD_MIN_LEN} characters long"),
        ),
        Some(_) => {}
    }

    match (email, req.username, req.password) {
        (Some(email), Some(username), Some(password)) if errors.is_empty() => Ok(Registration {
            email,
            username,
            password,
        }),
        _ => Err(errors),
    }
}

pub fn validate_login(req: LoginRequest) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let email = req.email.as_deref().map(normalize_email);

    check_email(&mut errors, email.as_deref());

    if req.password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", "Password is required");
    }

    match (email, req.password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials { email, password }),
        _ => Err(errors),
    }
}

fn check_max_len(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<&Option<String>>,
    max: usize,
) {
    if let Some(Some(v)) = value {
        if v.chars().count() > max {
            errors.add(field, format!("{label} must be at most {max} characters"));
        }
    }
}

pub fn validate_settings(patch: &SettingsPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if let Some(Some(method)) = &patch.calculation_method {
        if method.parse::<CalculationMethod>().is_err() {
            let allowed: Vec<&str> = CalculationMethod::ALL.iter().map(|m| m.as_str()).collect();
            errors.add(
                "calculation_method",
                format!("Calculation method must be one of: {}", allowed.join(", ")),
            );
        }
    }
    check_max_len(
        &mut errors,
        "location",
        "Location",
        patch.location.as_ref(),
        LOCATION_MAX_LEN,
    );
    check_max_len(
        &mut errors,
        "timezone",
        "Timezone",
        patch.timezone.as_ref(),
        TIMEZONE_MAX_LEN,
    );
    check_max_len(
        &mut errors,
        "profile_picture_url",
        "Profile picture URL",
        patch.profile_picture_url.as_ref(),
        PICTURE_URL_MAX_LEN,
    );

    errors.into_result()
}

pub fn validate_device_token(req: &DeviceTokenRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    match req.fcm_token.as_deref() {
        None => errors.add("fcm_token", "FCM token is required"),
        Some(token) => {
            let len = token.chars().count();
            if len == 0 || len > FCM_TOKEN_MAX_LEN {
                errors.add(
                    "fcm_token",
                    format!("FCM token must be between 1 and {FCM_TOKEN_MAX_LEN} characters"),
                );
            }
        }
    }
    errors.into_result()
}
