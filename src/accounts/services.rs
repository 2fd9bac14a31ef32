use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        dto::{AuthResponse, DeviceTokenRequest, LoginRequest, PublicUser, RegisterRequest, SettingsPatch},
        password::{hash_password, verify_against_dummy, verify_password},
        repo_types::{CalculationMethod, User, UserChanges},
        validation::{
            validate_device_token, validate_login, validate_register, validate_settings,
        },
    },
    error::AppError,
    state::AppState,
};

/// Current UTC time truncated to the microsecond precision Postgres stores.
pub(crate) fn now_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

async fn load_user(st: &AppState, user_id: Uuid) -> Result<User, AppError> {
    st.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token subject has no account");
        AppError::UserNotFound
    })
}

#[instrument(skip(st, req))]
pub async fn register(st: &AppState, req: RegisterRequest) -> Result<AuthResponse, AppError> {
    let reg = validate_register(req).map_err(|errors| {
        warn!(?errors, "registration rejected");
        AppError::Validation(errors)
    })?;

    if st.users.find_by_email(&reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }
    if st.users.find_by_username(&reg.username).await?.is_some() {
        warn!(username = %reg.username, "username already taken");
        return Err(AppError::DuplicateUsername);
    }

    let password_hash = hash_password(&reg.password)?;
    let now = now_micros();
    let user = User {
        id: Uuid::new_v4(),
        email: reg.email,
        username: reg.username,
        password_hash,
        profile_picture_url: None,
        location: None,
        timezone: None,
        calculation_method: Some(CalculationMethod::default().to_string()),
        fcm_token: None,
        created_at: now,
        updated_at: now,
    };

    // A concurrent registration can still win the race; the store reports it
    // as a duplicate and `?` maps it to the same error as the pre-check.
    st.users.insert(&user).await?;

    let token = st.keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

#[instrument(skip(st, req))]
pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let creds = validate_login(req).map_err(|errors| {
        warn!(?errors, "login rejected");
        AppError::Validation(errors)
    })?;

    let Some(user) = st.users.find_by_email(&creds.email).await? else {
        // Unknown emails pay the same Argon2 cost as a wrong password.
        verify_against_dummy(&creds.password);
        warn!(email = %creds.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = st.keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

#[instrument(skip(st))]
pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    Ok(load_user(st, user_id).await?.into())
}

#[instrument(skip(st, patch))]
pub async fn update_settings(
    st: &AppState,
    user_id: Uuid,
    patch: SettingsPatch,
) -> Result<PublicUser, AppError> {
    load_user(st, user_id).await?;
    validate_settings(&patch).map_err(AppError::Validation)?;

    let SettingsPatch {
        location,
        timezone,
        calculation_method,
        profile_picture_url,
    } = patch;
    let changes = UserChanges {
        profile_picture_url,
        location,
        timezone,
        calculation_method,
        fcm_token: None,
    };

    let user = st.users.update(user_id, &changes).await?;
    info!(%user_id, "settings updated");
    Ok(user.into())
}

#[instrument(skip(st, req))]
pub async fn update_device_token(
    st: &AppState,
    user_id: Uuid,
    req: DeviceTokenRequest,
) -> Result<(), AppError> {
    load_user(st, user_id).await?;
    validate_device_token(&req).map_err(AppError::Validation)?;

    let changes = UserChanges {
        fcm_token: Some(req.fcm_token),
        ..Default::default()
    };
    st.users.update(user_id, &changes).await?;
    info!(%user_id, "device token updated");
    Ok(())
}
