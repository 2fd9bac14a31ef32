use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::{
    repo::{StoreError, UserStore},
    repo_types::{User, UserChanges},
    services::now_micros,
};

/// Map-backed store enforcing the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored record as-is, bypassing every check.
    pub async fn put_raw(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

fn check_unique(users: &HashMap<Uuid, User>, candidate: &User) -> Result<(), StoreError> {
    for other in users.values().filter(|u| u.id != candidate.id) {
        if other.email == candidate.email {
            return Err(StoreError::DuplicateEmail);
        }
        if other.username == candidate.username {
            return Err(StoreError::DuplicateUsername);
        }
    }
    Ok(())
}

/// Next `updated_at` for a record last touched at `prev`; always later than `prev`.
fn next_update_stamp(prev: OffsetDateTime) -> OffsetDateTime {
    let now = now_micros();
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

fn apply(field: &mut Option<String>, change: &Option<Option<String>>) {
    if let Some(value) = change {
        field.clone_from(value);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, user)?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let UserChanges {
            profile_picture_url,
            location,
            timezone,
            calculation_method,
            fcm_token,
        } = changes;
        apply(&mut user.profile_picture_url, profile_picture_url);
        apply(&mut user.location, location);
        apply(&mut user.timezone, timezone);
        apply(&mut user.calculation_method, calculation_method);
        apply(&mut user.fcm_token, fcm_token);
        user.updated_at = next_update_stamp(user.updated_at);

        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_stamp_is_strictly_increasing() {
        let far_future = OffsetDateTime::now_utc() + Duration::hours(1);
        assert!(next_update_stamp(far_future) > far_future);
        let past = OffsetDateTime::now_utc() - Duration::hours(1);
        assert!(next_update_stamp(past) > past);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = InMemoryUserStore::new();
        let id = Uuid::new_v4();
        let err = store.update(id, &UserChanges::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }
}
