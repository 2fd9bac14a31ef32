use std::sync::Arc;

use crate::accounts::{
    jwt::JwtKeys,
    repo::{PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let pool = db::connect(&config).await?;
        db::migrate(&pool).await;

        let users = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(users, &config))
    }

    pub fn from_parts(users: Arc<dyn UserStore>, config: &AppConfig) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self { users, keys }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::in_memory_with(crate::config::test_config())
    }

    #[cfg(test)]
    pub fn in_memory_with(config: AppConfig) -> Self {
        use crate::accounts::memory::InMemoryUserStore;

        let users = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
        Self::from_parts(users, &config)
    }
}
