use std::sync::Arc;

use crate::auth::{
    jwt::JwtKeys,
    memory::MemoryUserStore,
    password::PasswordHasher,
    repo::{PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::db;
use crate::expenses::{
    memory::MemoryExpenseStore,
    repo::{ExpenseStore, PgExpenseStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub expenses: Arc<dyn ExpenseStore>,
    pub keys: JwtKeys,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.database_url.as_deref() {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await;
                let users = Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>;
                let expenses = Arc::new(PgExpenseStore::new(pool)) as Arc<dyn ExpenseStore>;
                Self::from_parts(config, users, expenses)
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set; using in-memory stores, data is lost on restart"
                );
                Self::in_memory(config)
            }
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let users = Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>;
        let expenses = Arc::new(MemoryExpenseStore::new()) as Arc<dyn ExpenseStore>;
        Self::from_parts(config, users, expenses)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> anyhow::Result<Self> {
        let keys = JwtKeys::new(&config.jwt);
        let passwords = PasswordHasher::new(&config.password)?;
        Ok(Self {
            config,
            users,
            expenses,
            keys,
            passwords,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::in_memory(Arc::new(AppConfig::for_tests())).expect("test state")
    }
}
