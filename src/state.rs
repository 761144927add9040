use std::sync::Arc;

use sqlx::PgPool;

use crate::chain::ChainClient;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub chain: Arc<dyn ChainClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, chain: Arc<dyn ChainClient>, config: Config) -> Self {
        Self {
            pool,
            chain,
            config: Arc::new(config),
        }
    }
}
