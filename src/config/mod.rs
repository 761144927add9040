use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Public base URL of this service; metadata URIs embedded in mint
    /// calls are derived from it.
    pub public_base_url: String,
    pub default_badge_image: String,
    /// Upper bound for a single mint attempt (batch or individual).
    pub mint_timeout_secs: u64,
    pub chain: ChainConfig,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub private_key: String,
    pub contract_address: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/proofpass".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            default_badge_image: env::var("DEFAULT_BADGE_IMAGE")
                .unwrap_or_else(|_| "https://badges.proofpass.io/default.png".to_string()),
            mint_timeout_secs: env::var("MINT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            chain: ChainConfig {
                rpc_url: env::var("CHAIN_RPC_URL")
                    .unwrap_or_else(|_| "http://localhost:8545".to_string()),
                private_key: env::var("MINTER_PRIVATE_KEY").unwrap_or_default(),
                contract_address: env::var("BADGE_CONTRACT_ADDRESS").unwrap_or_default(),
            },
        }
    }

    pub fn metadata_uri(&self, metadata_id: uuid::Uuid) -> String {
        format!("{}/metadata/{}", self.public_base_url, metadata_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_uri_embeds_the_row_id() {
        let mut config = Config::from_env();
        config.public_base_url = "https://api.example.com".to_string();
        let id = uuid::Uuid::nil();
        assert_eq!(
            config.metadata_uri(id),
            "https://api.example.com/metadata/00000000-0000-0000-0000-000000000000"
        );
    }
}
