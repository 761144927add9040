//! Boundary to the badge-minting contract. The orchestrator only sees the
//! [`ChainClient`] trait; the alloy-backed implementation lives in `evm`.

pub mod evm;

use async_trait::async_trait;
use thiserror::Error;

pub use evm::EvmChainClient;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("chain rpc error: {0}")]
    Rpc(String),

    #[error("transaction failed on-chain: {0}")]
    Reverted(String),
}

/// One token to issue: recipient wallet, contract-level badge type code,
/// the published metadata URI, and the event identifier recorded on-chain.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub to: String,
    pub badge_type: u8,
    pub metadata_uri: String,
    pub event_id: String,
}

#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub success: bool,
    pub tx_hash: String,
    pub token_id: Option<i64>,
}

/// Receipt for a single batch transaction. The contract call is
/// all-or-nothing at the chain level: `success == false` means every
/// recipient in the batch failed together.
#[derive(Debug, Clone)]
pub struct BatchReceipt {
    pub success: bool,
    pub tx_hash: String,
    pub token_ids: Vec<i64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Issues every request in one transaction. An `Err` here means the
    /// call threw before producing a usable receipt (network or simulation
    /// failure) and the caller may fall back to individual mints.
    async fn batch_mint(&self, requests: &[MintRequest]) -> Result<BatchReceipt, ChainError>;

    /// Issues a single token.
    async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, ChainError>;
}
