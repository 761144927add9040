use std::str::FromStr;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;

use super::{BatchReceipt, ChainClient, ChainError, MintReceipt, MintRequest};
use crate::config::ChainConfig;

sol! {
    #[sol(rpc)]
    interface IBadgeMinter {
        event BadgeMinted(address indexed to, uint256 indexed tokenId, string eventId);

        function mint(
            address to,
            uint8 badgeType,
            string metadataURI,
            string eventId
        ) external;

        function batchMint(
            address[] to,
            uint8[] badgeTypes,
            string[] metadataURIs,
            string[] eventIds
        ) external;
    }
}

/// Chain client backed by a single signing account. All mints go through
/// one signer, so callers must not issue transactions concurrently (nonce
/// ordering); the orchestrator serializes its fallback path.
pub struct EvmChainClient {
    signer: PrivateKeySigner,
    rpc_url: String,
    contract_address: Address,
}

impl EvmChainClient {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let signer = PrivateKeySigner::from_str(&config.private_key)
            .map_err(|e| ChainError::Rpc(format!("invalid minter key: {e}")))?;
        let contract_address = Address::from_str(&config.contract_address)
            .map_err(|_| ChainError::InvalidAddress(config.contract_address.clone()))?;

        Ok(Self {
            signer,
            rpc_url: config.rpc_url.clone(),
            contract_address,
        })
    }

    fn provider(&self) -> Result<impl Provider, ChainError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url: {e}")))?;

        Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
    }

    fn parse_address(raw: &str) -> Result<Address, ChainError> {
        Address::from_str(raw).map_err(|_| ChainError::InvalidAddress(raw.to_string()))
    }
}

fn decode_token_ids(logs: &[alloy::rpc::types::Log]) -> Vec<i64> {
    logs.iter()
        .filter_map(|log| log.log_decode::<IBadgeMinter::BadgeMinted>().ok())
        .filter_map(|decoded| u64::try_from(decoded.inner.data.tokenId).ok())
        .filter_map(|id| i64::try_from(id).ok())
        .collect()
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn batch_mint(&self, requests: &[MintRequest]) -> Result<BatchReceipt, ChainError> {
        let provider = self.provider()?;
        let contract = IBadgeMinter::new(self.contract_address, &provider);

        let mut recipients = Vec::with_capacity(requests.len());
        for request in requests {
            recipients.push(Self::parse_address(&request.to)?);
        }
        let badge_types: Vec<u8> = requests.iter().map(|r| r.badge_type).collect();
        let uris: Vec<String> = requests.iter().map(|r| r.metadata_uri.clone()).collect();
        let event_ids: Vec<String> = requests.iter().map(|r| r.event_id.clone()).collect();

        let call = contract.batchMint(recipients, badge_types, uris, event_ids);

        // Simulate before spending gas; a simulation failure is a thrown
        // call, which the orchestrator turns into individual fallback.
        call.call()
            .await
            .map_err(|e| ChainError::Rpc(format!("batch mint simulation failed: {e}")))?;

        let pending = call
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("batch mint submission failed: {e}")))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(format!("batch mint receipt failed: {e}")))?;

        let token_ids = decode_token_ids(receipt.inner.logs());

        Ok(BatchReceipt {
            success: receipt.status(),
            tx_hash,
            token_ids,
        })
    }

    async fn mint(&self, request: &MintRequest) -> Result<MintReceipt, ChainError> {
        let provider = self.provider()?;
        let contract = IBadgeMinter::new(self.contract_address, &provider);
        let to = Self::parse_address(&request.to)?;

        let call = contract.mint(
            to,
            request.badge_type,
            request.metadata_uri.clone(),
            request.event_id.clone(),
        );

        call.call()
            .await
            .map_err(|e| ChainError::Rpc(format!("mint simulation failed: {e}")))?;

        let pending = call
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("mint submission failed: {e}")))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(format!("mint receipt failed: {e}")))?;

        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }

        let token_id = decode_token_ids(receipt.inner.logs()).into_iter().next();

        Ok(MintReceipt {
            success: true,
            tx_hash,
            token_id,
        })
    }
}
