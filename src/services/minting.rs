//! Badge claim and batch-mint orchestration. Self-claims reserve the badge
//! row before touching the chain so the unique claim constraint settles
//! races; batch minting tries one batch transaction and degrades to
//! sequential individual mints when the batch call throws. Chain failures
//! are always itemized per recipient, never raised for the whole request.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tokio::time::timeout;
use uuid::Uuid;

use crate::chain::{BatchReceipt, ChainClient, ChainError, MintRequest};
use crate::config::Config;
use crate::models::{Badge, BadgeType, Event, EventAttendance, NftMetadata, User};
use crate::services::entitlement;
use crate::store;
use crate::store::attendance::AttendeeWallet;
use crate::utils::error::AppError;

/// Strict recipient address check: 0x followed by exactly 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct Recipient {
    pub user_id: Option<Uuid>,
    pub address: String,
    pub from_attendance: bool,
}

/// Per-recipient result; the orchestrator returns one of these for every
/// requested target, success or not.
#[derive(Debug, Clone, Serialize)]
pub struct MintOutcome {
    pub user_id: Option<Uuid>,
    pub address: Option<String>,
    pub success: bool,
    pub tx_hash: Option<String>,
    pub token_id: Option<i64>,
    pub error: Option<String>,
}

impl MintOutcome {
    fn succeeded(
        recipient: &Recipient,
        tx_hash: &str,
        token_id: Option<i64>,
    ) -> Self {
        Self {
            user_id: recipient.user_id,
            address: Some(recipient.address.clone()),
            success: true,
            tx_hash: Some(tx_hash.to_string()),
            token_id,
            error: None,
        }
    }

    fn failed(user_id: Option<Uuid>, address: Option<String>, error: impl Into<String>) -> Self {
        Self {
            user_id,
            address,
            success: false,
            tx_hash: None,
            token_id: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient resolution

/// Merges attendance-derived and RSVP-derived wallets for the selected
/// attendee ids, preferring the attendance entry when a user appears in
/// both, and validates raw addresses. Unresolvable targets become
/// per-item failures instead of aborting the batch. Repeated ids and
/// addresses in the input collapse to one recipient each, so a sloppy
/// request cannot mint the same badge twice.
pub fn merge_recipients(
    attendance: &[AttendeeWallet],
    rsvps: &[(Uuid, Option<String>)],
    attendee_ids: &[Uuid],
    raw_addresses: &[String],
) -> (Vec<Recipient>, Vec<MintOutcome>) {
    let by_attendance: HashMap<Uuid, &AttendeeWallet> =
        attendance.iter().map(|a| (a.user_id, a)).collect();
    let by_rsvp: HashMap<Uuid, &Option<String>> =
        rsvps.iter().map(|(id, wallet)| (*id, wallet)).collect();

    let mut recipients = Vec::new();
    let mut rejected = Vec::new();
    let mut seen_ids = HashSet::new();

    for &user_id in attendee_ids {
        if !seen_ids.insert(user_id) {
            continue;
        }
        if let Some(entry) = by_attendance.get(&user_id) {
            if entry.nft_minted {
                rejected.push(MintOutcome::failed(
                    Some(user_id),
                    entry.wallet_address.clone(),
                    "Badge already minted for this attendee",
                ));
            } else {
                match &entry.wallet_address {
                    Some(wallet) if is_valid_address(wallet) => recipients.push(Recipient {
                        user_id: Some(user_id),
                        address: wallet.clone(),
                        from_attendance: true,
                    }),
                    _ => rejected.push(MintOutcome::failed(
                        Some(user_id),
                        None,
                        "No wallet address on file",
                    )),
                }
            }
        } else if let Some(wallet) = by_rsvp.get(&user_id) {
            match wallet {
                Some(wallet) if is_valid_address(wallet) => recipients.push(Recipient {
                    user_id: Some(user_id),
                    address: wallet.clone(),
                    from_attendance: false,
                }),
                _ => rejected.push(MintOutcome::failed(
                    Some(user_id),
                    None,
                    "No wallet address on file",
                )),
            }
        } else {
            rejected.push(MintOutcome::failed(
                Some(user_id),
                None,
                "Not an attendee or RSVP of this event",
            ));
        }
    }

    let mut seen_addresses = HashSet::new();
    for address in raw_addresses {
        if !seen_addresses.insert(address.as_str()) {
            continue;
        }
        if is_valid_address(address) {
            recipients.push(Recipient {
                user_id: None,
                address: address.clone(),
                from_attendance: false,
            });
        } else {
            rejected.push(MintOutcome::failed(
                None,
                Some(address.clone()),
                "Invalid wallet address",
            ));
        }
    }

    (recipients, rejected)
}

// ---------------------------------------------------------------------------
// Metadata

pub fn metadata_fields(
    event: &Event,
    badge_type: BadgeType,
) -> (String, String, serde_json::Value) {
    let date = event.start_time.format("%Y-%m-%d").to_string();
    let name = format!("{} - {}", event.title, badge_type.label());
    let description = format!(
        "Proof of participation in {} on {}.",
        event.title, date
    );
    let attributes = json!([
        { "trait_type": "Event", "value": event.title },
        { "trait_type": "Date", "value": date },
        { "trait_type": "Badge Type", "value": badge_type.label() },
        { "trait_type": "Platform", "value": "ProofPass" },
    ]);
    (name, description, attributes)
}

/// Publishes one metadata record for a mint operation and derives the URI
/// the on-chain call embeds. Shared across every recipient of a batch.
pub async fn publish_metadata(
    pool: &PgPool,
    config: &Config,
    event: &Event,
    badge_type: BadgeType,
    image: &str,
) -> Result<(NftMetadata, String), AppError> {
    let (name, description, attributes) = metadata_fields(event, badge_type);
    let metadata = store::metadata::insert(pool, &name, &description, image, &attributes).await?;
    let uri = config.metadata_uri(metadata.id);
    Ok((metadata, uri))
}

// ---------------------------------------------------------------------------
// Mint execution

/// Result of the single batch transaction attempt. The chain call is
/// all-or-nothing: a confirmed receipt covers every recipient uniformly,
/// and only a thrown call (no receipt at all) opens the individual
/// fallback path.
#[derive(Debug)]
pub enum BatchOutcome {
    AllSucceeded(BatchReceipt),
    AllFailed(BatchReceipt),
    BatchCallThrew(String),
}

impl BatchOutcome {
    pub fn classify(result: Result<BatchReceipt, ChainError>) -> Self {
        match result {
            Ok(receipt) if receipt.success => BatchOutcome::AllSucceeded(receipt),
            Ok(receipt) => BatchOutcome::AllFailed(receipt),
            Err(e) => BatchOutcome::BatchCallThrew(e.to_string()),
        }
    }
}

fn mint_request(
    recipient: &Recipient,
    badge_type: BadgeType,
    metadata_uri: &str,
    event_id: Uuid,
) -> MintRequest {
    MintRequest {
        to: recipient.address.clone(),
        badge_type: badge_type.code(),
        metadata_uri: metadata_uri.to_string(),
        event_id: event_id.to_string(),
    }
}

/// Mints to every recipient: one batch transaction first, then sequential
/// individual mints if the batch call threw. Sequential on purpose; one
/// signing account cannot tolerate concurrent nonces. A timed-out batch
/// attempt may still land on-chain, so it is reported as a uniform
/// failure rather than retried individually.
pub async fn mint_all<C: ChainClient + ?Sized>(
    chain: &C,
    recipients: &[Recipient],
    badge_type: BadgeType,
    metadata_uri: &str,
    event_id: Uuid,
    attempt_timeout: Duration,
) -> Vec<MintOutcome> {
    let requests: Vec<MintRequest> = recipients
        .iter()
        .map(|r| mint_request(r, badge_type, metadata_uri, event_id))
        .collect();

    let batch = match timeout(attempt_timeout, chain.batch_mint(&requests)).await {
        Ok(result) => BatchOutcome::classify(result),
        Err(_) => {
            return recipients
                .iter()
                .map(|r| {
                    MintOutcome::failed(
                        r.user_id,
                        Some(r.address.clone()),
                        "Mint attempt timed out",
                    )
                })
                .collect()
        }
    };

    match batch {
        BatchOutcome::AllSucceeded(receipt) => {
            let mut token_ids = receipt.token_ids.into_iter();
            recipients
                .iter()
                .map(|r| MintOutcome::succeeded(r, &receipt.tx_hash, token_ids.next()))
                .collect()
        }
        BatchOutcome::AllFailed(receipt) => recipients
            .iter()
            .map(|r| {
                let mut outcome = MintOutcome::failed(
                    r.user_id,
                    Some(r.address.clone()),
                    "Batch transaction reverted",
                );
                outcome.tx_hash = Some(receipt.tx_hash.clone());
                outcome
            })
            .collect(),
        BatchOutcome::BatchCallThrew(error) => {
            tracing::warn!(%error, "Batch mint call threw, falling back to individual mints");
            let mut outcomes = Vec::with_capacity(recipients.len());
            for (recipient, request) in recipients.iter().zip(&requests) {
                let outcome = match timeout(attempt_timeout, chain.mint(request)).await {
                    Ok(Ok(receipt)) => {
                        MintOutcome::succeeded(recipient, &receipt.tx_hash, receipt.token_id)
                    }
                    Ok(Err(e)) => MintOutcome::failed(
                        recipient.user_id,
                        Some(recipient.address.clone()),
                        e.to_string(),
                    ),
                    Err(_) => MintOutcome::failed(
                        recipient.user_id,
                        Some(recipient.address.clone()),
                        "Mint attempt timed out",
                    ),
                };
                outcomes.push(outcome);
            }
            outcomes
        }
    }
}

// ---------------------------------------------------------------------------
// Self-claim

/// Precondition chain for a self-claim, first failure wins. Returns the
/// caller's wallet and the badge image on success.
pub fn claim_preconditions(
    caller: &User,
    event: &Event,
    attendance: Option<&EventAttendance>,
    existing_badge: Option<&Badge>,
) -> Result<(String, String), AppError> {
    let wallet = caller
        .wallet_address
        .as_deref()
        .filter(|w| is_valid_address(w))
        .ok_or_else(|| AppError::ValidationError("No wallet address on file".to_string()))?;

    let image = event.badge_image.as_deref().ok_or_else(|| {
        AppError::ValidationError("Badge is not set up for this event".to_string())
    })?;

    let attendance = attendance.ok_or_else(|| {
        AppError::Forbidden("You must check in to this event first".to_string())
    })?;

    if !attendance.approved_for_minting {
        return Err(AppError::Forbidden(
            "Your attendance has not been approved for minting".to_string(),
        ));
    }

    // Two idempotency guards: the attendance flag is a denormalized cache,
    // the badge row is the authoritative ledger.
    if attendance.nft_minted || existing_badge.is_some() {
        return Err(AppError::Conflict("Badge already claimed".to_string()));
    }

    Ok((wallet.to_string(), image.to_string()))
}

pub async fn claim_badge<C: ChainClient + ?Sized>(
    pool: &PgPool,
    chain: &C,
    config: &Config,
    caller: &User,
    event_id: Uuid,
) -> Result<MintOutcome, AppError> {
    let (event, _) = entitlement::visible_event(pool, event_id, caller).await?;

    let attendance = store::attendance::find(pool, event.id, caller.id).await?;
    let existing_badge = store::badges::find_for_event(pool, caller.id, event.id).await?;
    let (wallet, image) =
        claim_preconditions(caller, &event, attendance.as_ref(), existing_badge.as_ref())?;

    // Reserve the badge row before the chain call; the unique claim
    // constraint makes the loser of a concurrent claim fail here instead
    // of minting twice.
    let reservation =
        store::badges::insert_reservation(pool, caller.id, event.id, BadgeType::Attendance)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, "Badge already claimed"))?;

    let minted = mint_reserved(pool, chain, config, caller, &event, &wallet, &image).await;
    match minted {
        Ok(outcome) => {
            if let (Some(tx_hash), token_id) = (outcome.tx_hash.as_deref(), outcome.token_id) {
                store::badges::mark_minted(pool, reservation.id, tx_hash, token_id).await?;
                store::attendance::mark_minted(pool, event.id, caller.id, tx_hash, token_id)
                    .await?;
            }
            Ok(outcome)
        }
        Err(e) => {
            // Nothing was minted; release the reservation so the user can
            // retry once the chain recovers.
            if let Err(release_err) = store::badges::release_reservation(pool, reservation.id).await
            {
                tracing::error!(error = ?release_err, badge_id = %reservation.id,
                    "Failed to release claim reservation");
            }
            Err(e)
        }
    }
}

async fn mint_reserved<C: ChainClient + ?Sized>(
    pool: &PgPool,
    chain: &C,
    config: &Config,
    caller: &User,
    event: &Event,
    wallet: &str,
    image: &str,
) -> Result<MintOutcome, AppError> {
    let (_, uri) = publish_metadata(pool, config, event, BadgeType::Attendance, image).await?;

    let recipient = Recipient {
        user_id: Some(caller.id),
        address: wallet.to_string(),
        from_attendance: true,
    };
    let request = mint_request(&recipient, BadgeType::Attendance, &uri, event.id);
    let attempt_timeout = Duration::from_secs(config.mint_timeout_secs);

    match timeout(attempt_timeout, chain.mint(&request)).await {
        Ok(Ok(receipt)) => Ok(MintOutcome::succeeded(
            &recipient,
            &receipt.tx_hash,
            receipt.token_id,
        )),
        Ok(Err(e)) => Err(AppError::ExternalServiceError(format!(
            "Mint failed: {e}"
        ))),
        Err(_) => Err(AppError::ExternalServiceError(
            "Mint attempt timed out".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Manager batch mint

pub struct BatchMintInput {
    pub attendee_ids: Vec<Uuid>,
    pub addresses: Vec<String>,
    pub badge_type: BadgeType,
    pub badge_image: Option<String>,
}

pub async fn batch_mint<C: ChainClient + ?Sized>(
    pool: &PgPool,
    chain: &C,
    config: &Config,
    caller: &User,
    event_id: Uuid,
    input: BatchMintInput,
) -> Result<Vec<MintOutcome>, AppError> {
    let (event, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    let image = input
        .badge_image
        .clone()
        .or_else(|| event.badge_image.clone())
        .unwrap_or_else(|| config.default_badge_image.clone());

    if input.attendee_ids.is_empty() && input.addresses.is_empty() {
        return Err(AppError::ValidationError(
            "At least one recipient is required".to_string(),
        ));
    }

    let attendance = store::attendance::wallets_for_event(pool, event.id).await?;
    let rsvps = store::engagement::list_going_with_wallets(pool, event.id).await?;
    let (recipients, rejected) =
        merge_recipients(&attendance, &rsvps, &input.attendee_ids, &input.addresses);

    if recipients.is_empty() {
        return Err(AppError::ValidationError(
            "No valid mint targets among the requested recipients".to_string(),
        ));
    }

    let (_, uri) = publish_metadata(pool, config, &event, input.badge_type, &image).await?;
    let attempt_timeout = Duration::from_secs(config.mint_timeout_secs);
    let outcomes = mint_all(
        chain,
        &recipients,
        input.badge_type,
        &uri,
        event.id,
        attempt_timeout,
    )
    .await;

    // Persist results. The mint already happened, so a storage hiccup here
    // is logged and does not fail the request.
    for (recipient, outcome) in recipients.iter().zip(&outcomes) {
        if !outcome.success {
            continue;
        }
        let Some(user_id) = recipient.user_id else {
            continue;
        };
        let tx_hash = outcome.tx_hash.as_deref().unwrap_or_default();

        if recipient.from_attendance {
            if let Err(e) =
                store::attendance::mark_minted(pool, event.id, user_id, tx_hash, outcome.token_id)
                    .await
            {
                tracing::error!(error = ?e, %user_id, "Failed to record mint on attendance");
            }
        }
        if let Err(e) = store::badges::insert_minted_if_absent(
            pool,
            user_id,
            event.id,
            input.badge_type,
            tx_hash,
            outcome.token_id,
        )
        .await
        {
            tracing::error!(error = ?e, %user_id, "Failed to append badge row");
        }
    }

    let mut all = outcomes;
    all.extend(rejected);
    Ok(all)
}

// ---------------------------------------------------------------------------
// Minting-approval gate

pub async fn set_minting_approval(
    pool: &PgPool,
    caller: &User,
    event_id: Uuid,
    attendee_ids: &[Uuid],
    approved: bool,
) -> Result<u64, AppError> {
    let (event, ent) = entitlement::visible_event(pool, event_id, caller).await?;
    entitlement::require_manage(&ent)?;

    if attendee_ids.is_empty() {
        return Err(AppError::ValidationError(
            "At least one attendee is required".to_string(),
        ));
    }

    Ok(store::attendance::set_minting_approval(pool, event.id, attendee_ids, approved).await?)
}
