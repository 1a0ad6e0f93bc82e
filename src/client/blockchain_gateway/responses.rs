use serde::{Deserialize, Deserializer};
use serde_json;

use models::*;

#[derive(Debug, Deserialize, Clone)]
pub struct GetBalanceResponse {
    pub balance: Amount,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GetPlatformWalletsBalanceResponse {
    #[serde(default)]
    pub wallets: Vec<WalletBalance>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GetTransactionsListResponse {
    #[serde(default, deserialize_with = "deserialize_valid_transactions")]
    pub transactions: Vec<BlockchainTransaction>,
}

/// Decodes the list entry by entry. An entry that doesn't decode, or whose value doesn't fit
/// the ledger, is logged and left out, the rest of the list is kept.
fn deserialize_valid_transactions<'de, D>(deserializer: D) -> Result<Vec<BlockchainTransaction>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<BlockchainTransaction>(entry.clone()) {
            Ok(ref trx) if !trx.value.fits_ledger() => {
                warn!("Skipping transaction {} with value {} out of ledger range", trx.hash, trx.value);
                None
            }
            Ok(trx) => Some(trx),
            Err(e) => {
                warn!("Skipping malformed transaction {}: {}", entry, e);
                None
            }
        }).collect())
}

#[derive(Debug, Serialize, Clone)]
pub struct GetBalanceBySlugRequest {
    pub slug: CurrencySlug,
}

#[derive(Debug, Serialize, Clone)]
pub struct EmptyRequest {}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionsListRequest {
    pub wallet_id: ExternalId,
    pub wallet_address: BlockchainAddress,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GetExchangerTransactionsRequest {
    pub currency_slug: CurrencySlug,
    /// RFC 3339
    pub since: String,
}
