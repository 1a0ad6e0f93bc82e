use std::borrow::Cow;
use std::collections::HashMap;
use std::time::SystemTime;

use validator::{Validate, ValidationError, ValidationErrors};

use models::*;
use schema::transactions;

#[derive(Debug, Queryable, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: Option<WalletId>,
    pub hash: Option<TransactionHash>,
    pub uuid: Option<TransactionUuid>,
    pub address_from: BlockchainAddress,
    pub address_to: BlockchainAddress,
    pub currency_slug: CurrencySlug,
    pub value: Amount,
    pub status: TransactionStatus,
    pub is_fee_trx: bool,
    pub confirmed_at: Option<SystemTime>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Transaction {
    /// Row created in anticipation of a transfer whose hash is not known yet
    pub fn is_placeholder(&self) -> bool {
        self.hash.is_none()
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            id: TransactionId::new(1),
            wallet_id: None,
            hash: None,
            uuid: None,
            address_from: BlockchainAddress::default(),
            address_to: BlockchainAddress::default(),
            currency_slug: CurrencySlug::new("bitcoin"),
            value: Amount::default(),
            status: TransactionStatus::New,
            is_fee_trx: false,
            confirmed_at: None,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[table_name = "transactions"]
pub struct NewTransaction {
    pub wallet_id: Option<WalletId>,
    pub hash: Option<TransactionHash>,
    pub uuid: Option<TransactionUuid>,
    pub address_from: BlockchainAddress,
    pub address_to: BlockchainAddress,
    pub currency_slug: CurrencySlug,
    pub value: Amount,
    pub status: TransactionStatus,
    pub is_fee_trx: bool,
}

impl Default for NewTransaction {
    fn default() -> Self {
        Self {
            wallet_id: None,
            hash: None,
            uuid: None,
            address_from: BlockchainAddress::default(),
            address_to: BlockchainAddress::default(),
            currency_slug: CurrencySlug::new("bitcoin"),
            value: Amount::default(),
            status: TransactionStatus::New,
            is_fee_trx: false,
        }
    }
}

/// Transaction as reported by the blockchain gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainTransaction {
    pub from: BlockchainAddress,
    pub to: BlockchainAddress,
    #[serde(rename = "currencySlug")]
    pub currency_slug: CurrencySlug,
    pub value: Amount,
    pub hash: TransactionHash,
}

impl BlockchainTransaction {
    /// Incoming for a wallet means addressed to it, compared case insensitively
    pub fn is_input_for(&self, address: &BlockchainAddress) -> bool {
        self.to.raw().eq_ignore_ascii_case(address.raw())
    }

    pub fn into_new_transaction(self, wallet_id: WalletId) -> NewTransaction {
        NewTransaction {
            wallet_id: Some(wallet_id),
            hash: Some(self.hash),
            uuid: None,
            address_from: self.from,
            address_to: self.to,
            currency_slug: self.currency_slug,
            value: self.value,
            status: TransactionStatus::New,
            is_fee_trx: false,
        }
    }
}

/// Keys a platform wallet placeholder is matched by
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderKey {
    pub wallet_id: WalletId,
    pub address_from: BlockchainAddress,
    pub currency_slug: CurrencySlug,
}

/// Externally confirmed status of a transaction, identified by hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatusUpdate {
    pub hash: TransactionHash,
    pub status: TransactionStatus,
}

/// Fully known incoming transaction added through the inbound api
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTransaction {
    pub wallet_id: WalletId,
    pub hash: TransactionHash,
    pub address_from: BlockchainAddress,
    pub address_to: BlockchainAddress,
    pub currency_slug: CurrencySlug,
    pub value: Amount,
    #[serde(default)]
    pub is_fee_trx: bool,
}

impl From<InputTransaction> for NewTransaction {
    fn from(input: InputTransaction) -> Self {
        NewTransaction {
            wallet_id: Some(input.wallet_id),
            hash: Some(input.hash),
            uuid: None,
            address_from: input.address_from,
            address_to: input.address_to,
            currency_slug: input.currency_slug,
            value: input.value,
            status: TransactionStatus::New,
            is_fee_trx: input.is_fee_trx,
        }
    }
}

/// Expected transfer to a platform wallet announced by the exchanger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedTransfer {
    /// Platform wallet address
    pub address: BlockchainAddress,
    pub currency_slug: CurrencySlug,
    pub address_from: BlockchainAddress,
    pub value: Amount,
    pub uuid: TransactionUuid,
}

impl Validate for InputTransaction {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_value(self.value)
    }
}

impl Validate for ExpectedTransfer {
    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_value(self.value)
    }
}

fn validate_value(value: Amount) -> Result<(), ValidationErrors> {
    if value.fits_ledger() {
        return Ok(());
    }
    let mut errors = ValidationErrors::new();
    errors.add(
        "value",
        ValidationError {
            code: Cow::from("range"),
            message: Some(Cow::from("Value must have at most 10 integer digits")),
            params: HashMap::new(),
        },
    );
    Err(errors)
}
