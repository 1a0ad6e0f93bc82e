use std::borrow::Cow;
use std::collections::HashMap;
use std::time::SystemTime;

use validator::{Validate, ValidationError, ValidationErrors};

use models::*;
use schema::wallets;

#[derive(Debug, Queryable, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub external_id: ExternalId,
    pub currency_slug: CurrencySlug,
    pub address: BlockchainAddress,
    pub is_platform: bool,
    pub on_monitoring: bool,
    pub is_active: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            id: WalletId::new(1),
            external_id: ExternalId::new(1),
            currency_slug: CurrencySlug::new("bitcoin"),
            address: BlockchainAddress::new("addr"),
            is_platform: false,
            on_monitoring: true,
            is_active: true,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Insertable, Clone, Serialize, Deserialize)]
#[table_name = "wallets"]
pub struct NewWallet {
    pub external_id: ExternalId,
    pub currency_slug: CurrencySlug,
    pub address: BlockchainAddress,
    pub is_platform: bool,
    pub on_monitoring: bool,
    pub is_active: bool,
}

impl Default for NewWallet {
    fn default() -> Self {
        Self {
            external_id: ExternalId::new(1),
            currency_slug: CurrencySlug::new("bitcoin"),
            address: BlockchainAddress::new("addr"),
            is_platform: false,
            on_monitoring: true,
            is_active: true,
        }
    }
}

impl Validate for NewWallet {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.address.raw().is_empty() {
            errors.add("address", required_error("Wallet address must not be empty"));
        }
        if self.currency_slug.raw().is_empty() {
            errors.add("currency_slug", required_error("Currency slug must not be empty"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn required_error(message: &'static str) -> ValidationError {
    ValidationError {
        code: Cow::from("required"),
        message: Some(Cow::from(message)),
        params: HashMap::new(),
    }
}

/// Filter for wallets selected by monitors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WalletsFilter {
    pub is_platform: Option<bool>,
    pub on_monitoring: Option<bool>,
    pub is_active: Option<bool>,
}

impl WalletsFilter {
    /// Third party wallets polled by their own transaction lists
    pub fn monitored() -> Self {
        Self {
            is_platform: Some(false),
            on_monitoring: Some(true),
            is_active: Some(true),
        }
    }

    pub fn platform() -> Self {
        Self {
            is_platform: Some(true),
            on_monitoring: None,
            is_active: None,
        }
    }

    pub fn matches(&self, wallet: &Wallet) -> bool {
        self.is_platform.map(|v| v == wallet.is_platform).unwrap_or(true)
            && self.on_monitoring.map(|v| v == wallet.on_monitoring).unwrap_or(true)
            && self.is_active.map(|v| v == wallet.is_active).unwrap_or(true)
    }
}

/// Balance of a platform wallet as reported by the blockchain gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    #[serde(rename = "currencySlug")]
    pub currency_slug: CurrencySlug,
    pub value: Amount,
}

/// Rate of a currency in the reference currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub slug: CurrencySlug,
    pub rate: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_validation() {
        assert!(NewWallet::default().validate().is_ok());
        let wallet = NewWallet {
            address: BlockchainAddress::new("  "),
            ..Default::default()
        };
        assert!(wallet.validate().is_err());
    }

    #[test]
    fn test_wallets_filter() {
        let wallet = Wallet::default();
        assert!(WalletsFilter::monitored().matches(&wallet));
        assert!(!WalletsFilter::platform().matches(&wallet));
        let wallet = Wallet {
            on_monitoring: false,
            ..Default::default()
        };
        assert!(!WalletsFilter::monitored().matches(&wallet));
    }
}
