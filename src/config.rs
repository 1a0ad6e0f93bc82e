use std::collections::HashMap;
use std::env;

use logger::GrayLogConfig;
use sentry_integration::SentryConfig;

use config_crate::{Config as RawConfig, ConfigError, Environment, File};
use models::*;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: Database,
    pub cpu_pool: CpuPool,
    pub client: Client,
    pub locks: Locks,
    pub monitoring: Monitoring,
    pub balances: Balances,
    pub mail: Mail,
    #[serde(default)]
    pub platform_wallets: Vec<PlatformWallet>,
    pub graylog: Option<GrayLogConfig>,
    pub sentry: Option<SentryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CpuPool {
    pub size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    pub dns_threads: usize,
    pub blockchain_gateway_url: String,
    pub currencies_url: String,
    pub transactions_service_url: String,
    pub exchanger_url: String,
    /// Timeout of a single attempt
    pub timeout_secs: u64,
    /// Total number of attempts for transport errors and timeouts
    pub attempts: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Locks {
    /// Database urls of independent lock nodes, quorum is `nodes / 2 + 1`
    pub nodes: Vec<String>,
    pub node_pool_size: u32,
    pub cpu_pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Monitoring {
    pub check_transactions_secs: u64,
    pub check_platform_wallets_secs: u64,
    pub check_wallet_secs: u64,
    pub send_to_transaction_service_secs: u64,
    pub send_to_exchanger_secs: u64,
    pub time_delta_days: i64,
    pub lock_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Balances {
    pub min_balance_usd: Amount,
    #[serde(default)]
    pub floors: HashMap<String, Amount>,
    pub reference_currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Mail {
    pub api_url: String,
    pub domain: String,
    pub api_key: String,
    pub from: String,
    pub to: Vec<String>,
    pub balances_subject: String,
    pub alarm_subject: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformWallet {
    pub external_id: ExternalId,
    pub currency: CurrencySlug,
    pub address: BlockchainAddress,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base"))?;

        // Merge development.toml if RUN_MODE variable is not set
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        s.merge(File::with_name(&format!("config/{}", env)).required(false))?;
        s.merge(File::with_name("config/secret.toml").required(false))?;

        s.merge(Environment::with_prefix("WALLETS").separator("__"))?;
        s.try_into()
    }
}

impl Balances {
    /// Minimal balance in reference currency for a wallet of `currency`
    pub fn floor_for(&self, currency: &CurrencySlug) -> Amount {
        self.floors.get(currency.raw()).cloned().unwrap_or(self.min_balance_usd)
    }
}
