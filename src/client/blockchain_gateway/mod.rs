mod responses;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::prelude::*;

use self::responses::*;
use super::gateway::{Error, GatewayConfig, GatewayService, RemoteGateway};
use super::HttpClient;
use config::Config;
use models::*;

pub const SUCCESS: i32 = 0;

/// Source of truth for chain state
pub trait BlockchainGatewayClient: Send + Sync + 'static {
    fn get_balance_by_slug(&self, slug: CurrencySlug) -> Box<Future<Item = Amount, Error = Error> + Send>;
    fn get_platform_wallets_balance(&self) -> Box<Future<Item = Vec<WalletBalance>, Error = Error> + Send>;
    /// Transactions of a third party wallet
    fn get_transactions_list(
        &self,
        external_id: ExternalId,
        address: BlockchainAddress,
    ) -> Box<Future<Item = Vec<BlockchainTransaction>, Error = Error> + Send>;
    /// Transactions to exchanger (platform) wallets of a currency since a moment
    fn get_exchanger_transactions(
        &self,
        currency_slug: CurrencySlug,
        since: SystemTime,
    ) -> Box<Future<Item = Vec<BlockchainTransaction>, Error = Error> + Send>;
}

#[derive(Clone)]
pub struct BlockchainGatewayClientImpl {
    gateway: RemoteGateway,
}

impl BlockchainGatewayClientImpl {
    pub fn new(config: &Config, cli: Arc<HttpClient>) -> Self {
        let gateway = RemoteGateway::new(
            cli,
            GatewayConfig {
                service: GatewayService::BlockchainGateway,
                url: config.client.blockchain_gateway_url.clone(),
                header_field: "status",
                success_status: SUCCESS,
                timeout: Duration::from_secs(config.client.timeout_secs),
                attempts: config.client.attempts,
            },
        );
        Self { gateway }
    }
}

impl BlockchainGatewayClient for BlockchainGatewayClientImpl {
    fn get_balance_by_slug(&self, slug: CurrencySlug) -> Box<Future<Item = Amount, Error = Error> + Send> {
        let request = GetBalanceBySlugRequest { slug };
        Box::new(
            self.gateway
                .call::<_, GetBalanceResponse>("/GetBalanceBySlug", &request, &[SUCCESS])
                .map(|resp| resp.balance),
        )
    }

    fn get_platform_wallets_balance(&self) -> Box<Future<Item = Vec<WalletBalance>, Error = Error> + Send> {
        Box::new(
            self.gateway
                .call::<_, GetPlatformWalletsBalanceResponse>("/GetPlatformWalletsBalance", &EmptyRequest {}, &[SUCCESS])
                .map(|resp| resp.wallets),
        )
    }

    fn get_transactions_list(
        &self,
        external_id: ExternalId,
        address: BlockchainAddress,
    ) -> Box<Future<Item = Vec<BlockchainTransaction>, Error = Error> + Send> {
        let request = GetTransactionsListRequest {
            wallet_id: external_id,
            wallet_address: address,
        };
        Box::new(
            self.gateway
                .call::<_, GetTransactionsListResponse>("/GetTransactionsList", &request, &[SUCCESS])
                .map(|resp| resp.transactions),
        )
    }

    fn get_exchanger_transactions(
        &self,
        currency_slug: CurrencySlug,
        since: SystemTime,
    ) -> Box<Future<Item = Vec<BlockchainTransaction>, Error = Error> + Send> {
        let since: DateTime<Utc> = since.into();
        let request = GetExchangerTransactionsRequest {
            currency_slug,
            since: since.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        Box::new(
            self.gateway
                .call::<_, GetTransactionsListResponse>("/GetExchangerTransactions", &request, &[SUCCESS])
                .map(|resp| resp.transactions),
        )
    }
}
