use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;

use super::gateway::{Error, GatewayConfig, GatewayService, RemoteGateway};
use super::HttpClient;
use config::Config;
use models::*;

pub const SUCCESS: i32 = 0;
/// The service already tracks some of the transactions
pub const ALREADY_EXISTS: i32 = 2;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredTransaction {
    pub from: BlockchainAddress,
    pub to: BlockchainAddress,
    pub currency_slug: CurrencySlug,
    pub wallet_id: Option<WalletId>,
    pub value: Amount,
    pub hash: Option<TransactionHash>,
}

impl From<Transaction> for MonitoredTransaction {
    fn from(transaction: Transaction) -> Self {
        MonitoredTransaction {
            from: transaction.address_from,
            to: transaction.address_to,
            currency_slug: transaction.currency_slug,
            wallet_id: transaction.wallet_id,
            value: transaction.value,
            hash: transaction.hash,
        }
    }
}

#[derive(Debug, Serialize)]
struct PutOnMonitoringRequest {
    transactions: Vec<MonitoredTransaction>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

/// Downstream service tracking confirmations of input transactions
pub trait TransactionsServiceClient: Send + Sync + 'static {
    fn put_on_monitoring(&self, transactions: Vec<Transaction>) -> Box<Future<Item = (), Error = Error> + Send>;
}

#[derive(Clone)]
pub struct TransactionsServiceClientImpl {
    gateway: RemoteGateway,
}

impl TransactionsServiceClientImpl {
    pub fn new(config: &Config, cli: Arc<HttpClient>) -> Self {
        let gateway = RemoteGateway::new(
            cli,
            GatewayConfig {
                service: GatewayService::Transactions,
                url: config.client.transactions_service_url.clone(),
                header_field: "header",
                success_status: SUCCESS,
                timeout: Duration::from_secs(config.client.timeout_secs),
                attempts: config.client.attempts,
            },
        );
        Self { gateway }
    }
}

impl TransactionsServiceClient for TransactionsServiceClientImpl {
    fn put_on_monitoring(&self, transactions: Vec<Transaction>) -> Box<Future<Item = (), Error = Error> + Send> {
        let request = PutOnMonitoringRequest {
            transactions: transactions.into_iter().map(From::from).collect(),
        };
        Box::new(
            self.gateway
                .call::<_, EmptyResponse>("/PutOnMonitoring", &request, &[SUCCESS, ALREADY_EXISTS])
                .map(|_| ()),
        )
    }
}
