use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;

use super::gateway::{Error, GatewayConfig, GatewayService, RemoteGateway};
use super::HttpClient;
use config::Config;
use models::*;

pub const SUCCESS: i32 = 0;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ConfirmedTransfer {
    pub uuid: Option<TransactionUuid>,
    pub value: Amount,
    pub trx_hash: Option<TransactionHash>,
}

impl From<Transaction> for ConfirmedTransfer {
    fn from(transaction: Transaction) -> Self {
        ConfirmedTransfer {
            uuid: transaction.uuid,
            value: transaction.value,
            trx_hash: transaction.hash,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateTransactionsRequest {
    transactions: Vec<ConfirmedTransfer>,
}

#[derive(Debug, Deserialize)]
struct EmptyResponse {}

/// Exchanger waiting for confirmations of transfers it initiated
pub trait ExchangerClient: Send + Sync + 'static {
    fn update_transactions(&self, transactions: Vec<Transaction>) -> Box<Future<Item = (), Error = Error> + Send>;
}

#[derive(Clone)]
pub struct ExchangerClientImpl {
    gateway: RemoteGateway,
}

impl ExchangerClientImpl {
    pub fn new(config: &Config, cli: Arc<HttpClient>) -> Self {
        let gateway = RemoteGateway::new(
            cli,
            GatewayConfig {
                service: GatewayService::Exchanger,
                url: config.client.exchanger_url.clone(),
                header_field: "header",
                success_status: SUCCESS,
                timeout: Duration::from_secs(config.client.timeout_secs),
                attempts: config.client.attempts,
            },
        );
        Self { gateway }
    }
}

impl ExchangerClient for ExchangerClientImpl {
    fn update_transactions(&self, transactions: Vec<Transaction>) -> Box<Future<Item = (), Error = Error> + Send> {
        let request = UpdateTransactionsRequest {
            transactions: transactions.into_iter().map(From::from).collect(),
        };
        Box::new(
            self.gateway
                .call::<_, EmptyResponse>("/UpdateTransactions", &request, &[SUCCESS])
                .map(|_| ()),
        )
    }
}

#[cfg(test)]
pub mod mocks {
    use std::sync::{Arc, Mutex};

    use futures::future;

    use super::*;
    use client::gateway::ErrorKind;

    #[derive(Clone, Default)]
    pub struct ExchangerClientMock {
        pub received: Arc<Mutex<Vec<Transaction>>>,
        pub unavailable: Arc<Mutex<bool>>,
    }

    impl ExchangerClientMock {
        pub fn received(&self) -> Vec<Transaction> {
            self.received.lock().unwrap().clone()
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.lock().unwrap() = unavailable;
        }
    }

    impl ExchangerClient for ExchangerClientMock {
        fn update_transactions(&self, transactions: Vec<Transaction>) -> Box<Future<Item = (), Error = Error> + Send> {
            if *self.unavailable.lock().unwrap() {
                let e: Error = ErrorKind::Unavailable(GatewayService::Exchanger).into();
                return Box::new(future::err(e));
            }
            self.received.lock().unwrap().extend(transactions);
            Box::new(future::ok(()))
        }
    }
}
