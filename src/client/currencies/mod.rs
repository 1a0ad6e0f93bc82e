use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;

use super::gateway::{Error, GatewayConfig, GatewayService, RemoteGateway};
use super::HttpClient;
use config::Config;
use models::*;

pub const SUCCESS: i32 = 0;

#[derive(Debug, Serialize)]
struct GetRatesRequest {}

#[derive(Debug, Deserialize)]
struct GetRatesResponse {
    #[serde(default)]
    currencies: Vec<CurrencyRate>,
}

/// Exchange rates of currencies to the reference currency
pub trait CurrenciesClient: Send + Sync + 'static {
    fn get_rates(&self) -> Box<Future<Item = Vec<CurrencyRate>, Error = Error> + Send>;
}

#[derive(Clone)]
pub struct CurrenciesClientImpl {
    gateway: RemoteGateway,
}

impl CurrenciesClientImpl {
    pub fn new(config: &Config, cli: Arc<HttpClient>) -> Self {
        let gateway = RemoteGateway::new(
            cli,
            GatewayConfig {
                service: GatewayService::Currencies,
                url: config.client.currencies_url.clone(),
                header_field: "status",
                success_status: SUCCESS,
                timeout: Duration::from_secs(config.client.timeout_secs),
                attempts: config.client.attempts,
            },
        );
        Self { gateway }
    }
}

impl CurrenciesClient for CurrenciesClientImpl {
    fn get_rates(&self) -> Box<Future<Item = Vec<CurrencyRate>, Error = Error> + Send> {
        Box::new(
            self.gateway
                .call::<_, GetRatesResponse>("/GetRates", &GetRatesRequest {}, &[SUCCESS])
                .map(|resp| resp.currencies),
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
    pub struct CurrenciesClientMock {
        pub rates: Arc<Mutex<Vec<CurrencyRate>>>,
        pub unavailable: Arc<Mutex<bool>>,
    }

    impl CurrenciesClientMock {
        pub fn with_rates(rates: Vec<CurrencyRate>) -> Self {
            Self {
                rates: Arc::new(Mutex::new(rates)),
                unavailable: Arc::new(Mutex::new(false)),
            }
        }

        pub fn unavailable() -> Self {
            let mock = Self::default();
            *mock.unavailable.lock().unwrap() = true;
            mock
        }
    }

    impl CurrenciesClient for CurrenciesClientMock {
        fn get_rates(&self) -> Box<Future<Item = Vec<CurrencyRate>, Error = Error> + Send> {
            if *self.unavailable.lock().unwrap() {
                let e: Error = ErrorKind::Unavailable(GatewayService::Currencies).into();
                return Box::new(future::err(e));
            }
            Box::new(future::ok(self.rates.lock().unwrap().clone()))
        }
    }
}
