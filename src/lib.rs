#![allow(proc_macro_derive_resolution_fallback)]

extern crate base64;
extern crate chrono;
extern crate config as config_crate;
extern crate ctrlc;
#[macro_use]
extern crate diesel;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate gelf;
extern crate hyper;
extern crate hyper_tls;
#[macro_use]
extern crate log;
extern crate num;
extern crate r2d2;
#[macro_use]
extern crate sentry;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate serde_qs;
extern crate tokio;
#[cfg(test)]
extern crate tokio_core;
extern crate uuid;
extern crate validator;

#[macro_use]
mod macros;
mod client;
mod config;
mod locks;
mod logger;
mod models;
mod monitoring;
mod prelude;
mod repos;
mod schema;
mod sentry_integration;
mod services;
mod utils;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use futures::sync::oneshot;
use futures_cpupool::CpuPool;
use tokio::runtime::Runtime;

use self::client::{
    BlockchainGatewayClientImpl, CurrenciesClientImpl, ExchangerClientImpl, HttpClient, HttpClientImpl, MailgunNotifier, Notifier,
    TransactionsServiceClientImpl,
};
use self::locks::{LockBackend, LockManager, PgLockBackend};
use self::monitoring::{
    CheckPlatformWalletsMonitor, CheckTransactionsMonitor, CheckWalletMonitor, LockedCycle, Monitor, Scheduler, SendToExchangerMonitor,
    SendToTransactionServiceMonitor,
};
use self::prelude::*;
use self::repos::{DbExecutorImpl, TransactionsRepoImpl, WalletsRepoImpl};
use self::services::{WalletsService, WalletsServiceImpl};
use config::Config;
use utils::log_error;

pub fn print_config() {
    println!("Parsed config: {:?}", get_config());
}

/// Runs all monitors until Ctrl+C
pub fn start_server() {
    let config = get_config();
    logger::init(config.graylog.as_ref());
    // Prepare sentry integration
    let _sentry = sentry_integration::init(config.sentry.as_ref());

    let db_pool = create_db_pool(&config.database.url, None);
    let cpu_pool = CpuPool::new(config.cpu_pool.size);
    let db_executor = DbExecutorImpl::new(db_pool, cpu_pool);
    let wallets_repo = Arc::new(WalletsRepoImpl);
    let transactions_repo = Arc::new(TransactionsRepoImpl);

    let locks = create_lock_manager(&config);
    let lock_ttl = Duration::from_secs(config.monitoring.lock_ttl_secs);
    let cycle = LockedCycle::new(locks, db_executor, lock_ttl);

    let http_client: Arc<HttpClient> = Arc::new(HttpClientImpl::new(&config));
    let blockchain_gateway = Arc::new(BlockchainGatewayClientImpl::new(&config, http_client.clone()));
    let currencies = Arc::new(CurrenciesClientImpl::new(&config, http_client.clone()));
    let transactions_service = Arc::new(TransactionsServiceClientImpl::new(&config, http_client.clone()));
    let exchanger = Arc::new(ExchangerClientImpl::new(&config, http_client.clone()));
    let notifier: Arc<Notifier> = Arc::new(MailgunNotifier::new(config.mail.clone(), http_client));

    let monitoring = &config.monitoring;
    let monitors: Vec<Arc<Monitor>> = vec![
        Arc::new(CheckTransactionsMonitor::new(
            Duration::from_secs(monitoring.check_transactions_secs),
            cycle.clone(),
            wallets_repo.clone(),
            transactions_repo.clone(),
            blockchain_gateway.clone(),
        )),
        Arc::new(CheckPlatformWalletsMonitor::new(
            Duration::from_secs(monitoring.check_platform_wallets_secs),
            monitoring.time_delta_days,
            cycle.clone(),
            wallets_repo.clone(),
            transactions_repo.clone(),
            blockchain_gateway.clone(),
        )),
        Arc::new(CheckWalletMonitor::new(
            Duration::from_secs(monitoring.check_wallet_secs),
            config.balances.clone(),
            &config.mail,
            blockchain_gateway,
            currencies,
            notifier,
        )),
        Arc::new(SendToTransactionServiceMonitor::new(
            Duration::from_secs(monitoring.send_to_transaction_service_secs),
            cycle.clone(),
            transactions_repo.clone(),
            transactions_service,
        )),
        Arc::new(SendToExchangerMonitor::new(
            Duration::from_secs(monitoring.send_to_exchanger_secs),
            cycle,
            wallets_repo,
            transactions_repo,
            exchanger,
        )),
    ];

    let (tx, rx) = oneshot::channel::<()>();
    let tx = Mutex::new(Some(tx));
    ctrlc::set_handler(move || {
        info!("Got Ctrl+C, stopping monitors");
        if let Some(tx) = tx.lock().ok().and_then(|mut tx| tx.take()) {
            let _ = tx.send(());
        }
    }).unwrap_or_else(|e| panic!("Failed to set Ctrl+C handler: {}", e));
    let shutdown = rx.map_err(|_| ());

    let mut runtime = Runtime::new().unwrap_or_else(|e| panic!("Failed to create tokio runtime: {}", e));
    if let Err(e) = runtime.block_on(Scheduler::new(monitors).run(shutdown)) {
        log_error(&e);
    }
    info!("Monitoring stopped");
}

/// Inserts configured platform wallets, existing ones are left untouched
pub fn create_platform_wallets() {
    let config = get_config();
    logger::init(config.graylog.as_ref());
    let db_pool = create_db_pool(&config.database.url, None);
    let cpu_pool = CpuPool::new(1);
    let db_executor = DbExecutorImpl::new(db_pool, cpu_pool);
    let http_client: Arc<HttpClient> = Arc::new(HttpClientImpl::new(&config));
    let service = WalletsServiceImpl::new(
        Arc::new(WalletsRepoImpl),
        Arc::new(TransactionsRepoImpl),
        db_executor,
        Arc::new(BlockchainGatewayClientImpl::new(&config, http_client.clone())),
        Arc::new(MailgunNotifier::new(config.mail.clone(), http_client)),
        config.mail.alarm_subject.clone(),
    );
    let platform_wallets = config.platform_wallets.clone();
    let mut runtime = Runtime::new().unwrap_or_else(|e| panic!("Failed to create tokio runtime: {}", e));
    match runtime.block_on(service.create_platform_wallets(platform_wallets)) {
        Ok(created) => println!("Created {} platform wallets", created),
        Err(e) => {
            log_error(&e);
            panic!("Failed to create platform wallets");
        }
    }
}

fn get_config() -> Config {
    config::Config::new().unwrap_or_else(|e| panic!("Error parsing config: {}", e))
}

fn create_lock_manager(config: &Config) -> LockManager {
    let nodes: Vec<Arc<LockBackend>> = if config.locks.nodes.is_empty() {
        vec![Arc::new(PgLockBackend::new(create_db_pool(&config.database.url, None)))]
    } else {
        config
            .locks
            .nodes
            .iter()
            .map(|url| -> Arc<LockBackend> { Arc::new(PgLockBackend::new(create_db_pool(url, Some(config.locks.node_pool_size)))) })
            .collect()
    };
    let locks = LockManager::new(nodes, CpuPool::new(config.locks.cpu_pool_size));
    info!("Using {} lock nodes, quorum is {}", config.locks.nodes.len().max(1), locks.quorum());
    locks
}

fn create_db_pool(database_url: &str, max_size: Option<u32>) -> PgPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url.to_string());
    let mut builder = r2d2::Pool::builder();
    if let Some(max_size) = max_size {
        builder = builder.max_size(max_size);
    }
    builder
        .build(manager)
        .unwrap_or_else(|_| panic!("Failed to connect to db with url: {}", database_url))
}
