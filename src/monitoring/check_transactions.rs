use std::sync::Arc;
use std::time::Duration;

use super::cycle::LockedCycle;
use super::error::*;
use super::{CycleReport, Monitor};
use client::BlockchainGatewayClient;
use locks::wallet_key;
use models::*;
use prelude::*;
use repos::{DbExecutor, TransactionsRepo, WalletsRepo};

/// Inserts new incoming transactions of monitored third party wallets
pub struct CheckTransactionsMonitor<E: DbExecutor> {
    period: Duration,
    cycle: LockedCycle<E>,
    wallets_repo: Arc<WalletsRepo>,
    transactions_repo: Arc<TransactionsRepo>,
    blockchain_gateway: Arc<BlockchainGatewayClient>,
}

impl<E: DbExecutor> CheckTransactionsMonitor<E> {
    pub fn new(
        period: Duration,
        cycle: LockedCycle<E>,
        wallets_repo: Arc<WalletsRepo>,
        transactions_repo: Arc<TransactionsRepo>,
        blockchain_gateway: Arc<BlockchainGatewayClient>,
    ) -> Self {
        Self {
            period,
            cycle,
            wallets_repo,
            transactions_repo,
            blockchain_gateway,
        }
    }
}

impl<E: DbExecutor> Monitor for CheckTransactionsMonitor<E> {
    fn name(&self) -> &'static str {
        "check_transactions"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
        let wallets_repo = self.wallets_repo.clone();
        let transactions_repo = self.transactions_repo.clone();
        let blockchain_gateway = self.blockchain_gateway.clone();
        let cycle = self.cycle.clone();
        let filter = WalletsFilter::monitored();
        Box::new(
            self.cycle
                .db_executor()
                .execute(move || wallets_repo.list(filter).map_err(ectx!(try convert => filter)))
                .and_then(move |wallets| {
                    cycle.run(
                        wallets,
                        |wallet| wallet_key(wallet.id),
                        move |wallet: Wallet| {
                            let wallet_id = wallet.id;
                            let address = wallet.address.clone();
                            blockchain_gateway
                                .get_transactions_list(wallet.external_id, wallet.address.clone())
                                .map_err(ectx!(try convert ErrorSource::Gateway => wallet_id))
                                .map(move |reported| {
                                    let inputs: Vec<NewTransaction> = reported
                                        .into_iter()
                                        .filter(|trx| trx.is_input_for(&address))
                                        .map(|trx| trx.into_new_transaction(wallet_id))
                                        .collect();
                                    if inputs.is_empty() {
                                        None
                                    } else {
                                        Some(inputs)
                                    }
                                })
                        },
                        move |inputs: Vec<NewTransaction>| save_new(&*transactions_repo, inputs),
                    )
                }),
        )
    }
}

fn save_new(transactions_repo: &TransactionsRepo, inputs: Vec<NewTransaction>) -> Result<usize, Error> {
    let mut saved = 0;
    for new_transaction in inputs {
        let hash = new_transaction.hash.clone();
        if let Some(ref hash) = hash {
            if transactions_repo.exists_by_hash(hash.clone()).map_err(ectx!(try convert => hash))? {
                trace!("Transaction {} is already known", hash);
                continue;
            }
        }
        if transactions_repo
            .create_if_new(new_transaction.clone())
            .map_err(ectx!(try convert => new_transaction))?
            .is_some()
        {
            saved += 1;
        }
    }
    if saved > 0 {
        info!("Saved {} new input transactions", saved);
    }
    Ok(saved)
}
