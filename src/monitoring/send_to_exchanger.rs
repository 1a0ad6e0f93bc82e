use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Either};

use super::cycle::LockedCycle;
use super::error::*;
use super::send_to_transaction_service::mark;
use super::{CycleReport, Monitor};
use client::ExchangerClient;
use locks::transaction_key;
use models::*;
use prelude::*;
use repos::{DbExecutor, TransactionsRepo, WalletsRepo};

/// Reports confirmed transfers to platform wallets back to the exchanger and marks them `Reported`
pub struct SendToExchangerMonitor<E: DbExecutor> {
    period: Duration,
    cycle: LockedCycle<E>,
    wallets_repo: Arc<WalletsRepo>,
    transactions_repo: Arc<TransactionsRepo>,
    exchanger: Arc<ExchangerClient>,
}

impl<E: DbExecutor> SendToExchangerMonitor<E> {
    pub fn new(
        period: Duration,
        cycle: LockedCycle<E>,
        wallets_repo: Arc<WalletsRepo>,
        transactions_repo: Arc<TransactionsRepo>,
        exchanger: Arc<ExchangerClient>,
    ) -> Self {
        Self {
            period,
            cycle,
            wallets_repo,
            transactions_repo,
            exchanger,
        }
    }
}

impl<E: DbExecutor> Monitor for SendToExchangerMonitor<E> {
    fn name(&self) -> &'static str {
        "send_to_exchanger"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
        let wallets_repo = self.wallets_repo.clone();
        let transactions_repo = self.transactions_repo.clone();
        let exchanger = self.exchanger.clone();
        let cycle = self.cycle.clone();
        Box::new(
            self.cycle
                .db_executor()
                .execute({
                    let transactions_repo = transactions_repo.clone();
                    move || -> Result<Vec<Transaction>, Error> {
                        let filter = WalletsFilter::platform();
                        let wallet_ids: Vec<WalletId> = wallets_repo
                            .list(filter)
                            .map_err(ectx!(try convert => filter))?
                            .into_iter()
                            .map(|wallet| wallet.id)
                            .collect();
                        if wallet_ids.is_empty() {
                            return Ok(Vec::new());
                        }
                        transactions_repo
                            .list_to_report(wallet_ids.clone())
                            .map_err(ectx!(try convert => wallet_ids))
                    }
                }).and_then(move |transactions| {
                    let db_executor = cycle.db_executor().clone();
                    let repo = transactions_repo.clone();
                    cycle.run(
                        transactions,
                        |transaction| transaction_key(transaction.id),
                        move |transaction: Transaction| {
                            let exchanger = exchanger.clone();
                            let repo = repo.clone();
                            let transaction_id = transaction.id;
                            db_executor
                                .execute(move || repo.get(transaction_id).map_err(ectx!(try convert => transaction_id)))
                                .and_then(move |current| match current {
                                    Some(ref current) if current.status == TransactionStatus::Confirmed => Either::A(
                                        exchanger
                                            .update_transactions(vec![current.clone()])
                                            .map_err(ectx!(try convert ErrorSource::Gateway => transaction_id))
                                            .map(move |_| Some(transaction_id)),
                                    ),
                                    _ => Either::B(future::ok(None)),
                                })
                        },
                        move |reported: TransactionId| {
                            mark(&*transactions_repo, reported, TransactionStatus::Confirmed, TransactionStatus::Reported)
                        },
                    )
                }),
        )
    }
}
