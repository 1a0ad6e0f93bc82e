use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, Either};

use super::cycle::LockedCycle;
use super::error::*;
use super::{CycleReport, Monitor};
use client::TransactionsServiceClient;
use locks::transaction_key;
use models::*;
use prelude::*;
use repos::{DbExecutor, TransactionsRepo};

/// Registers new transactions in the transactions service and marks them `Sent`
pub struct SendToTransactionServiceMonitor<E: DbExecutor> {
    period: Duration,
    cycle: LockedCycle<E>,
    transactions_repo: Arc<TransactionsRepo>,
    transactions_service: Arc<TransactionsServiceClient>,
}

impl<E: DbExecutor> SendToTransactionServiceMonitor<E> {
    pub fn new(
        period: Duration,
        cycle: LockedCycle<E>,
        transactions_repo: Arc<TransactionsRepo>,
        transactions_service: Arc<TransactionsServiceClient>,
    ) -> Self {
        Self {
            period,
            cycle,
            transactions_repo,
            transactions_service,
        }
    }
}

impl<E: DbExecutor> Monitor for SendToTransactionServiceMonitor<E> {
    fn name(&self) -> &'static str {
        "send_to_transaction_service"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
        let transactions_repo = self.transactions_repo.clone();
        let transactions_service = self.transactions_service.clone();
        let cycle = self.cycle.clone();
        Box::new(
            self.cycle
                .db_executor()
                .execute({
                    let transactions_repo = transactions_repo.clone();
                    move || transactions_repo.list_to_send().map_err(ectx!(try convert))
                }).and_then(move |transactions| {
                    let db_executor = cycle.db_executor().clone();
                    let repo = transactions_repo.clone();
                    cycle.run(
                        transactions,
                        |transaction| transaction_key(transaction.id),
                        move |transaction: Transaction| {
                            let transactions_service = transactions_service.clone();
                            let repo = repo.clone();
                            let transaction_id = transaction.id;
                            // someone may have sent it between the listing and the lock
                            db_executor
                                .execute(move || repo.get(transaction_id).map_err(ectx!(try convert => transaction_id)))
                                .and_then(move |current| match current {
                                    Some(ref current) if current.status == TransactionStatus::New && current.hash.is_some() => {
                                        Either::A(
                                            transactions_service
                                                .put_on_monitoring(vec![current.clone()])
                                                .map_err(ectx!(try convert ErrorSource::Gateway => transaction_id))
                                                .map(move |_| Some(transaction_id)),
                                        )
                                    }
                                    _ => Either::B(future::ok(None)),
                                })
                        },
                        move |sent: TransactionId| mark(&*transactions_repo, sent, TransactionStatus::New, TransactionStatus::Sent),
                    )
                }),
        )
    }
}

/// Compare and set of the status. A transaction whose status moved concurrently, e.g. confirmed
/// through `update_trx` during the downstream call, keeps its new status and is not counted.
pub fn mark(
    transactions_repo: &TransactionsRepo,
    transaction_id: TransactionId,
    expected: TransactionStatus,
    next: TransactionStatus,
) -> Result<usize, Error> {
    let transaction = transactions_repo
        .update_status(transaction_id, expected, next)
        .map_err(ectx!(try convert => transaction_id, expected, next))?;
    match transaction {
        Some(_) => {
            info!("Moved transaction {} from {} to {}", transaction_id, expected, next);
            Ok(1)
        }
        None => {
            warn!(
                "Transaction {} is no longer {}, leaving it as is instead of moving to {}",
                transaction_id, expected, next
            );
            Ok(0)
        }
    }
}
