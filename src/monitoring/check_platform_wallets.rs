use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Duration as ChronoDuration;

use super::cycle::LockedCycle;
use super::error::*;
use super::{CycleReport, Monitor};
use client::BlockchainGatewayClient;
use locks::wallet_key;
use models::*;
use prelude::*;
use repos::{DbExecutor, TransactionsRepo, WalletsRepo};

/// Completes placeholders of platform wallets with transfers reported by the exchanger feed.
///
/// A platform wallet only accepts transfers that were announced beforehand, so a reported
/// transfer without a matching placeholder is dropped instead of inserted.
pub struct CheckPlatformWalletsMonitor<E: DbExecutor> {
    period: Duration,
    time_delta: ChronoDuration,
    cycle: LockedCycle<E>,
    wallets_repo: Arc<WalletsRepo>,
    transactions_repo: Arc<TransactionsRepo>,
    blockchain_gateway: Arc<BlockchainGatewayClient>,
}

impl<E: DbExecutor> CheckPlatformWalletsMonitor<E> {
    pub fn new(
        period: Duration,
        time_delta_days: i64,
        cycle: LockedCycle<E>,
        wallets_repo: Arc<WalletsRepo>,
        transactions_repo: Arc<TransactionsRepo>,
        blockchain_gateway: Arc<BlockchainGatewayClient>,
    ) -> Self {
        Self {
            period,
            time_delta: ChronoDuration::days(time_delta_days),
            cycle,
            wallets_repo,
            transactions_repo,
            blockchain_gateway,
        }
    }

    fn since(&self) -> SystemTime {
        let now = SystemTime::now();
        self.time_delta.to_std().ok().and_then(|delta| now.checked_sub(delta)).unwrap_or(now)
    }
}

impl<E: DbExecutor> Monitor for CheckPlatformWalletsMonitor<E> {
    fn name(&self) -> &'static str {
        "check_platform_wallets"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send> {
        let wallets_repo = self.wallets_repo.clone();
        let transactions_repo = self.transactions_repo.clone();
        let blockchain_gateway = self.blockchain_gateway.clone();
        let cycle = self.cycle.clone();
        let since = self.since();
        let filter = WalletsFilter::platform();
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
                            let currency_slug = wallet.currency_slug.clone();
                            let address = wallet.address.clone();
                            blockchain_gateway
                                .get_exchanger_transactions(wallet.currency_slug.clone(), since)
                                .map_err(ectx!(try convert ErrorSource::Gateway => wallet_id, currency_slug))
                                .map(move |reported| {
                                    let inputs: Vec<BlockchainTransaction> =
                                        reported.into_iter().filter(|trx| trx.is_input_for(&address)).collect();
                                    if inputs.is_empty() {
                                        None
                                    } else {
                                        Some((wallet_id, inputs))
                                    }
                                })
                        },
                        move |(wallet_id, reported): (WalletId, Vec<BlockchainTransaction>)| {
                            complete_placeholders(&*transactions_repo, wallet_id, reported)
                        },
                    )
                }),
        )
    }
}

fn complete_placeholders(transactions_repo: &TransactionsRepo, wallet_id: WalletId, reported: Vec<BlockchainTransaction>) -> Result<usize, Error> {
    let mut completed = 0;
    for trx in reported {
        let hash = trx.hash.clone();
        if transactions_repo.exists_by_hash(hash.clone()).map_err(ectx!(try convert => hash))? {
            trace!("Transaction {} is already known", trx.hash);
            continue;
        }
        let key = PlaceholderKey {
            wallet_id,
            address_from: trx.from.clone(),
            currency_slug: trx.currency_slug.clone(),
        };
        let placeholder = transactions_repo
            .find_placeholder(key.clone())
            .map_err(ectx!(try convert => key))?;
        let placeholder_id = match placeholder {
            Some(placeholder) => placeholder.id,
            None => {
                info!(
                    "No placeholder for transaction {} from {} to platform wallet {}, dropping it",
                    trx.hash, trx.from, wallet_id
                );
                continue;
            }
        };
        let hash = trx.hash.clone();
        let value = trx.value;
        let updated = transactions_repo
            .complete_placeholder(placeholder_id, hash.clone(), value)
            .map_err(ectx!(try convert => placeholder_id, hash, value))?;
        match updated {
            Some(_) => completed += 1,
            None => warn!(
                "Placeholder {} was completed by someone else, dropping transaction {}",
                placeholder_id, trx.hash
            ),
        }
    }
    if completed > 0 {
        info!("Completed {} placeholders of platform wallet {}", completed, wallet_id);
    }
    Ok(completed)
}
