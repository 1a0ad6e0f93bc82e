use std::sync::Arc;

use futures::future::{self, Either};
use futures::IntoFuture;
use validator::Validate;

use super::error::*;
use super::ServiceFuture;
use client::{BlockchainGatewayClient, Notifier};
use config::PlatformWallet;
use models::*;
use prelude::*;
use repos::{DbExecutor, TransactionsRepo, WalletsRepo};
use utils::log_error;

pub trait WalletsService: Send + Sync + 'static {
    /// Creates the wallet or turns monitoring back on for a known external id
    fn start_monitoring(&self, input: NewWallet) -> ServiceFuture<Wallet>;
    fn stop_monitoring(&self, external_id: ExternalId) -> ServiceFuture<Option<Wallet>>;
    /// Sends an alarm if the balance of `currency_slug` is below `amount`, returns whether it did
    fn check_balance(&self, currency_slug: CurrencySlug, amount: Amount) -> ServiceFuture<bool>;
    /// Applies externally confirmed statuses, returns the number of updated transactions
    fn update_trx(&self, updates: Vec<TransactionStatusUpdate>) -> ServiceFuture<usize>;
    fn get_input_transactions(&self, wallet_id: WalletId) -> ServiceFuture<Vec<Transaction>>;
    /// `None` if a transaction with the same hash is already known
    fn add_input_transaction(&self, input: InputTransaction) -> ServiceFuture<Option<Transaction>>;
    /// Creates a placeholder completed later by the platform wallets monitor
    fn start_monitoring_platform_wallet(&self, input: ExpectedTransfer) -> ServiceFuture<Transaction>;
    /// Creates missing platform wallets, returns the number of created ones
    fn create_platform_wallets(&self, wallets: Vec<PlatformWallet>) -> ServiceFuture<usize>;
}

#[derive(Clone)]
pub struct WalletsServiceImpl<E: DbExecutor> {
    wallets_repo: Arc<WalletsRepo>,
    transactions_repo: Arc<TransactionsRepo>,
    db_executor: E,
    blockchain_gateway: Arc<BlockchainGatewayClient>,
    notifier: Arc<Notifier>,
    alarm_subject: String,
}

impl<E: DbExecutor> WalletsServiceImpl<E> {
    pub fn new(
        wallets_repo: Arc<WalletsRepo>,
        transactions_repo: Arc<TransactionsRepo>,
        db_executor: E,
        blockchain_gateway: Arc<BlockchainGatewayClient>,
        notifier: Arc<Notifier>,
        alarm_subject: String,
    ) -> Self {
        Self {
            wallets_repo,
            transactions_repo,
            db_executor,
            blockchain_gateway,
            notifier,
            alarm_subject,
        }
    }
}

impl<E: DbExecutor> WalletsService for WalletsServiceImpl<E> {
    fn start_monitoring(&self, input: NewWallet) -> ServiceFuture<Wallet> {
        let wallets_repo = self.wallets_repo.clone();
        let db_executor = self.db_executor.clone();
        Box::new(
            input
                .validate()
                .map_err(|e| ectx!(err e.clone(), ErrorKind::InvalidInput(e) => input))
                .into_future()
                .and_then(move |_| {
                    db_executor.execute_transaction(move || {
                        let external_id = input.external_id;
                        let existing = wallets_repo
                            .set_on_monitoring(external_id, true)
                            .map_err(ectx!(try convert => external_id))?;
                        match existing {
                            Some(wallet) => Ok(wallet),
                            None => wallets_repo
                                .create(NewWallet {
                                    on_monitoring: true,
                                    ..input.clone()
                                }).map_err(ectx!(convert => input)),
                        }
                    })
                }),
        )
    }

    fn stop_monitoring(&self, external_id: ExternalId) -> ServiceFuture<Option<Wallet>> {
        let wallets_repo = self.wallets_repo.clone();
        Box::new(self.db_executor.execute(move || {
            wallets_repo
                .set_on_monitoring(external_id, false)
                .map_err(ectx!(convert => external_id))
        }))
    }

    fn check_balance(&self, currency_slug: CurrencySlug, amount: Amount) -> ServiceFuture<bool> {
        let notifier = self.notifier.clone();
        let subject = self.alarm_subject.clone();
        let currency_slug_clone = currency_slug.clone();
        Box::new(
            self.blockchain_gateway
                .get_balance_by_slug(currency_slug.clone())
                .map_err(ectx!(convert ErrorSource::Gateway => currency_slug_clone))
                .and_then(move |balance| {
                    if balance >= amount {
                        return Either::A(future::ok(false));
                    }
                    warn!("Balance of {} is {}, below requested {}", currency_slug, balance, amount);
                    let html = render_alarm(&currency_slug, amount, balance);
                    Either::B(notifier.send(subject, html).then(|res| -> Result<bool, Error> {
                        if let Err(e) = res {
                            log_error(&e);
                        }
                        Ok(true)
                    }))
                }),
        )
    }

    fn update_trx(&self, updates: Vec<TransactionStatusUpdate>) -> ServiceFuture<usize> {
        let transactions_repo = self.transactions_repo.clone();
        Box::new(self.db_executor.execute_transaction(move || -> Result<usize, Error> {
            let mut updated = 0;
            for TransactionStatusUpdate { hash, status } in updates {
                if status.is_transient() {
                    trace!("Transaction {} is still {}, nothing to update", hash, status);
                    continue;
                }
                if status == TransactionStatus::Sent || status == TransactionStatus::Reported {
                    warn!("Status {} of transaction {} is set by dispatch only, skipping", status, hash);
                    continue;
                }
                let hash_clone = hash.clone();
                let transaction = transactions_repo
                    .get_by_hash(hash.clone())
                    .map_err(ectx!(try convert => hash_clone))?;
                let transaction = match transaction {
                    Some(transaction) => transaction,
                    None => {
                        warn!("Got status {} for unknown transaction {}", status, hash);
                        continue;
                    }
                };
                if transaction.status == status {
                    continue;
                }
                if !transaction.status.can_transition_to(status) {
                    warn!(
                        "Transaction {} can't move from {} to {}, skipping",
                        hash, transaction.status, status
                    );
                    continue;
                }
                let transaction_id = transaction.id;
                let current = transaction.status;
                if transactions_repo
                    .update_status(transaction_id, current, status)
                    .map_err(ectx!(try convert => transaction_id, current, status))?
                    .is_some()
                {
                    updated += 1;
                }
            }
            Ok(updated)
        }))
    }

    fn get_input_transactions(&self, wallet_id: WalletId) -> ServiceFuture<Vec<Transaction>> {
        let transactions_repo = self.transactions_repo.clone();
        Box::new(self.db_executor.execute(move || {
            transactions_repo
                .list_for_wallet(wallet_id)
                .map_err(ectx!(convert => wallet_id))
        }))
    }

    fn add_input_transaction(&self, input: InputTransaction) -> ServiceFuture<Option<Transaction>> {
        let wallets_repo = self.wallets_repo.clone();
        let transactions_repo = self.transactions_repo.clone();
        let db_executor = self.db_executor.clone();
        Box::new(
            input
                .validate()
                .map_err(|e| ectx!(err e.clone(), ErrorKind::InvalidInput(e) => input))
                .into_future()
                .and_then(move |_| {
                    db_executor.execute_transaction(move || {
                        let wallet_id = input.wallet_id;
                        wallets_repo
                            .get(wallet_id)
                            .map_err(ectx!(try convert => wallet_id))?
                            .ok_or_else(|| ectx!(try err ErrorContext::WalletNotFound, ErrorKind::NotFound => wallet_id))?;
                        transactions_repo
                            .create_if_new(input.clone().into())
                            .map_err(ectx!(convert => input))
                    })
                }),
        )
    }

    fn start_monitoring_platform_wallet(&self, input: ExpectedTransfer) -> ServiceFuture<Transaction> {
        let wallets_repo = self.wallets_repo.clone();
        let transactions_repo = self.transactions_repo.clone();
        let db_executor = self.db_executor.clone();
        Box::new(
            input
                .validate()
                .map_err(|e| ectx!(err e.clone(), ErrorKind::InvalidInput(e) => input))
                .into_future()
                .and_then(move |_| {
                    db_executor.execute_transaction(move || {
                        let address = input.address.clone();
                        let currency_slug = input.currency_slug.clone();
                        let wallet = wallets_repo
                            .get_by_address(address.clone(), currency_slug.clone())
                            .map_err(ectx!(try convert => address, currency_slug))?
                            .and_then(|wallet| if wallet.is_platform { Some(wallet) } else { None })
                            .ok_or_else(|| ectx!(try err ErrorContext::PlatformWalletNotFound, ErrorKind::NotFound => input))?;
                        let placeholder = NewTransaction {
                            wallet_id: Some(wallet.id),
                            hash: None,
                            uuid: Some(input.uuid),
                            address_from: input.address_from.clone(),
                            address_to: wallet.address,
                            currency_slug: input.currency_slug.clone(),
                            value: input.value,
                            status: TransactionStatus::New,
                            is_fee_trx: false,
                        };
                        transactions_repo
                            .create(placeholder.clone())
                            .map_err(ectx!(convert => placeholder))
                    })
                }),
        )
    }

    fn create_platform_wallets(&self, platform_wallets: Vec<PlatformWallet>) -> ServiceFuture<usize> {
        let wallets_repo = self.wallets_repo.clone();
        Box::new(self.db_executor.execute_transaction(move || -> Result<usize, Error> {
            let mut created = 0;
            for platform_wallet in platform_wallets {
                let external_id = platform_wallet.external_id;
                let existing = wallets_repo
                    .get_by_external_id(external_id)
                    .map_err(ectx!(try convert => external_id))?;
                if existing.is_some() {
                    info!("Platform wallet {:?} already exists", external_id);
                    continue;
                }
                let new_wallet = NewWallet {
                    external_id,
                    currency_slug: platform_wallet.currency,
                    address: platform_wallet.address,
                    is_platform: true,
                    on_monitoring: true,
                    is_active: true,
                };
                new_wallet
                    .validate()
                    .map_err(|e| ectx!(try err e.clone(), ErrorKind::InvalidInput(e) => new_wallet))?;
                wallets_repo
                    .create(new_wallet.clone())
                    .map_err(ectx!(try convert => new_wallet))?;
                created += 1;
            }
            Ok(created)
        }))
    }
}

fn render_alarm(currency_slug: &CurrencySlug, amount: Amount, balance: Amount) -> String {
    format!(
        "<html><body><p>Balance of <b>{}</b> platform wallets is <b>{}</b>, which is less than required <b>{}</b>.</p></body></html>",
        currency_slug, balance, amount
    )
}
