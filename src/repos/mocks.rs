use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::error::*;
use super::executor::DbExecutor;
use super::transactions::*;
use super::types::RepoResult;
use super::wallets::*;
use models::*;
use prelude::*;

#[derive(Clone, Default)]
pub struct WalletsRepoMock {
    data: Arc<Mutex<Vec<Wallet>>>,
}

impl WalletsRepoMock {
    pub fn all(&self) -> Vec<Wallet> {
        self.data.lock().unwrap().clone()
    }

    fn restore(&self, data: Vec<Wallet>) {
        *self.data.lock().unwrap() = data;
    }
}

impl WalletsRepo for WalletsRepoMock {
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet> {
        let mut data = self.data.lock().unwrap();
        let res = Wallet {
            id: WalletId::new(data.len() as i32 + 1),
            external_id: payload.external_id,
            currency_slug: payload.currency_slug,
            address: payload.address,
            is_platform: payload.is_platform,
            on_monitoring: payload.on_monitoring,
            is_active: payload.is_active,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        };
        data.push(res.clone());
        Ok(res)
    }
    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.id == wallet_id).nth(0).cloned())
    }
    fn get_by_external_id(&self, external_id: ExternalId) -> RepoResult<Option<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.external_id == external_id).nth(0).cloned())
    }
    fn get_by_address(&self, address: BlockchainAddress, currency_slug: CurrencySlug) -> RepoResult<Option<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| x.address == address && x.currency_slug == currency_slug)
            .nth(0)
            .cloned())
    }
    fn list(&self, filter: WalletsFilter) -> RepoResult<Vec<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| filter.matches(x)).cloned().collect())
    }
    fn set_on_monitoring(&self, external_id: ExternalId, on_monitoring: bool) -> RepoResult<Option<Wallet>> {
        let mut data = self.data.lock().unwrap();
        Ok(data
            .iter_mut()
            .filter(|x| x.external_id == external_id)
            .map(|x| {
                x.on_monitoring = on_monitoring;
                x.clone()
            }).nth(0))
    }
}

#[derive(Clone, Default)]
pub struct TransactionsRepoMock {
    data: Arc<Mutex<Vec<Transaction>>>,
}

impl TransactionsRepoMock {
    pub fn all(&self) -> Vec<Transaction> {
        self.data.lock().unwrap().clone()
    }

    fn restore(&self, data: Vec<Transaction>) {
        *self.data.lock().unwrap() = data;
    }
}

impl TransactionsRepo for TransactionsRepoMock {
    fn create(&self, payload: NewTransaction) -> RepoResult<Transaction> {
        let mut data = self.data.lock().unwrap();
        if payload.hash.is_some() && data.iter().any(|x| x.hash == payload.hash) {
            return Err(ectx!(err ErrorKind::Internal, ErrorKind::Internal => payload));
        }
        let res = Transaction {
            id: TransactionId::new(data.len() as i32 + 1),
            wallet_id: payload.wallet_id,
            hash: payload.hash,
            uuid: payload.uuid,
            address_from: payload.address_from,
            address_to: payload.address_to,
            currency_slug: payload.currency_slug,
            value: payload.value,
            status: payload.status,
            is_fee_trx: payload.is_fee_trx,
            confirmed_at: None,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        };
        data.push(res.clone());
        Ok(res)
    }
    fn create_if_new(&self, payload: NewTransaction) -> RepoResult<Option<Transaction>> {
        {
            let data = self.data.lock().unwrap();
            if payload.hash.is_some() && data.iter().any(|x| x.hash == payload.hash) {
                return Ok(None);
            }
        }
        self.create(payload).map(Some)
    }
    fn get(&self, transaction_id: TransactionId) -> RepoResult<Option<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.id == transaction_id).nth(0).cloned())
    }
    fn get_by_hash(&self, hash: TransactionHash) -> RepoResult<Option<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.hash.as_ref() == Some(&hash)).nth(0).cloned())
    }
    fn exists_by_hash(&self, hash: TransactionHash) -> RepoResult<bool> {
        self.get_by_hash(hash).map(|x| x.is_some())
    }
    fn find_placeholder(&self, key: PlaceholderKey) -> RepoResult<Option<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| {
                x.wallet_id == Some(key.wallet_id)
                    && x.status == TransactionStatus::New
                    && x.address_from == key.address_from
                    && x.currency_slug == key.currency_slug
                    && x.hash.is_none()
            }).nth(0)
            .cloned())
    }
    fn complete_placeholder(&self, transaction_id: TransactionId, hash: TransactionHash, value: Amount) -> RepoResult<Option<Transaction>> {
        let mut data = self.data.lock().unwrap();
        Ok(data
            .iter_mut()
            .filter(|x| x.id == transaction_id && x.hash.is_none())
            .map(|x| {
                x.hash = Some(hash.clone());
                x.value = value;
                x.clone()
            }).nth(0))
    }
    fn update_status(
        &self,
        transaction_id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> RepoResult<Option<Transaction>> {
        let mut data = self.data.lock().unwrap();
        Ok(data
            .iter_mut()
            .filter(|x| x.id == transaction_id && x.status == expected)
            .map(|x| {
                x.status = next;
                if next == TransactionStatus::Confirmed {
                    x.confirmed_at = Some(SystemTime::now());
                }
                x.clone()
            }).nth(0))
    }
    fn list_to_send(&self) -> RepoResult<Vec<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| x.hash.is_some() && x.status == TransactionStatus::New)
            .cloned()
            .collect())
    }
    fn list_to_report(&self, wallet_ids: Vec<WalletId>) -> RepoResult<Vec<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| {
                x.hash.is_some()
                    && x.uuid.is_some()
                    && x.status == TransactionStatus::Confirmed
                    && x.wallet_id.map(|id| wallet_ids.contains(&id)).unwrap_or(false)
            }).cloned()
            .collect())
    }
    fn list_for_wallet(&self, wallet_id: WalletId) -> RepoResult<Vec<Transaction>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.wallet_id == Some(wallet_id)).cloned().collect())
    }
}

/// Runs closures inline. With repos attached, a failed transaction puts their data back
/// the way it was when the transaction started, and a test transaction always does.
#[derive(Clone, Default)]
pub struct DbExecutorMock {
    repos: Option<(WalletsRepoMock, TransactionsRepoMock)>,
}

impl DbExecutorMock {
    pub fn with_repos(wallets_repo: WalletsRepoMock, transactions_repo: TransactionsRepoMock) -> Self {
        Self {
            repos: Some((wallets_repo, transactions_repo)),
        }
    }

    fn transaction<F, T, E>(&self, f: F, rollback_always: bool) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let saved = self.repos.as_ref().map(|(wallets, transactions)| (wallets.all(), transactions.all()));
        let res = f();
        if res.is_err() || rollback_always {
            if let (Some((wallets, transactions)), Some((saved_wallets, saved_transactions))) = (self.repos.as_ref(), saved) {
                wallets.restore(saved_wallets);
                transactions.restore(saved_transactions);
            }
        }
        res
    }
}

impl DbExecutor for DbExecutorMock {
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        Box::new(f().into_future())
    }
    fn execute_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        Box::new(self.transaction(f, false).into_future())
    }
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        Box::new(self.transaction(f, true).into_future())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_core::reactor::Core;

    #[test]
    fn test_failed_transaction_restores_repos() {
        let mut core = Core::new().unwrap();
        let wallets_repo = WalletsRepoMock::default();
        let transactions_repo = TransactionsRepoMock::default();
        let db_executor = DbExecutorMock::with_repos(wallets_repo.clone(), transactions_repo.clone());

        let wallets_repo_clone = wallets_repo.clone();
        let transactions_repo_clone = transactions_repo.clone();
        let res = core.run(db_executor.execute_transaction(move || -> Result<(), Error> {
            wallets_repo_clone.create(NewWallet::default())?;
            transactions_repo_clone.create(NewTransaction::default())?;
            Err(ErrorKind::Internal.into())
        }));
        assert!(res.is_err());
        assert!(wallets_repo.all().is_empty());
        assert!(transactions_repo.all().is_empty());

        let transactions_repo_clone = transactions_repo.clone();
        core.run(db_executor.execute_transaction(move || transactions_repo_clone.create(NewTransaction::default())))
            .unwrap();
        assert_eq!(transactions_repo.all().len(), 1);
    }
}
