use diesel;

use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::wallets::dsl::*;

pub trait WalletsRepo: Send + Sync + 'static {
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet>;
    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>>;
    fn get_by_external_id(&self, external_id: ExternalId) -> RepoResult<Option<Wallet>>;
    fn get_by_address(&self, address: BlockchainAddress, currency_slug: CurrencySlug) -> RepoResult<Option<Wallet>>;
    /// Wallets matching the filter in id order
    fn list(&self, filter: WalletsFilter) -> RepoResult<Vec<Wallet>>;
    fn set_on_monitoring(&self, external_id: ExternalId, on_monitoring: bool) -> RepoResult<Option<Wallet>>;
}

#[derive(Clone, Default)]
pub struct WalletsRepoImpl;

impl WalletsRepo for WalletsRepoImpl {
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet> {
        with_tls_connection(|conn| {
            diesel::insert_into(wallets)
                .values(payload.clone())
                .get_result::<Wallet>(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => payload)
                })
        })
    }

    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(id.eq(wallet_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => wallet_id)
                })
        })
    }

    fn get_by_external_id(&self, external_id_arg: ExternalId) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(external_id.eq(external_id_arg))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => external_id_arg)
                })
        })
    }

    fn get_by_address(&self, address_arg: BlockchainAddress, currency_slug_arg: CurrencySlug) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(address.eq(address_arg.clone()))
                .filter(currency_slug.eq(currency_slug_arg.clone()))
                .order(id)
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => address_arg, currency_slug_arg)
                })
        })
    }

    fn list(&self, filter: WalletsFilter) -> RepoResult<Vec<Wallet>> {
        with_tls_connection(|conn| {
            let mut query = wallets.into_boxed();
            if let Some(is_platform_arg) = filter.is_platform {
                query = query.filter(is_platform.eq(is_platform_arg));
            }
            if let Some(on_monitoring_arg) = filter.on_monitoring {
                query = query.filter(on_monitoring.eq(on_monitoring_arg));
            }
            if let Some(is_active_arg) = filter.is_active {
                query = query.filter(is_active.eq(is_active_arg));
            }
            query.order(id).get_results(conn).map_err(move |e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, error_kind => filter)
            })
        })
    }

    fn set_on_monitoring(&self, external_id_arg: ExternalId, on_monitoring_arg: bool) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            let f = wallets.filter(external_id.eq(external_id_arg));
            diesel::update(f)
                .set((on_monitoring.eq(on_monitoring_arg), updated_at.eq(diesel::dsl::now)))
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => external_id_arg, on_monitoring_arg)
                })
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use config::Config;
    use diesel::pg::PgConnection;
    use diesel::r2d2::ConnectionManager;
    use futures_cpupool::CpuPool;
    use r2d2;
    use repos::DbExecutorImpl;
    use repos::DbExecutor;
    use tokio_core::reactor::Core;

    pub fn create_executor() -> DbExecutorImpl {
        let config = Config::new().unwrap();
        let manager = ConnectionManager::<PgConnection>::new(config.database.url);
        let db_pool = r2d2::Pool::builder().build(manager).unwrap();
        let cpu_pool = CpuPool::new(1);
        DbExecutorImpl::new(db_pool, cpu_pool)
    }

    #[test]
    #[ignore]
    fn test_wallets_create_and_toggle_monitoring() {
        let mut core = Core::new().unwrap();
        let db_executor = create_executor();
        let wallets_repo = WalletsRepoImpl::default();
        let _ = core.run(db_executor.execute_test_transaction(move || {
            let payload = NewWallet {
                external_id: ExternalId::new(100_500),
                ..Default::default()
            };
            let wallet = wallets_repo.create(payload)?;
            assert!(wallet.on_monitoring);
            let found = wallets_repo.get_by_address(wallet.address.clone(), wallet.currency_slug.clone())?;
            assert_eq!(found.map(|w| w.id), Some(wallet.id));
            let stopped = wallets_repo.set_on_monitoring(wallet.external_id, false)?.unwrap();
            assert!(!stopped.on_monitoring);
            let monitored = wallets_repo.list(WalletsFilter::monitored())?;
            assert!(monitored.iter().all(|w| w.id != wallet.id));
            Ok(()) as Result<(), Error>
        }));
    }
}
