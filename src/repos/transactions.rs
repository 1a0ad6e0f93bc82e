use diesel;
use diesel::dsl::{exists, now};

use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::transactions::dsl::*;

pub trait TransactionsRepo: Send + Sync + 'static {
    fn create(&self, payload: NewTransaction) -> RepoResult<Transaction>;
    /// Insert unless a transaction with the same hash exists. Never fails on duplicates,
    /// so it's safe inside a transaction.
    fn create_if_new(&self, payload: NewTransaction) -> RepoResult<Option<Transaction>>;
    fn get(&self, transaction_id: TransactionId) -> RepoResult<Option<Transaction>>;
    fn get_by_hash(&self, hash: TransactionHash) -> RepoResult<Option<Transaction>>;
    fn exists_by_hash(&self, hash: TransactionHash) -> RepoResult<bool>;
    /// Oldest placeholder of a platform wallet expecting a transfer from `address_from`
    fn find_placeholder(&self, key: PlaceholderKey) -> RepoResult<Option<Transaction>>;
    /// Sets hash and value of a placeholder, None if it's not a placeholder anymore
    fn complete_placeholder(
        &self,
        transaction_id: TransactionId,
        hash: TransactionHash,
        value: Amount,
    ) -> RepoResult<Option<Transaction>>;
    /// Compare and set of status, None if the transaction is not in `expected` status.
    /// Transition to `Confirmed` also sets `confirmed_at`.
    fn update_status(
        &self,
        transaction_id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> RepoResult<Option<Transaction>>;
    /// `New` transactions with a known hash, in id order
    fn list_to_send(&self) -> RepoResult<Vec<Transaction>>;
    /// `Confirmed` transactions with known hash and uuid owned by one of `wallet_ids`, in id order
    fn list_to_report(&self, wallet_ids: Vec<WalletId>) -> RepoResult<Vec<Transaction>>;
    fn list_for_wallet(&self, wallet_id: WalletId) -> RepoResult<Vec<Transaction>>;
}

#[derive(Clone, Default)]
pub struct TransactionsRepoImpl;

impl TransactionsRepo for TransactionsRepoImpl {
    fn create(&self, payload: NewTransaction) -> RepoResult<Transaction> {
        with_tls_connection(|conn| {
            diesel::insert_into(transactions)
                .values(payload.clone())
                .get_result::<Transaction>(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => payload)
                })
        })
    }

    fn create_if_new(&self, payload: NewTransaction) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            diesel::insert_into(transactions)
                .values(payload.clone())
                .on_conflict(hash)
                .do_nothing()
                .get_result::<Transaction>(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => payload)
                })
        })
    }

    fn get(&self, transaction_id: TransactionId) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(id.eq(transaction_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => transaction_id)
                })
        })
    }

    fn get_by_hash(&self, hash_arg: TransactionHash) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(hash.eq(hash_arg.clone()))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => hash_arg)
                })
        })
    }

    fn exists_by_hash(&self, hash_arg: TransactionHash) -> RepoResult<bool> {
        with_tls_connection(|conn| {
            diesel::select(exists(transactions.filter(hash.eq(hash_arg.clone()))))
                .get_result(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => hash_arg)
                })
        })
    }

    fn find_placeholder(&self, key: PlaceholderKey) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(wallet_id.eq(key.wallet_id))
                .filter(status.eq(TransactionStatus::New))
                .filter(address_from.eq(key.address_from.clone()))
                .filter(currency_slug.eq(key.currency_slug.clone()))
                .filter(hash.is_null())
                .order(id)
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => key)
                })
        })
    }

    fn complete_placeholder(
        &self,
        transaction_id: TransactionId,
        hash_arg: TransactionHash,
        value_arg: Amount,
    ) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            let f = transactions.filter(id.eq(transaction_id)).filter(hash.is_null());
            diesel::update(f)
                .set((hash.eq(hash_arg.clone()), value.eq(value_arg), updated_at.eq(now)))
                .get_result(conn)
                .optional()
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => transaction_id, hash_arg, value_arg)
                })
        })
    }

    fn update_status(
        &self,
        transaction_id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> RepoResult<Option<Transaction>> {
        with_tls_connection(|conn| {
            let f = transactions.filter(id.eq(transaction_id)).filter(status.eq(expected));
            let res = if next == TransactionStatus::Confirmed {
                diesel::update(f)
                    .set((status.eq(next), confirmed_at.eq(now.nullable()), updated_at.eq(now)))
                    .get_result(conn)
                    .optional()
            } else {
                diesel::update(f)
                    .set((status.eq(next), updated_at.eq(now)))
                    .get_result(conn)
                    .optional()
            };
            res.map_err(move |e| {
                let error_kind = ErrorKind::from(&e);
                ectx!(err e, error_kind => transaction_id, expected, next)
            })
        })
    }

    fn list_to_send(&self) -> RepoResult<Vec<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(hash.is_not_null())
                .filter(status.eq(TransactionStatus::New))
                .order(id)
                .get_results(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind)
                })
        })
    }

    fn list_to_report(&self, wallet_ids: Vec<WalletId>) -> RepoResult<Vec<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(hash.is_not_null())
                .filter(uuid.is_not_null())
                .filter(status.eq(TransactionStatus::Confirmed))
                .filter(wallet_id.eq_any(wallet_ids.clone()))
                .order(id)
                .get_results(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => wallet_ids)
                })
        })
    }

    fn list_for_wallet(&self, wallet_id_arg: WalletId) -> RepoResult<Vec<Transaction>> {
        with_tls_connection(|conn| {
            transactions
                .filter(wallet_id.eq(wallet_id_arg))
                .order(id)
                .get_results(conn)
                .map_err(move |e| {
                    let error_kind = ErrorKind::from(&e);
                    ectx!(err e, error_kind => wallet_id_arg)
                })
        })
    }
}
