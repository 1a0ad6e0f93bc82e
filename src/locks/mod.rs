//! Expiring named locks shared by all replicas of the service.
//!
//! Locks are taken with the redlock algorithm over a set of independent nodes:
//! a lock is held if it was set on a quorum (`n / 2 + 1`) of nodes and there is still
//! time left of its ttl after subtracting acquisition time and clock drift.
//! A held key is reported as `None`, not as an error. An error means the quorum is
//! unreachable and the caller must not proceed unlocked.

mod error;
mod postgres;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future;
use futures_cpupool::CpuPool;
use uuid::Uuid;

pub use self::error::*;
pub use self::postgres::PgLockBackend;
use models::{TransactionId, WalletId};
use prelude::*;

/// A single lock node
pub trait LockBackend: Send + Sync + 'static {
    /// Sets `key` to `token` for `ttl` unless the key is held and not expired yet.
    /// Returns `true` if the key was set.
    fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, Error>;
    /// Removes `key` if it is still held with `token`, otherwise does nothing
    fn release(&self, key: &str, token: &str) -> Result<(), Error>;
    fn is_locked(&self, key: &str) -> Result<bool, Error>;
}

pub fn wallet_key(wallet_id: WalletId) -> String {
    format!("wallet:{}", wallet_id)
}

pub fn transaction_key(transaction_id: TransactionId) -> String {
    format!("transaction:{}", transaction_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub key: String,
    token: String,
    /// Time left to do the work under the lock, counted from acquisition
    pub validity: Duration,
}

#[derive(Clone)]
pub struct LockManager {
    nodes: Arc<Vec<Arc<LockBackend>>>,
    thread_pool: CpuPool,
}

impl LockManager {
    pub fn new(nodes: Vec<Arc<LockBackend>>, thread_pool: CpuPool) -> Self {
        assert!(!nodes.is_empty(), "Lock manager needs at least one lock node");
        Self {
            nodes: Arc::new(nodes),
            thread_pool,
        }
    }

    pub fn quorum(&self) -> usize {
        self.nodes.len() / 2 + 1
    }

    /// Takes the lock without waiting, `None` if it is held by someone else
    pub fn acquire(&self, key: String, ttl: Duration) -> Box<Future<Item = Option<Lock>, Error = Error> + Send> {
        let nodes = self.nodes.clone();
        let quorum = self.quorum();
        Box::new(self.thread_pool.spawn_fn(move || acquire_on_nodes(&nodes, quorum, key, ttl)))
    }

    /// Releasing an expired or already released lock does nothing
    pub fn release(&self, lock: Lock) -> Box<Future<Item = (), Error = Error> + Send> {
        let nodes = self.nodes.clone();
        Box::new(self.thread_pool.spawn_fn(move || -> Result<(), Error> {
            release_on_nodes(&nodes, &lock.key, &lock.token);
            Ok(())
        }))
    }

    pub fn release_all(&self, locks: Vec<Lock>) -> Box<Future<Item = (), Error = Error> + Send> {
        let fs: Vec<_> = locks.into_iter().map(|lock| self.release(lock)).collect();
        Box::new(future::join_all(fs).map(|_| ()))
    }

    /// A key is locked if any reachable node holds it
    pub fn is_locked(&self, key: String) -> Box<Future<Item = bool, Error = Error> + Send> {
        let nodes = self.nodes.clone();
        let quorum = self.quorum();
        Box::new(self.thread_pool.spawn_fn(move || -> Result<bool, Error> {
            let mut reachable = 0;
            for node in nodes.iter() {
                match node.is_locked(&key) {
                    Ok(true) => return Ok(true),
                    Ok(false) => reachable += 1,
                    Err(e) => warn!("Lock node failed to check key {}: {}", key, e),
                }
            }
            if reachable < quorum {
                return Err(ectx!(err ErrorContext::Quorum, ErrorKind::Unavailable => key, reachable, quorum));
            }
            Ok(false)
        }))
    }
}

fn acquire_on_nodes(nodes: &[Arc<LockBackend>], quorum: usize, key: String, ttl: Duration) -> Result<Option<Lock>, Error> {
    let token = Uuid::new_v4().to_string();
    let started = Instant::now();
    let mut acquired = 0;
    let mut failed = 0;
    for node in nodes {
        match node.try_acquire(&key, &token, ttl) {
            Ok(true) => acquired += 1,
            Ok(false) => (),
            Err(e) => {
                warn!("Lock node failed to acquire key {}: {}", key, e);
                failed += 1;
            }
        }
    }
    let elapsed = started.elapsed();
    let drift = ttl / 100 + Duration::from_millis(2);
    let spent = elapsed + drift;
    if acquired >= quorum && ttl > spent {
        return Ok(Some(Lock {
            key,
            token,
            validity: ttl - spent,
        }));
    }
    if acquired > 0 {
        release_on_nodes(nodes, &key, &token);
    }
    if nodes.len() - failed < quorum {
        return Err(ectx!(err ErrorContext::Quorum, ErrorKind::Unavailable => key, failed, quorum));
    }
    Ok(None)
}

fn release_on_nodes(nodes: &[Arc<LockBackend>], key: &str, token: &str) {
    for node in nodes {
        if let Err(e) = node.release(key, token) {
            // the key expires on that node by itself
            warn!("Lock node failed to release key {}: {}", key, e);
        }
    }
}
