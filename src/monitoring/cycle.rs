use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{self, Either};
use futures::stream;

use super::error::*;
use super::CycleReport;
use locks::LockManager;
use prelude::*;
use repos::DbExecutor;
use utils::{log_error, log_warn};

/// Per entity locking shared by ingestion and dispatch monitors.
///
/// Entities are processed one by one in the given order. An entity locked by someone else is
/// skipped. Otherwise its lock is taken, the remote phase runs and what it returns is written
/// in a db transaction of its own, then the lock is released whatever the outcome. So a lock
/// is held for one remote call and one write, not for the whole cycle.
///
/// A write is dropped if the lock expired while the remote phase ran. An entity failing in the
/// remote phase or in the write is logged and counted, the rest of the batch goes on. Lock
/// backend errors fail the whole cycle.
#[derive(Clone)]
pub struct LockedCycle<E: DbExecutor> {
    locks: LockManager,
    db_executor: E,
    lock_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Written(usize),
    Skipped,
    Failed,
}

impl CycleReport {
    fn add(mut self, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Written(written) => self.written += written,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
        self
    }
}

impl<E: DbExecutor> LockedCycle<E> {
    pub fn new(locks: LockManager, db_executor: E, lock_ttl: Duration) -> Self {
        Self {
            locks,
            db_executor,
            lock_ttl,
        }
    }

    pub fn db_executor(&self) -> &E {
        &self.db_executor
    }

    /// `key` names the lock of an entity, `remote` does the work outside of the db and
    /// returns what to write (`None` if nothing), `commit` writes it and returns
    /// the number of written rows.
    pub fn run<T, W, K, R, F, C>(&self, entities: Vec<T>, key: K, remote: R, commit: C) -> Box<Future<Item = CycleReport, Error = Error> + Send>
    where
        T: Debug + Send + 'static,
        W: Send + 'static,
        K: Fn(&T) -> String + Send + 'static,
        R: Fn(T) -> F + Send + Sync + 'static,
        F: IntoFuture<Item = Option<W>, Error = Error>,
        F::Future: Send + 'static,
        C: Fn(W) -> Result<usize, Error> + Send + Sync + 'static,
    {
        let report = CycleReport {
            entities: entities.len(),
            ..Default::default()
        };
        let cycle = self.clone();
        let remote = Arc::new(remote);
        let commit = Arc::new(commit);
        Box::new(stream::iter_ok::<_, Error>(entities).fold(report, move |report, entity| {
            let key = key(&entity);
            cycle
                .process(key, entity, remote.clone(), commit.clone())
                .map(move |outcome| report.add(outcome))
        }))
    }

    fn process<T, W, R, F, C>(&self, key: String, entity: T, remote: Arc<R>, commit: Arc<C>) -> Box<Future<Item = Outcome, Error = Error> + Send>
    where
        T: Debug + Send + 'static,
        W: Send + 'static,
        R: Fn(T) -> F + Send + Sync + 'static,
        F: IntoFuture<Item = Option<W>, Error = Error>,
        F::Future: Send + 'static,
        C: Fn(W) -> Result<usize, Error> + Send + Sync + 'static,
    {
        let locks = self.locks.clone();
        let db_executor = self.db_executor.clone();
        let lock_ttl = self.lock_ttl;
        let key_clone = key.clone();
        Box::new(
            self.locks
                .is_locked(key.clone())
                .and_then({
                    let locks = locks.clone();
                    let key = key.clone();
                    move |is_locked| {
                        if is_locked {
                            Either::A(future::ok(None))
                        } else {
                            Either::B(locks.acquire(key, lock_ttl))
                        }
                    }
                }).map_err(ectx!(try convert ErrorSource::Lock => key_clone))
                .and_then(move |maybe_lock| match maybe_lock {
                    None => {
                        info!("{} is locked, skipping it this cycle", key);
                        Either::A(future::ok(Outcome::Skipped))
                    }
                    Some(lock) => {
                        let deadline = Instant::now() + lock.validity;
                        let work = remote(entity)
                            .into_future()
                            .and_then(move |maybe_write| match maybe_write {
                                None => Either::A(future::ok(Outcome::Written(0))),
                                Some(_) if Instant::now() >= deadline => {
                                    warn!("Lock of {} expired before the write, dropping it", key);
                                    Either::A(future::ok(Outcome::Skipped))
                                }
                                Some(write) => Either::B(
                                    db_executor
                                        .execute_transaction(move || commit(write))
                                        .map(Outcome::Written),
                                ),
                            }).or_else(|e| -> Result<Outcome, Error> {
                                log_error(&e);
                                Ok(Outcome::Failed)
                            });
                        Either::B(work.then(move |outcome| {
                            locks.release(lock).then(move |released| {
                                if let Err(e) = released {
                                    log_warn(&e);
                                }
                                outcome
                            })
                        }))
                    }
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;
    use locks::mocks::lock_manager;
    use models::*;
    use repos::{DbExecutorMock, TransactionsRepo, TransactionsRepoMock, WalletsRepoMock};
    use tokio_core::reactor::Core;

    fn collect_into(committed: Arc<Mutex<Vec<i32>>>) -> impl Fn(i32) -> Result<usize, Error> + Send + Sync + 'static {
        move |write| {
            committed.lock().unwrap().push(write);
            Ok(1)
        }
    }

    #[test]
    fn test_skips_locked_entities_and_releases_locks() {
        let mut core = Core::new().unwrap();
        let locks = lock_manager();
        let cycle = LockedCycle::new(locks.clone(), DbExecutorMock::default(), Duration::from_secs(10));
        let foreign = core.run(locks.acquire("item:2".to_string(), Duration::from_secs(10))).unwrap();
        assert!(foreign.is_some());

        let committed = Arc::new(Mutex::new(Vec::new()));
        let report = core
            .run(cycle.run(
                vec![1, 2, 3],
                |n| format!("item:{}", n),
                |n| -> Result<Option<i32>, Error> { Ok(Some(n * 10)) },
                collect_into(committed.clone()),
            )).unwrap();
        assert_eq!(
            report,
            CycleReport {
                entities: 3,
                written: 2,
                skipped: 1,
                failed: 0,
            }
        );
        assert_eq!(*committed.lock().unwrap(), vec![10, 30]);
        assert!(!core.run(locks.is_locked("item:1".to_string())).unwrap());
        assert!(!core.run(locks.is_locked("item:3".to_string())).unwrap());
        assert!(core.run(locks.is_locked("item:2".to_string())).unwrap());
    }

    #[test]
    fn test_entity_failure_does_not_abort_batch() {
        let mut core = Core::new().unwrap();
        let locks = lock_manager();
        let cycle = LockedCycle::new(locks.clone(), DbExecutorMock::default(), Duration::from_secs(10));
        let report = core
            .run(cycle.run(
                vec![1, 2],
                |n| format!("item:{}", n),
                |n| -> Result<Option<i32>, Error> {
                    if n == 1 {
                        Err(ErrorKind::Internal.into())
                    } else {
                        Ok(Some(n))
                    }
                },
                |_| Ok(1),
            )).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 1);
        assert!(!core.run(locks.is_locked("item:1".to_string())).unwrap());
    }

    #[test]
    fn test_lock_is_held_only_while_its_entity_is_processed() {
        let mut core = Core::new().unwrap();
        let locks = lock_manager();
        // the cycle outlasts the ttl, a single entity doesn't
        let cycle = LockedCycle::new(locks.clone(), DbExecutorMock::default(), Duration::from_millis(300));
        let locks_clone = locks.clone();
        let committed = Arc::new(Mutex::new(Vec::new()));
        let report = core
            .run(cycle.run(
                vec![1, 2, 3, 4],
                |n| format!("item:{}", n),
                move |n| -> Result<Option<i32>, Error> {
                    if n > 1 {
                        // the previous entity is done and unlocked
                        let previous = format!("item:{}", n - 1);
                        assert!(!locks_clone.is_locked(previous).wait().unwrap());
                    }
                    thread::sleep(Duration::from_millis(100));
                    Ok(Some(n))
                },
                collect_into(committed.clone()),
            )).unwrap();
        assert_eq!(
            report,
            CycleReport {
                entities: 4,
                written: 4,
                skipped: 0,
                failed: 0,
            }
        );
        assert_eq!(*committed.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_is_dropped_when_lock_expires_during_remote_phase() {
        let mut core = Core::new().unwrap();
        let locks = lock_manager();
        let cycle = LockedCycle::new(locks.clone(), DbExecutorMock::default(), Duration::from_millis(50));
        let committed = Arc::new(Mutex::new(Vec::new()));
        let report = core
            .run(cycle.run(
                vec![1, 2],
                |n| format!("item:{}", n),
                |n| -> Result<Option<i32>, Error> {
                    if n == 1 {
                        thread::sleep(Duration::from_millis(80));
                    }
                    Ok(Some(n))
                },
                collect_into(committed.clone()),
            )).unwrap();
        assert_eq!(
            report,
            CycleReport {
                entities: 2,
                written: 1,
                skipped: 1,
                failed: 0,
            }
        );
        assert_eq!(*committed.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_failed_write_is_rolled_back_and_does_not_abort_batch() {
        let mut core = Core::new().unwrap();
        let transactions_repo = TransactionsRepoMock::default();
        let db_executor = DbExecutorMock::with_repos(WalletsRepoMock::default(), transactions_repo.clone());
        let cycle = LockedCycle::new(lock_manager(), db_executor, Duration::from_secs(10));
        let repo = transactions_repo.clone();
        let report = core
            .run(cycle.run(
                vec![vec!["h1", "h2", "h1"], vec!["h3"]],
                |hashes: &Vec<&'static str>| format!("item:{}", hashes[0]),
                |hashes| -> Result<Option<Vec<&'static str>>, Error> { Ok(Some(hashes)) },
                move |hashes: Vec<&'static str>| {
                    let mut written = 0;
                    for hash in hashes {
                        repo.create(NewTransaction {
                            hash: Some(TransactionHash::new(hash.to_string())),
                            ..Default::default()
                        })?;
                        written += 1;
                    }
                    Ok(written)
                },
            )).unwrap();
        assert_eq!(
            report,
            CycleReport {
                entities: 2,
                written: 1,
                skipped: 0,
                failed: 1,
            }
        );
        // h1 and h2 of the failed entity are gone with its transaction
        let hashes: Vec<_> = transactions_repo.all().into_iter().filter_map(|trx| trx.hash).collect();
        assert_eq!(hashes, vec![TransactionHash::new("h3".to_string())]);
    }

    #[test]
    fn test_lock_backend_outage_fails_cycle() {
        use locks::mocks::{lock_manager_with_nodes, InMemoryLockBackend};

        let mut core = Core::new().unwrap();
        let node = InMemoryLockBackend::default();
        node.set_down(true);
        let cycle = LockedCycle::new(lock_manager_with_nodes(&[node]), DbExecutorMock::default(), Duration::from_secs(10));
        let remote_calls = Arc::new(Mutex::new(0));
        let remote_calls_clone = remote_calls.clone();
        let err = core
            .run(cycle.run(
                vec![1],
                |n| format!("item:{}", n),
                move |n| -> Result<Option<i32>, Error> {
                    *remote_calls_clone.lock().unwrap() += 1;
                    Ok(Some(n))
                },
                |_| Ok(1),
            )).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockUnavailable);
        assert_eq!(*remote_calls.lock().unwrap(), 0);
    }
}
