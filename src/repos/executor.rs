use std::cell::RefCell;

use diesel::pg::PgConnection;
use diesel::result::Error as DieselError;
use futures_cpupool::CpuPool;

use super::error::*;
use prelude::*;

thread_local! {
    pub static DB_CONN: RefCell<Option<PgPooledConnection>> = RefCell::new(None)
}

/// Runs repo calls on a dedicated thread pool.
///
/// A checked out connection is kept in thread local storage, so repos called inside
/// the closure pick it up with `with_tls_connection`. A connection that turns out
/// to be broken after a failed closure is dropped and replaced on the next call.
pub trait DbExecutor: Clone + Send + Sync + 'static {
    /// Execute queries, every statement commits on its own
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail;

    /// Execute mutations and queries inside one transaction, an error rolls all of them back
    fn execute_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail;

    /// Execute mutations that will be rolled back, for tests against a real database
    #[cfg(test)]
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail;
}

#[derive(Clone)]
pub struct DbExecutorImpl {
    db_pool: PgPool,
    db_thread_pool: CpuPool,
}

impl DbExecutorImpl {
    pub fn new(db_pool: PgPool, db_thread_pool: CpuPool) -> Self {
        Self { db_pool, db_thread_pool }
    }
}

impl DbExecutor for DbExecutorImpl {
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        let db_pool = self.db_pool.clone();
        Box::new(self.db_thread_pool.spawn_fn(move || {
            DB_CONN.with(move |tls_conn_cell| -> Result<T, E> {
                put_connection_into_tls(&db_pool, tls_conn_cell)?;
                f().map_err(move |e| {
                    remove_connection_from_tls_if_broken(tls_conn_cell);
                    e
                })
            })
        }))
    }

    fn execute_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        let db_pool = self.db_pool.clone();
        Box::new(self.db_thread_pool.spawn_fn(move || {
            DB_CONN.with(move |tls_conn_cell| -> Result<T, E> {
                put_connection_into_tls(&db_pool, tls_conn_cell)?;
                // the closure error is kept aside, diesel only sees a rollback request
                let mut err: Option<E> = None;
                let res = {
                    let err_ref = &mut err;
                    with_tls_connection(move |conn| {
                        conn.transaction(|| {
                            f().map_err(|e| {
                                *err_ref = Some(e);
                                DieselError::RollbackTransaction
                            })
                        }).map_err(ectx!(ErrorSource::Transaction, ErrorKind::Internal))
                    })
                };
                res.map_err(|e| {
                    let e: E = err.unwrap_or_else(|| e.into());
                    remove_connection_from_tls_if_broken(tls_conn_cell);
                    e
                })
            })
        }))
    }

    #[cfg(test)]
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Fail,
    {
        self.execute_transaction(|| {
            let _ = f()?;
            let e: Error = ectx!(err ErrorContext::TestRollback, ErrorKind::Internal);
            Err(e.into())
        })
    }
}

/// Gives repos the connection checked out by `DbExecutor`
pub fn with_tls_connection<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce(&PgConnection) -> Result<T, Error>,
{
    DB_CONN.with(|tls_conn_cell| -> Result<T, Error> {
        let maybe_conn = tls_conn_cell.borrow();
        let conn_ref = maybe_conn
            .as_ref()
            .ok_or(ectx!(try err ErrorContext::Connection, ErrorKind::Internal))?;
        f(conn_ref)
    })
}

fn put_connection_into_tls(db_pool: &PgPool, tls_conn_cell: &RefCell<Option<PgPooledConnection>>) -> Result<(), Error> {
    let mut maybe_conn = tls_conn_cell.borrow_mut();
    if maybe_conn.is_none() {
        match db_pool.get() {
            Ok(conn) => *maybe_conn = Some(conn),
            Err(e) => {
                let e: Error = ectx!(err e, ErrorSource::R2D2, ErrorKind::Internal);
                return Err(e);
            }
        }
    }
    Ok(())
}

// `SELECT 1` health check, same as diesel's r2d2 manager does
fn remove_connection_from_tls_if_broken(tls_conn_cell: &RefCell<Option<PgPooledConnection>>) {
    let mut maybe_conn = tls_conn_cell.borrow_mut();
    let is_broken = match *maybe_conn {
        Some(ref conn) => conn.execute("SELECT 1").is_err(),
        None => false,
    };
    if is_broken {
        *maybe_conn = None;
    }
}
