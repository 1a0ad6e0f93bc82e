use std::time::Duration;

use diesel::dsl::{exists, now};
use diesel::pg::PgConnection;
use diesel::sql_query;
use diesel::sql_types::{BigInt, VarChar};

use super::error::*;
use super::LockBackend;
use prelude::*;
use schema::locks::dsl::*;

#[derive(QueryableByName)]
struct AcquiredKey {
    #[sql_type = "VarChar"]
    #[allow(dead_code)]
    key: String,
}

// Takes a free or expired key, a key held by someone else stays untouched
const ACQUIRE_QUERY: &str = "INSERT INTO locks (key, token, expires_at) \
     VALUES ($1, $2, now() + $3 * interval '1 millisecond') \
     ON CONFLICT (key) DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at \
     WHERE locks.expires_at < now() \
     RETURNING key";

/// Lock node on top of a `locks` table of a postgres database
#[derive(Clone)]
pub struct PgLockBackend {
    db_pool: PgPool,
}

impl PgLockBackend {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&PgConnection) -> Result<T, Error>,
    {
        let conn = self.db_pool.get().map_err(ectx!(try ErrorSource::R2D2, ErrorKind::Unavailable))?;
        f(&conn)
    }
}

impl LockBackend for PgLockBackend {
    fn try_acquire(&self, lock_key: &str, lock_token: &str, ttl: Duration) -> Result<bool, Error> {
        let ttl_ms = (ttl.as_secs() * 1000 + u64::from(ttl.subsec_millis())) as i64;
        self.with_connection(|conn| {
            sql_query(ACQUIRE_QUERY)
                .bind::<VarChar, _>(lock_key)
                .bind::<VarChar, _>(lock_token)
                .bind::<BigInt, _>(ttl_ms)
                .get_results::<AcquiredKey>(conn)
                .map(|keys| !keys.is_empty())
                .map_err(ectx!(try ErrorSource::Diesel, ErrorKind::Unavailable => lock_key, ttl_ms))
        })
    }

    fn release(&self, lock_key: &str, lock_token: &str) -> Result<(), Error> {
        self.with_connection(|conn| {
            diesel::delete(locks.filter(key.eq(lock_key)).filter(token.eq(lock_token)))
                .execute(conn)
                .map(|_| ())
                .map_err(ectx!(try ErrorSource::Diesel, ErrorKind::Unavailable => lock_key))
        })
    }

    fn is_locked(&self, lock_key: &str) -> Result<bool, Error> {
        self.with_connection(|conn| {
            diesel::select(exists(locks.filter(key.eq(lock_key)).filter(expires_at.gt(now))))
                .get_result(conn)
                .map_err(ectx!(try ErrorSource::Diesel, ErrorKind::Unavailable => lock_key))
        })
    }
}
