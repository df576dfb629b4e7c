//! Bounded connection pool.
//!
//! Connections are opened lazily up to `size`. When all of them are checked
//! out, callers wait on a condition variable until one is returned or the
//! acquisition timeout elapses, which yields
//! [`StoreUnavailable::PoolExhausted`]. A checked-out connection goes back
//! to the idle set only through [`PooledConnection::recycle`]; dropping it
//! closes the connection and frees its slot, so a connection whose
//! operation failed is never reused.

use super::{Connection, Connector};
use crate::error::StoreUnavailable;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct PoolState<T> {
    idle: Vec<T>,
    /// Connections in existence (idle, checked out, or being opened).
    open: usize,
    in_use: usize,
    peak_in_use: usize,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub open: usize,
    pub idle: usize,
    pub in_use: usize,
    /// Highest `in_use` observed since the pool was created.
    pub peak_in_use: usize,
}

pub struct Pool<C: Connector> {
    connector: C,
    size: usize,
    timeout: Duration,
    state: Mutex<PoolState<C::Conn>>,
    returned: Condvar,
}

impl<C: Connector> Pool<C> {
    /// Create a pool holding at most `size` connections (at least 1).
    pub fn new(connector: C, size: usize, timeout: Duration) -> Self {
        Self {
            connector,
            size: size.max(1),
            timeout,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                open: 0,
                in_use: 0,
                peak_in_use: 0,
            }),
            returned: Condvar::new(),
        }
    }

    /// Check out a connection, waiting up to the acquisition timeout.
    pub fn checkout(&self) -> Result<PooledConnection<'_, C>, StoreUnavailable> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut state = self.lock();

        loop {
            if let Some(conn) = state.idle.pop() {
                mark_in_use(&mut state);
                return Ok(PooledConnection::new(self, conn));
            }

            if state.open < self.size {
                state.open += 1;
                mark_in_use(&mut state);
                drop(state);
                return match self.connector.connect() {
                    Ok(conn) => Ok(PooledConnection::new(self, conn)),
                    Err(err) => {
                        self.release(None);
                        Err(err)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(size = self.size, "pool exhausted");
                return Err(StoreUnavailable::PoolExhausted {
                    waited: now.duration_since(started),
                });
            }

            state = self
                .returned
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Run `op` on a pooled connection.
    ///
    /// A connection that reported a failure is discarded.
    pub fn with<T>(
        &self,
        op: impl FnOnce(&mut C::Conn) -> Result<T, StoreUnavailable>,
    ) -> Result<T, StoreUnavailable> {
        let mut conn = self.checkout()?;
        let result = op(conn.connection());
        if result.is_ok() {
            conn.recycle();
        }
        result
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            size: self.size,
            open: state.open,
            idle: state.idle.len(),
            in_use: state.in_use,
            peak_in_use: state.peak_in_use,
        }
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<C::Conn>> {
        // Counters stay consistent across a panicking holder.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a connection, or give up its slot when `conn` is `None`.
    fn release(&self, conn: Option<C::Conn>) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        match conn {
            Some(conn) => state.idle.push(conn),
            None => state.open = state.open.saturating_sub(1),
        }
        drop(state);
        self.returned.notify_one();
    }
}

fn mark_in_use<T>(state: &mut PoolState<T>) {
    state.in_use += 1;
    state.peak_in_use = state.peak_in_use.max(state.in_use);
}

// =============================================================================
// CHECKED-OUT CONNECTION
// =============================================================================

/// A connection on loan from a [`Pool`].
pub struct PooledConnection<'p, C: Connector> {
    conn: C::Conn,
    slot: Slot<'p, C>,
}

impl<'p, C: Connector> PooledConnection<'p, C> {
    fn new(pool: &'p Pool<C>, conn: C::Conn) -> Self {
        Self {
            conn,
            slot: Slot { pool, armed: true },
        }
    }

    /// Borrow the underlying connection.
    pub fn connection(&mut self) -> &mut C::Conn {
        &mut self.conn
    }

    /// Hand the connection back to the pool for reuse.
    pub fn recycle(self) {
        let Self { conn, slot } = self;
        slot.release(Some(conn));
    }
}

/// Claim on one pool slot. Freed on drop unless released explicitly.
struct Slot<'p, C: Connector> {
    pool: &'p Pool<C>,
    armed: bool,
}

impl<C: Connector> Slot<'_, C> {
    fn release(mut self, conn: Option<C::Conn>) {
        self.armed = false;
        self.pool.release(conn);
    }
}

impl<C: Connector> Drop for Slot<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.release(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Connector counting how many connections it opened.
    #[derive(Default)]
    struct Counting {
        opened: AtomicUsize,
        refuse: bool,
    }

    struct Dummy;

    impl Connection for Dummy {
        fn get(&mut self, _key: &str) -> Result<Option<String>, StoreUnavailable> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<bool, StoreUnavailable> {
            Ok(true)
        }
        fn scan_prefix(&mut self, _prefix: &str) -> Result<Vec<String>, StoreUnavailable> {
            Err(StoreUnavailable::backend("scan not supported"))
        }
    }

    impl Connector for Counting {
        type Conn = Dummy;

        fn connect(&self) -> Result<Dummy, StoreUnavailable> {
            if self.refuse {
                return Err(StoreUnavailable::ConnectionRefused("test".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Dummy)
        }
    }

    #[test]
    fn reuses_returned_connections() {
        let pool = Pool::new(Counting::default(), 3, Duration::from_millis(50));
        for _ in 0..10 {
            pool.with(|conn| conn.get("k")).unwrap();
        }
        assert_eq!(pool.connector().opened.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().in_use, 0);
    }

    #[test]
    fn recycle_keeps_connection_drop_closes_it() {
        let pool = Pool::new(Counting::default(), 2, Duration::from_millis(20));

        let mut conn = pool.checkout().unwrap();
        conn.connection().get("k").unwrap();
        conn.recycle();
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().open, 1);

        let conn = pool.checkout().unwrap();
        assert_eq!(pool.stats().in_use, 1);
        drop(conn);
        let stats = pool.stats();
        assert_eq!((stats.open, stats.idle, stats.in_use), (0, 0, 0));
    }

    #[test]
    fn exhaustion_times_out() {
        let pool = Pool::new(Counting::default(), 1, Duration::from_millis(20));
        let held = pool.checkout().unwrap();

        match pool.checkout() {
            Err(StoreUnavailable::PoolExhausted { waited }) => {
                assert!(waited >= Duration::from_millis(20));
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("checkout should time out"),
        }

        drop(held);
        assert!(pool.checkout().is_ok());
    }

    #[test]
    fn failed_operation_discards_connection() {
        let pool = Pool::new(Counting::default(), 2, Duration::from_millis(20));
        assert!(pool.with(|conn| conn.scan_prefix("p")).is_err());

        let stats = pool.stats();
        assert_eq!(stats.open, 0);
        assert_eq!(stats.idle, 0);

        pool.with(|conn| conn.get("k")).unwrap();
        assert_eq!(pool.connector().opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn refused_connect_frees_slot() {
        let pool = Pool::new(
            Counting {
                refuse: true,
                ..Counting::default()
            },
            1,
            Duration::from_millis(20),
        );
        assert!(matches!(
            pool.checkout().err(),
            Some(StoreUnavailable::ConnectionRefused(_))
        ));
        assert_eq!(pool.stats().open, 0);
        // Slot was released: the next attempt is refused again, not exhausted.
        assert!(matches!(
            pool.checkout().err(),
            Some(StoreUnavailable::ConnectionRefused(_))
        ));
    }

    #[test]
    fn waiter_is_woken_by_return() {
        let pool = Arc::new(Pool::new(Counting::default(), 1, Duration::from_secs(2)));
        let held = pool.checkout().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.checkout().map(|_| ()).is_ok())
        };

        std::thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(waiter.join().unwrap());
        assert_eq!(pool.stats().peak_in_use, 1);
    }
}
