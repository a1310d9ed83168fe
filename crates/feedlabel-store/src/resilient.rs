//! Single-shot reconnect-and-retry around one store connection.

use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::{Connect, Param, RowSet, SqlConnection, StoreError};

/// Store handle that survives dropped connections.
///
/// Every operation runs on the current connection first. If that fails with
/// a connection-level error, the connection is discarded, exactly one new
/// connection is opened with the same [`Connect`]or, and the operation is
/// retried exactly once. A second failure is returned as
/// [`StoreError::RetryFailed`]. Query errors are returned as-is.
/// [`execute_once`](Self::execute_once) recovers the connection the same way
/// but never replays its statement.
///
/// At most one connection is held at a time. The slot is locked for the whole
/// attempt/reconnect/retry sequence so concurrent callers never interleave
/// recovery on the same handle.
pub struct ResilientStore<C: Connect> {
    connector: C,
    conn: Mutex<Option<C::Conn>>,
    reconnects: AtomicU64,
}

impl<C: Connect> ResilientStore<C> {
    /// Connect eagerly. Failure here is a startup error.
    pub fn open(connector: C) -> Result<Self, StoreError> {
        let conn = connector.connect()?;
        info!(store = %connector.describe(), "store connected");
        Ok(Self {
            connector,
            conn: Mutex::new(Some(conn)),
            reconnects: AtomicU64::new(0),
        })
    }

    /// Run a row-returning statement.
    pub fn execute(&self, sql: &str, params: &[Param]) -> Result<RowSet, StoreError> {
        self.with_retry(|conn| conn.query(sql, params))
    }

    /// Run a statement for its side effects.
    pub fn execute_write(&self, sql: &str, params: &[Param]) -> Result<(), StoreError> {
        self.with_retry(|conn| conn.execute(sql, params)).map(|_| ())
    }

    /// Run a statement for its side effects and report rows changed.
    pub fn execute_write_count(&self, sql: &str, params: &[Param]) -> Result<usize, StoreError> {
        self.with_retry(|conn| conn.execute(sql, params))
    }

    /// Number of reconnects performed since [`open`](Self::open).
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Run a statement that must not be replayed, such as an insert.
    ///
    /// A connection failure still discards the connection and reconnects once
    /// so the next operation starts on a live one, but the statement is not
    /// run again: it may already have been applied. That failure comes back
    /// as [`StoreError::Unconfirmed`].
    pub fn execute_once(&self, sql: &str, params: &[Param]) -> Result<RowSet, StoreError> {
        let mut slot = self.lock()?;
        let mut conn = self.checkout(&mut slot)?;

        let err = match conn.query(sql, params) {
            Ok(rows) => {
                *slot = Some(conn);
                return Ok(rows);
            }
            Err(err) if err.is_connection() => err,
            Err(err) => {
                *slot = Some(conn);
                return Err(err);
            }
        };

        drop(conn);
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        info!(
            store = %self.connector.describe(),
            error = %err,
            "connection lost during non-repeatable statement, reconnecting to store"
        );
        match self.connector.connect() {
            Ok(fresh) => *slot = Some(fresh),
            Err(connect_err) => warn!(error = %connect_err, "reconnect failed"),
        }
        Err(StoreError::Unconfirmed(Box::new(err)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<C::Conn>>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("store connection lock poisoned".into()))
    }

    /// Take the held connection, opening one if the slot is empty.
    ///
    /// The slot is empty only after a failed reconnect. Opening it again
    /// counts as a reconnect; the caller's operation still gets its own
    /// attempt afterwards.
    fn checkout(&self, slot: &mut Option<C::Conn>) -> Result<C::Conn, StoreError> {
        if let Some(conn) = slot.take() {
            return Ok(conn);
        }
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        info!(store = %self.connector.describe(), "no live connection, reconnecting to store");
        let conn = self.connector.connect().map_err(|connect_err| {
            warn!(error = %connect_err, "reconnect failed");
            StoreError::RetryFailed(Box::new(connect_err))
        })?;
        debug!(store = %self.connector.describe(), "store connection re-established");
        Ok(conn)
    }

    fn with_retry<T>(
        &self,
        op: impl Fn(&mut C::Conn) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut slot = self.lock()?;
        let mut conn = self.checkout(&mut slot)?;

        let err = match op(&mut conn) {
            Ok(value) => {
                *slot = Some(conn);
                return Ok(value);
            }
            Err(err) if err.is_connection() => err,
            Err(err) => {
                *slot = Some(conn);
                return Err(err);
            }
        };

        // Never reuse a connection that failed at the connection level.
        drop(conn);
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        info!(
            store = %self.connector.describe(),
            error = %err,
            "connection lost, reconnecting to store"
        );

        let mut fresh = match self.connector.connect() {
            Ok(conn) => conn,
            Err(connect_err) => {
                warn!(error = %connect_err, "reconnect failed");
                return Err(StoreError::RetryFailed(Box::new(connect_err)));
            }
        };

        match op(&mut fresh) {
            Ok(value) => {
                *slot = Some(fresh);
                Ok(value)
            }
            Err(retry_err) => {
                if !retry_err.is_connection() {
                    *slot = Some(fresh);
                }
                warn!(error = %retry_err, "operation failed after reconnect");
                Err(StoreError::RetryFailed(Box::new(retry_err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// What the next call on a scripted connection does.
    #[derive(Clone, Copy, Debug)]
    enum Step {
        Ok,
        ConnLost,
        BadSql,
    }

    #[derive(Default)]
    struct Script {
        /// Outcomes consumed by calls, across all connections. Empty means `Ok`.
        steps: VecDeque<Step>,
        /// Outcomes of connect attempts. Empty means success.
        connects: VecDeque<bool>,
        connect_calls: usize,
        op_calls: usize,
        /// Which connection served each call.
        served_by: Vec<usize>,
    }

    struct ScriptedConnector {
        script: Rc<RefCell<Script>>,
    }

    struct ScriptedConn {
        serial: usize,
        script: Rc<RefCell<Script>>,
    }

    impl ScriptedConn {
        fn step(&mut self) -> Result<usize, StoreError> {
            let mut s = self.script.borrow_mut();
            s.op_calls += 1;
            s.served_by.push(self.serial);
            match s.steps.pop_front().unwrap_or(Step::Ok) {
                Step::Ok => Ok(1),
                Step::ConnLost => Err(StoreError::Connection("server has gone away".into())),
                Step::BadSql => Err(StoreError::Query("syntax error".into())),
            }
        }
    }

    impl SqlConnection for ScriptedConn {
        fn query(&mut self, _sql: &str, _params: &[Param]) -> Result<RowSet, StoreError> {
            self.step().map(|_| Vec::new())
        }

        fn execute(&mut self, _sql: &str, _params: &[Param]) -> Result<usize, StoreError> {
            self.step()
        }
    }

    impl Connect for ScriptedConnector {
        type Conn = ScriptedConn;

        fn connect(&self) -> Result<ScriptedConn, StoreError> {
            let mut s = self.script.borrow_mut();
            s.connect_calls += 1;
            let serial = s.connect_calls;
            if s.connects.pop_front().unwrap_or(true) {
                Ok(ScriptedConn {
                    serial,
                    script: Rc::clone(&self.script),
                })
            } else {
                Err(StoreError::Connection("connection refused".into()))
            }
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn store_with(
        steps: &[Step],
        connects: &[bool],
    ) -> (ResilientStore<ScriptedConnector>, Rc<RefCell<Script>>) {
        let script = Rc::new(RefCell::new(Script {
            steps: steps.iter().copied().collect(),
            connects: connects.iter().copied().collect(),
            ..Default::default()
        }));
        let store = ResilientStore::open(ScriptedConnector {
            script: Rc::clone(&script),
        })
        .unwrap();
        (store, script)
    }

    #[test]
    fn healthy_connection_no_reconnect() {
        let (store, script) = store_with(&[], &[]);
        store.execute("SELECT 1", &[]).unwrap();
        store.execute_write("UPDATE t SET x = 1", &[]).unwrap();
        assert_eq!(store.reconnects(), 0);
        assert_eq!(script.borrow().connect_calls, 1);
        assert_eq!(script.borrow().op_calls, 2);
    }

    #[test]
    fn fail_then_succeed_reconnects_once() {
        let (store, script) = store_with(&[Step::ConnLost, Step::Ok], &[]);
        store.execute("SELECT 1", &[]).unwrap();

        assert_eq!(store.reconnects(), 1);
        let s = script.borrow();
        assert_eq!(s.connect_calls, 2, "initial connect + one reconnect");
        assert_eq!(s.op_calls, 2);
        // Retry ran on the fresh connection, not the failed one.
        assert_eq!(s.served_by, vec![1, 2]);
    }

    #[test]
    fn fail_twice_gives_store_error_without_third_attempt() {
        let (store, script) = store_with(&[Step::ConnLost, Step::ConnLost, Step::Ok], &[]);
        let err = store.execute("SELECT 1", &[]).unwrap_err();

        assert!(matches!(err, StoreError::RetryFailed(_)), "got {err:?}");
        assert_eq!(store.reconnects(), 1);
        let s = script.borrow();
        assert_eq!(s.op_calls, 2, "no third attempt");
        assert_eq!(s.connect_calls, 2);
    }

    #[test]
    fn failed_connection_is_not_reused() {
        let (store, script) = store_with(&[Step::ConnLost, Step::ConnLost], &[]);
        store.execute("SELECT 1", &[]).unwrap_err();
        assert!(!store.is_connected());

        // Next operation opens a new connection rather than touching #2.
        store.execute("SELECT 1", &[]).unwrap();
        let s = script.borrow();
        assert_eq!(s.connect_calls, 3);
        assert_eq!(s.served_by, vec![1, 2, 3]);
    }

    #[test]
    fn query_error_is_not_retried() {
        let (store, script) = store_with(&[Step::BadSql], &[]);
        let err = store.execute("SELEC 1", &[]).unwrap_err();

        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(store.reconnects(), 0);
        assert_eq!(script.borrow().op_calls, 1);
        assert!(store.is_connected(), "query errors keep the connection");
    }

    #[test]
    fn failed_reconnect_surfaces_store_error() {
        // Initial connect ok, reconnect refused.
        let (store, script) = store_with(&[Step::ConnLost], &[true, false]);
        let err = store.execute_write("UPDATE t SET x = 1", &[]).unwrap_err();

        match err {
            StoreError::RetryFailed(inner) => assert!(inner.is_connection()),
            other => panic!("expected RetryFailed, got {other:?}"),
        }
        assert_eq!(script.borrow().op_calls, 1, "no retry without a connection");
        assert!(!store.is_connected());
    }

    #[test]
    fn reconnect_from_empty_slot_is_counted_and_not_recoverable() {
        // Initial connect ok, reconnect refused, next operation's connect refused.
        let (store, script) = store_with(&[Step::ConnLost], &[true, false, false]);
        store.execute("SELECT 1", &[]).unwrap_err();
        assert_eq!(store.reconnects(), 1);
        assert!(!store.is_connected());

        let err = store.execute("SELECT 1", &[]).unwrap_err();
        match &err {
            StoreError::RetryFailed(inner) => assert!(inner.is_connection()),
            other => panic!("expected RetryFailed, got {other:?}"),
        }
        assert!(!err.is_connection());
        assert_eq!(store.reconnects(), 2);
        let s = script.borrow();
        assert_eq!(s.connect_calls, 3);
        assert_eq!(s.op_calls, 1, "no operation ran without a connection");
    }

    #[test]
    fn reconnect_from_empty_slot_then_succeeds() {
        let (store, script) = store_with(&[Step::ConnLost], &[true, false, true]);
        store.execute("SELECT 1", &[]).unwrap_err();

        store.execute("SELECT 1", &[]).unwrap();
        assert_eq!(store.reconnects(), 2);
        assert!(store.is_connected());
        assert_eq!(script.borrow().served_by, vec![1, 3]);
    }

    #[test]
    fn execute_once_does_not_replay_after_connection_loss() {
        let (store, script) = store_with(&[Step::ConnLost, Step::Ok], &[]);
        let err = store.execute_once("INSERT INTO t VALUES (1)", &[]).unwrap_err();

        match &err {
            StoreError::Unconfirmed(inner) => assert!(inner.is_connection()),
            other => panic!("expected Unconfirmed, got {other:?}"),
        }
        assert!(!err.is_connection());
        assert_eq!(store.reconnects(), 1);
        assert!(store.is_connected(), "reconnected for the next operation");
        {
            let s = script.borrow();
            assert_eq!(s.op_calls, 1, "statement ran once");
            assert_eq!(s.connect_calls, 2);
        }

        store.execute("SELECT 1", &[]).unwrap();
        assert_eq!(script.borrow().served_by, vec![1, 2]);
    }

    #[test]
    fn execute_once_with_refused_reconnect_leaves_slot_empty() {
        let (store, script) = store_with(&[Step::ConnLost], &[true, false]);
        let err = store.execute_once("INSERT INTO t VALUES (1)", &[]).unwrap_err();
        assert!(matches!(err, StoreError::Unconfirmed(_)), "got {err:?}");
        assert!(!store.is_connected());
        assert_eq!(script.borrow().op_calls, 1);
    }

    #[test]
    fn execute_once_passes_query_errors_through() {
        let (store, script) = store_with(&[Step::BadSql], &[]);
        let err = store.execute_once("INSERT INTO nope VALUES (1)", &[]).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(store.reconnects(), 0);
        assert!(store.is_connected());
        assert_eq!(script.borrow().connect_calls, 1);
    }

    #[test]
    fn query_error_on_retry_keeps_fresh_connection() {
        let (store, script) = store_with(&[Step::ConnLost, Step::BadSql], &[]);
        let err = store.execute("SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, StoreError::RetryFailed(_)));
        assert!(store.is_connected());

        store.execute("SELECT 1", &[]).unwrap();
        assert_eq!(script.borrow().served_by, vec![1, 2, 2]);
    }

    #[test]
    fn write_count_passes_through() {
        let (store, _) = store_with(&[], &[]);
        assert_eq!(store.execute_write_count("DELETE FROM t", &[]).unwrap(), 1);
    }

    #[test]
    fn open_fails_when_store_unreachable() {
        let script = Rc::new(RefCell::new(Script {
            connects: [false].into_iter().collect(),
            ..Default::default()
        }));
        let result = ResilientStore::open(ScriptedConnector { script });
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }

    #[test]
    fn param_conversions() {
        assert_eq!(Param::from(3i64), Param::Int(3));
        assert_eq!(Param::from("x"), Param::Text("x".into()));
        assert_eq!(Param::from(None::<i64>), Param::Null);
        assert_eq!(Param::from(Some(7i64)), Param::Int(7));
    }
}
