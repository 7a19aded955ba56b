//! In-process storage engine.

use crate::config::EngineConfig;
use crate::context::WriteContext;
use crate::engine::{EngineTransaction, StorageEngine};
use crate::error::{EngineError, EngineResult};
use crate::log::{CommitLog, CommitRecord};
use crate::statement::{BulkInsert, CloseLive, ExistsLive};
use crate::types::{RowId, StoredRow, TransactionId, TupleKey};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};
use tupledb_storage::StorageBackend;

/// Longest single wait on the writer lock before the context is rechecked.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Committed tables.
#[derive(Debug, Default)]
struct Tables {
    /// Append-only row table; a row's index is its [`RowId`].
    rows: Vec<StoredRow>,
    /// Live row per key. Enforces at most one live row per key.
    live: HashMap<TupleKey, usize>,
    /// Transaction table: commit time per committed transaction.
    transactions: BTreeMap<TransactionId, u64>,
    /// Highest committed transaction.
    head: TransactionId,
}

impl Tables {
    fn apply(&mut self, record: &CommitRecord) -> EngineResult<()> {
        if record.txn <= self.head {
            return Err(EngineError::invalid_request(format!(
                "{} does not follow head {}",
                record.txn, self.head
            )));
        }

        for key in &record.closed {
            let index = self.live.remove(key).ok_or_else(|| {
                EngineError::invalid_request(format!("{key} has no live row to close"))
            })?;
            self.rows[index].deleted_txn = Some(record.txn);
        }

        for key in &record.inserted {
            if self.live.contains_key(key) {
                return Err(EngineError::UniqueViolation { key: key.clone() });
            }
            let index = self.rows.len();
            self.rows.push(StoredRow {
                id: RowId(index as u64),
                key: key.clone(),
                created_txn: record.txn,
                deleted_txn: None,
            });
            self.live.insert(key.clone(), index);
        }

        self.transactions.insert(record.txn, record.committed_at_ms);
        self.head = record.txn;
        Ok(())
    }
}

/// A tuple store held in memory, optionally journaled to a commit log.
///
/// ## Isolation
///
/// A write transaction holds the engine's writer lock from `begin` until it
/// is dropped, so write transactions run one after another (serializable).
/// Its changes are staged privately and published under the table lock in
/// `commit`. Readers of the committed tables never observe staged state.
///
/// ## Durability
///
/// With a commit log attached ([`LocalEngine::open`]), a commit appends its
/// record to the log before publishing. A failed append fails the commit and
/// nothing is published.
pub struct LocalEngine {
    config: EngineConfig,
    tables: RwLock<Tables>,
    writer: Mutex<Option<CommitLog>>,
    durable: bool,
}

impl LocalEngine {
    /// Creates an empty engine with no commit log.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an empty engine with no commit log.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(Tables::default()),
            writer: Mutex::new(None),
            durable: false,
        }
    }

    /// Opens an engine journaled to `backend`, replaying its commit log.
    ///
    /// # Errors
    ///
    /// Fails if the log is corrupt or its records contradict each other.
    pub fn open(backend: Box<dyn StorageBackend>, config: EngineConfig) -> EngineResult<Self> {
        let mut log = CommitLog::new(backend, config.sync_on_commit);
        let mut tables = Tables::default();
        for record in log.replay()? {
            tables.apply(&record).map_err(|err| {
                EngineError::log_corruption(0, format!("replaying {}: {err}", record.txn))
            })?;
        }
        debug!(head = %tables.head, rows = tables.rows.len(), "opened tuple store");

        Ok(Self {
            config,
            tables: RwLock::new(tables),
            writer: Mutex::new(Some(log)),
            durable: true,
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns true if commits are journaled.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Highest committed transaction.
    #[must_use]
    pub fn head_txn(&self) -> TransactionId {
        self.tables.read().head
    }

    /// Keys with a live row, sorted.
    #[must_use]
    pub fn live_tuples(&self) -> Vec<TupleKey> {
        let tables = self.tables.read();
        let mut keys: Vec<_> = tables.live.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Keys that were live as of `txn`, sorted.
    #[must_use]
    pub fn tuples_at(&self, txn: TransactionId) -> Vec<TupleKey> {
        let tables = self.tables.read();
        let mut keys: Vec<_> = tables
            .rows
            .iter()
            .filter(|row| row.visible_at(txn))
            .map(|row| row.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Every row ever written for `key`, oldest first.
    #[must_use]
    pub fn history(&self, key: &TupleKey) -> Vec<StoredRow> {
        self.tables
            .read()
            .rows
            .iter()
            .filter(|row| &row.key == key)
            .cloned()
            .collect()
    }

    /// The whole row table, in row order.
    #[must_use]
    pub fn rows(&self) -> Vec<StoredRow> {
        self.tables.read().rows.clone()
    }

    /// Commit time of a committed transaction.
    #[must_use]
    pub fn committed_at(&self, txn: TransactionId) -> Option<SystemTime> {
        self.tables
            .read()
            .transactions
            .get(&txn)
            .map(|ms| UNIX_EPOCH + Duration::from_millis(*ms))
    }

    /// Committed transactions, oldest first.
    #[must_use]
    pub fn transactions(&self) -> Vec<TransactionId> {
        self.tables.read().transactions.keys().copied().collect()
    }

    /// Waits for the writer lock, giving up once `ctx` is cancelled or expires.
    fn lock_writer(&self, ctx: &WriteContext) -> EngineResult<MutexGuard<'_, Option<CommitLog>>> {
        if !ctx.is_bounded() {
            return Ok(self.writer.lock());
        }

        loop {
            let wait = ctx.deadline().map_or(LOCK_POLL_INTERVAL, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .min(LOCK_POLL_INTERVAL)
            });
            if let Some(guard) = self.writer.try_lock_for(wait) {
                return Ok(guard);
            }
            ctx.check()?;
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("head", &self.head_txn())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StorageEngine for LocalEngine {
    fn begin(&self, ctx: &WriteContext) -> EngineResult<Box<dyn EngineTransaction + '_>> {
        ctx.check()?;
        let guard = self.lock_writer(ctx)?;
        ctx.check()?;
        Ok(Box::new(LocalTransaction::new(self, guard)))
    }

    fn head(&self) -> EngineResult<TransactionId> {
        Ok(self.head_txn())
    }
}

/// State of a [`LocalTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Open for statements.
    Active,
    /// Published.
    Committed,
    /// Discarded.
    RolledBack,
}

/// A write transaction on a [`LocalEngine`].
///
/// Holds the engine's writer lock for its whole lifetime. Dropping it without
/// committing discards its changes.
pub struct LocalTransaction<'a> {
    engine: &'a LocalEngine,
    log: MutexGuard<'a, Option<CommitLog>>,
    state: TransactionState,
    txn: Option<TransactionId>,
    /// Committed live rows closed by this transaction.
    closed: HashSet<TupleKey>,
    /// Rows inserted by this transaction, in insert order.
    inserted: Vec<TupleKey>,
}

impl<'a> LocalTransaction<'a> {
    fn new(engine: &'a LocalEngine, log: MutexGuard<'a, Option<CommitLog>>) -> Self {
        Self {
            engine,
            log,
            state: TransactionState::Active,
            txn: None,
            closed: HashSet::new(),
            inserted: Vec::new(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn ensure_active(&self) -> EngineResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => {
                Err(EngineError::invalid_request("transaction already committed"))
            }
            TransactionState::RolledBack => {
                Err(EngineError::invalid_request("transaction already rolled back"))
            }
        }
    }

    /// Fails unless `stamp` is this transaction's allocated id.
    fn ensure_stamp(&self, stamp: TransactionId) -> EngineResult<()> {
        match self.txn {
            Some(txn) if txn == stamp => Ok(()),
            Some(txn) => Err(EngineError::invalid_request(format!(
                "statement stamped {stamp} inside {txn}"
            ))),
            None => Err(EngineError::invalid_request(
                "no transaction id allocated before writing",
            )),
        }
    }

    fn committed_live(&self, tables: &Tables, key: &TupleKey) -> bool {
        tables.live.contains_key(key) && !self.closed.contains(key)
    }

    fn is_live(&self, tables: &Tables, key: &TupleKey) -> bool {
        self.committed_live(tables, key) || self.inserted.contains(key)
    }
}

impl EngineTransaction for LocalTransaction<'_> {
    fn create_transaction(&mut self, ctx: &WriteContext) -> EngineResult<TransactionId> {
        ctx.check()?;
        self.ensure_active()?;
        if let Some(txn) = self.txn {
            return Err(EngineError::invalid_request(format!(
                "transaction id {txn} already allocated"
            )));
        }

        // The writer lock is held, so no commit can move the head until this
        // transaction finishes; an abandoned id is simply reused.
        let txn = self.engine.tables.read().head.next();
        self.txn = Some(txn);
        trace!(%txn, "allocated transaction id");
        Ok(txn)
    }

    fn exists_live(&mut self, ctx: &WriteContext, query: &ExistsLive) -> EngineResult<bool> {
        ctx.check()?;
        self.ensure_active()?;
        let tables = self.engine.tables.read();
        Ok(self.is_live(&tables, &query.key))
    }

    fn close_live(&mut self, ctx: &WriteContext, update: &CloseLive) -> EngineResult<u64> {
        ctx.check()?;
        self.ensure_active()?;
        self.ensure_stamp(update.deleted_txn)?;

        if let Some(pos) = self.inserted.iter().position(|key| key == &update.key) {
            // A row created and closed by the same transaction never existed.
            self.inserted.remove(pos);
            return Ok(1);
        }

        let tables = self.engine.tables.read();
        if self.committed_live(&tables, &update.key) {
            drop(tables);
            self.closed.insert(update.key.clone());
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn insert_rows(&mut self, ctx: &WriteContext, insert: &BulkInsert) -> EngineResult<u64> {
        ctx.check()?;
        self.ensure_active()?;
        self.ensure_stamp(insert.created_txn())?;

        let tables = self.engine.tables.read();
        let mut batch = HashSet::with_capacity(insert.len());
        for key in insert.rows() {
            if self.is_live(&tables, key) || !batch.insert(key) {
                return Err(EngineError::UniqueViolation { key: key.clone() });
            }
        }
        drop(tables);

        self.inserted.extend(insert.rows().iter().cloned());
        Ok(insert.len() as u64)
    }

    fn commit(&mut self, ctx: &WriteContext) -> EngineResult<()> {
        ctx.check()?;
        self.ensure_active()?;

        let Some(txn) = self.txn else {
            // Nothing was allocated, so nothing was written.
            self.state = TransactionState::Committed;
            return Ok(());
        };

        let committed_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let mut closed: Vec<_> = self.closed.iter().cloned().collect();
        closed.sort();
        let record = CommitRecord {
            txn,
            committed_at_ms,
            closed,
            inserted: self.inserted.clone(),
        };

        if let Some(log) = &mut *self.log {
            log.append(&record)?;
        }
        self.engine.tables.write().apply(&record)?;
        self.state = TransactionState::Committed;

        debug!(
            %txn,
            closed = record.closed.len(),
            inserted = record.inserted.len(),
            "committed transaction"
        );
        Ok(())
    }

    fn rollback(&mut self) -> EngineResult<()> {
        self.ensure_active()?;
        self.closed.clear();
        self.inserted.clear();
        self.state = TransactionState::RolledBack;
        trace!(txn = ?self.txn, "rolled back transaction");
        Ok(())
    }
}
