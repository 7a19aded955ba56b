//! The write entry point.

use crate::allocator::RevisionAllocator;
use crate::bulk::{self, WriteSummary};
use crate::config::WriterConfig;
use crate::context::WriteContext;
use crate::engine::{EngineTransaction, StorageEngine};
use crate::error::{EngineError, EngineResult, WriteError, WriteStage};
use crate::mutation::Mutation;
use crate::planner;
use crate::revision::{Revision, RevisionCodec, TransactionRevisions};
use crate::stats::WriteStats;
use crate::types::{RelationTuple, TransactionId};
use crate::validator;
use tracing::{debug, warn};

/// Applies batches of tuple mutations atomically.
///
/// Each [`TupleWriter::write_tuples`] call runs in one engine transaction:
/// preconditions are checked, a revision is allocated, the mutations are
/// applied, and the transaction commits. If anything fails the transaction is
/// rolled back and the store is left exactly as it was.
///
/// # Example
///
/// ```
/// use tupledb_core::{LocalEngine, Mutation, TupleWriter, WriteContext};
///
/// let writer = TupleWriter::new(LocalEngine::new()).unwrap();
/// let ctx = WriteContext::background();
///
/// let tuple = "document:readme#viewer@user:alice".parse().unwrap();
/// let revision = writer
///     .write_tuples(&ctx, &[], &[Mutation::create(tuple)])
///     .unwrap();
/// assert_eq!(revision.to_string(), "1");
/// ```
pub struct TupleWriter<E, C = TransactionRevisions> {
    engine: E,
    codec: C,
    config: WriterConfig,
    allocator: RevisionAllocator,
    stats: WriteStats,
}

impl<E: StorageEngine> TupleWriter<E> {
    /// Creates a writer with the default codec and configuration.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot report its head.
    pub fn new(engine: E) -> EngineResult<Self> {
        Self::with_codec(engine, TransactionRevisions, WriterConfig::default())
    }

    /// Creates a writer with the default codec.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot report its head.
    pub fn with_config(engine: E, config: WriterConfig) -> EngineResult<Self> {
        Self::with_codec(engine, TransactionRevisions, config)
    }
}

impl<E: StorageEngine, C: RevisionCodec> TupleWriter<E, C> {
    /// Creates a writer.
    ///
    /// # Errors
    ///
    /// Fails if the engine cannot report its head.
    pub fn with_codec(engine: E, codec: C, config: WriterConfig) -> EngineResult<Self> {
        let head = engine.head()?;
        Ok(Self {
            engine,
            codec,
            config,
            allocator: RevisionAllocator::starting_at(head),
            stats: WriteStats::new(),
        })
    }

    /// Atomically checks `preconditions` and applies `mutations`.
    ///
    /// Returns the revision of the committed transaction. An empty request
    /// still commits a transaction and returns a fresh revision.
    ///
    /// # Errors
    ///
    /// - [`WriteError::PreconditionFailed`] if a precondition tuple has no
    ///   live row. The first such tuple in input order is reported.
    /// - [`WriteError::WriteFailed`] for any other failure, labeled with the
    ///   stage it happened in.
    pub fn write_tuples(
        &self,
        ctx: &WriteContext,
        preconditions: &[RelationTuple],
        mutations: &[Mutation],
    ) -> Result<Revision, WriteError> {
        let result = self.run(ctx, preconditions, mutations);

        match &result {
            Ok((revision, summary)) => {
                self.stats.record_commit(
                    summary.rows_closed,
                    summary.rows_inserted,
                    summary.bulk_inserts,
                );
                debug!(
                    %revision,
                    preconditions = preconditions.len(),
                    mutations = mutations.len(),
                    rows_closed = summary.rows_closed,
                    rows_inserted = summary.rows_inserted,
                    "wrote tuples"
                );
            }
            Err(err) => {
                self.stats.record_failure(err);
                match err {
                    WriteError::PreconditionFailed { tuple } => {
                        debug!(%tuple, "write rejected by precondition");
                    }
                    WriteError::WriteFailed { stage, source } => {
                        warn!(%stage, error = %source, "unable to write tuples");
                    }
                }
            }
        }

        result.map(|(revision, _)| revision)
    }

    fn run(
        &self,
        ctx: &WriteContext,
        preconditions: &[RelationTuple],
        mutations: &[Mutation],
    ) -> Result<(Revision, WriteSummary), WriteError> {
        self.check_limits(preconditions, mutations)
            .map_err(|err| WriteError::failed(WriteStage::PreconditionCheck, err))?;

        let bounded;
        let ctx = match (ctx.deadline(), self.config.default_timeout) {
            (None, Some(timeout)) => {
                bounded = ctx.clone().with_timeout(timeout);
                &bounded
            }
            _ => ctx,
        };

        let txn = self
            .engine
            .begin(ctx)
            .map_err(|err| WriteError::failed(WriteStage::PreconditionCheck, err))?;
        let mut scope = TransactionScope::new(txn);

        validator::check_preconditions(scope.txn(), ctx, preconditions)?;

        let txn_id = self
            .allocator
            .allocate(scope.txn(), ctx)
            .map_err(|err| WriteError::failed(WriteStage::WriteExecution, err))?;

        let plan = planner::plan(mutations, txn_id);
        let summary = bulk::apply(scope.txn(), ctx, &plan)
            .map_err(|err| WriteError::failed(WriteStage::WriteExecution, err))?;

        scope
            .commit(ctx)
            .map_err(|err| WriteError::failed(WriteStage::Commit, err))?;
        self.allocator.record_commit(txn_id);

        Ok((self.codec.encode(txn_id), summary))
    }

    fn check_limits(&self, preconditions: &[RelationTuple], mutations: &[Mutation]) -> EngineResult<()> {
        if preconditions.len() > self.config.max_preconditions {
            return Err(EngineError::invalid_request(format!(
                "{} preconditions exceeds the limit of {}",
                preconditions.len(),
                self.config.max_preconditions
            )));
        }
        if mutations.len() > self.config.max_mutations {
            return Err(EngineError::invalid_request(format!(
                "{} mutations exceeds the limit of {}",
                mutations.len(),
                self.config.max_mutations
            )));
        }
        Ok(())
    }

    /// Decodes a revision returned by this writer back to its transaction.
    pub fn transaction_of(&self, revision: Revision) -> TransactionId {
        self.codec.decode(revision)
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the revision codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Returns the write counters.
    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    /// Highest revision committed through this writer, or seen at startup.
    pub fn last_revision(&self) -> Revision {
        self.codec.encode(self.allocator.last_committed())
    }
}

impl<E, C> std::fmt::Debug for TupleWriter<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleWriter")
            .field("config", &self.config)
            .field("last_committed", &self.allocator.last_committed())
            .finish_non_exhaustive()
    }
}

/// Rolls the transaction back on drop unless it committed.
struct TransactionScope<'a> {
    txn: Box<dyn EngineTransaction + 'a>,
    committed: bool,
}

impl<'a> TransactionScope<'a> {
    fn new(txn: Box<dyn EngineTransaction + 'a>) -> Self {
        Self {
            txn,
            committed: false,
        }
    }

    fn txn(&mut self) -> &mut (dyn EngineTransaction + 'a) {
        &mut *self.txn
    }

    fn commit(&mut self, ctx: &WriteContext) -> EngineResult<()> {
        self.txn.commit(ctx)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = self.txn.rollback() {
            warn!(error = %err, "rollback failed");
        }
    }
}
