//! Batch execution with commit and rollback policy.
//!
//! The executor runs generated statements in order. The calling convention
//! of each statement follows its [`StatementKind`]:
//!
//! | kind                                   | convention | result                       |
//! |----------------------------------------|------------|------------------------------|
//! | `Insert`, `Scalar`                     | scalar     | [`StatementResult::Scalar`]  |
//! | `Update`, `Delete`                     | non-query  | [`StatementResult::Affected`]|
//! | `Select`, `Procedure`, `MultiResult`   | reader     | [`StatementResult::Rows`]    |
//!
//! Each result is handed to the step's callback. A callback returning
//! `false` vetoes the rest of the batch: later steps are skipped and, inside
//! a transaction, everything is rolled back.

use tablemap_core::{ResultSet, SqlStatement, SqlValue, StatementKind};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::provider::{Connection, ConnectionProvider, IsolationLevel};
use crate::transaction::TransactionGuard;

/// What one statement returned.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// First column of the first row.
    Scalar(SqlValue),
    /// Number of affected rows.
    Affected(u64),
    /// Every result set of the command.
    Rows(Vec<ResultSet>),
}

impl StatementResult {
    /// Returns the scalar, if this is a scalar result.
    #[must_use]
    pub const fn scalar(&self) -> Option<&SqlValue> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the affected row count, if this is a non-query result.
    #[must_use]
    pub const fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the result sets, if this is a reader result.
    #[must_use]
    pub fn rows(&self) -> Option<&[ResultSet]> {
        match self {
            Self::Rows(sets) => Some(sets),
            _ => None,
        }
    }
}

/// Callback receiving a step's result. `Ok(false)` vetoes continuation.
pub type StepCallback<'a> = Box<dyn FnMut(StatementResult) -> Result<bool> + 'a>;

/// One statement of a batch and the callback that consumes its result.
pub struct BatchStep<'a> {
    statement: SqlStatement,
    on_result: StepCallback<'a>,
}

impl<'a> BatchStep<'a> {
    /// Creates a step with a result callback.
    pub fn new(
        statement: SqlStatement,
        on_result: impl FnMut(StatementResult) -> Result<bool> + 'a,
    ) -> Self {
        Self {
            statement,
            on_result: Box::new(on_result),
        }
    }

    /// Creates a step whose result is discarded.
    #[must_use]
    pub fn discard(statement: SqlStatement) -> Self {
        Self::new(statement, |_| Ok(true))
    }

    /// Returns the statement.
    #[must_use]
    pub const fn statement(&self) -> &SqlStatement {
        &self.statement
    }
}

impl std::fmt::Debug for BatchStep<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStep")
            .field("statement", &self.statement)
            .finish_non_exhaustive()
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every step ran; a transaction, if any, was committed.
    Completed,
    /// The callback of step `step` (0-based) returned `false`; later steps
    /// did not run and a transaction, if any, was rolled back.
    Vetoed {
        /// Index of the vetoing step.
        step: usize,
    },
}

impl BatchOutcome {
    /// Returns true if the batch ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Executes one statement with the calling convention of its kind.
///
/// # Errors
///
/// Returns the connection's error unchanged.
pub fn execute<C>(conn: &mut C, statement: &SqlStatement) -> Result<StatementResult>
where
    C: Connection + ?Sized,
{
    debug!(
        kind = %statement.kind,
        sql = %statement.sql,
        params = statement.params.len(),
        "Executing statement"
    );
    let result = match statement.kind {
        StatementKind::Insert | StatementKind::Scalar => {
            StatementResult::Scalar(conn.execute_scalar(statement)?)
        }
        StatementKind::Update | StatementKind::Delete => {
            StatementResult::Affected(conn.execute_non_query(statement)?)
        }
        StatementKind::Select | StatementKind::Procedure | StatementKind::MultiResult => {
            StatementResult::Rows(conn.execute_reader(statement)?)
        }
    };
    Ok(result)
}

/// Runs batches of statements against a provider.
pub struct Executor<'p, P> {
    provider: &'p P,
}

impl<'p, P: ConnectionProvider> Executor<'p, P> {
    /// Creates an executor over a provider.
    #[must_use]
    pub const fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    /// Runs `steps` in order.
    ///
    /// With an isolation level, every step runs on one connection inside one
    /// transaction, committed when the batch completes and rolled back on a
    /// veto or an error. Without one, each step opens its own connection
    /// and commits on its own.
    ///
    /// # Errors
    ///
    /// The first error from a statement or callback aborts the batch and is
    /// returned as-is, after the transaction (if any) is rolled back.
    pub fn run(
        &self,
        steps: Vec<BatchStep<'_>>,
        isolation: Option<IsolationLevel>,
    ) -> Result<BatchOutcome> {
        let total = steps.len();
        let outcome = match isolation {
            None => self.run_autocommit(steps)?,
            Some(isolation) => self.run_transaction(steps, isolation)?,
        };
        match outcome {
            BatchOutcome::Completed => info!(statements = total, "Batch completed"),
            BatchOutcome::Vetoed { step } => {
                info!(step, statements = total, "Batch stopped by veto");
            }
        }
        Ok(outcome)
    }

    fn run_autocommit(&self, steps: Vec<BatchStep<'_>>) -> Result<BatchOutcome> {
        for (idx, mut step) in steps.into_iter().enumerate() {
            let result = {
                let mut conn = self.provider.open()?;
                execute(&mut conn, &step.statement)?
            };
            if !(step.on_result)(result)? {
                warn!(step = idx, "Step callback vetoed the batch");
                return Ok(BatchOutcome::Vetoed { step: idx });
            }
        }
        Ok(BatchOutcome::Completed)
    }

    fn run_transaction(
        &self,
        steps: Vec<BatchStep<'_>>,
        isolation: IsolationLevel,
    ) -> Result<BatchOutcome> {
        let mut conn = self.provider.open()?;
        let mut tx = TransactionGuard::begin(&mut conn, isolation)?;
        for (idx, mut step) in steps.into_iter().enumerate() {
            let result = execute(tx.connection(), &step.statement)?;
            if !(step.on_result)(result)? {
                warn!(step = idx, "Step callback vetoed the batch");
                tx.rollback()?;
                return Ok(BatchOutcome::Vetoed { step: idx });
            }
        }
        tx.commit()?;
        Ok(BatchOutcome::Completed)
    }
}
