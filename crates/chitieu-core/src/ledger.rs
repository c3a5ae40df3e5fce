//! Expense ledger
//!
//! Ties the interpreter to the database: each utterance is interpreted, the
//! result applied (record, balance change, deletion, statistics) and, when a
//! sync destination is configured, pushed out on a best-effort basis.

use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::interpret::{Intent, InterpretContext, Interpreter};
use crate::models::{
    Balance, BalanceAccount, BalanceOperation, BalanceUpdate, DeleteIntent, Interpretation,
    InterpretationResult, InterpretationSource, ParseFailure, ParsedExpense, SpendingSummary,
    StatsPeriod, Transaction, TransactionQuery,
};
use crate::sync::SyncService;

/// Transactions listed with a statistics answer
const STATS_RECENT_LIMIT: i64 = 3;

/// What applying an interpretation did
#[derive(Debug, Clone)]
pub enum Outcome {
    /// An expense or income was stored
    Recorded {
        transaction: Transaction,
        balance: Balance,
        today: SpendingSummary,
        week: SpendingSummary,
    },
    BalanceUpdated {
        update: BalanceUpdate,
        before: Balance,
        after: Balance,
    },
    Deleted {
        transaction: Transaction,
        balance: Balance,
    },
    /// The delete request matched nothing
    NothingToDelete { intent: DeleteIntent },
    Statistics {
        period: StatsPeriod,
        summary: SpendingSummary,
        recent: Vec<Transaction>,
    },
    NotUnderstood { failure: ParseFailure },
}

/// An outcome with the stage that interpreted the utterance
#[derive(Debug, Clone)]
pub struct Processed {
    pub source: InterpretationSource,
    pub outcome: Outcome,
}

/// Per-user expense ledger
#[derive(Clone)]
pub struct ExpenseTracker {
    db: Database,
    interpreter: Interpreter,
    sync: Option<SyncService>,
    user: String,
    user_id: i64,
}

impl ExpenseTracker {
    /// Create a tracker for `user`, creating the user if needed
    pub fn new(db: Database, interpreter: Interpreter, user: &str) -> Result<Self> {
        let user_id = db.user_id_for(user)?;
        Ok(Self {
            db,
            interpreter,
            sync: None,
            user: user.trim().to_string(),
            user_id,
        })
    }

    pub fn with_sync(mut self, sync: Option<SyncService>) -> Self {
        self.sync = sync;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn sync(&self) -> Option<&SyncService> {
        self.sync.as_ref()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Interpretation context for the current wall clock
    pub fn context(&self) -> InterpretContext {
        InterpretContext::current(&self.user)
    }

    /// Interpret and apply one chat message, at the current time
    pub async fn process(&self, utterance: &str) -> Result<Processed> {
        self.process_at(utterance, &self.context()).await
    }

    /// Interpret and apply one chat message with an explicit context
    pub async fn process_at(&self, utterance: &str, ctx: &InterpretContext) -> Result<Processed> {
        let interpretation = self.interpreter.interpret(utterance, ctx).await;
        self.apply(interpretation, ctx).await
    }

    /// Apply a message whose intent the caller already knows
    pub async fn process_as(
        &self,
        intent: Intent,
        utterance: &str,
        ctx: &InterpretContext,
    ) -> Result<Processed> {
        let interpretation = self.interpreter.interpret_as(intent, utterance, ctx);
        self.apply(interpretation, ctx).await
    }

    /// Apply an interpretation to the ledger
    ///
    /// Fails when `ctx` names a different user than the one this tracker was opened for.
    pub async fn apply(
        &self,
        interpretation: Interpretation,
        ctx: &InterpretContext,
    ) -> Result<Processed> {
        if ctx.user.trim() != self.user {
            return Err(Error::InvalidData(format!(
                "Context is for user '{}' but this ledger belongs to '{}'",
                ctx.user, self.user
            )));
        }
        let Interpretation { result, source } = interpretation;
        debug!(source = %source, user = %self.user, "Applying interpretation");

        let outcome = match result {
            InterpretationResult::Expense(expense) => self.record(&expense, source, ctx).await?,
            InterpretationResult::Balance(update) => self.update_balance(update).await?,
            InterpretationResult::Delete(intent) => self.delete(intent)?,
            InterpretationResult::Statistics(request) => self.statistics(request.period, ctx)?,
            InterpretationResult::Failure(failure) => Outcome::NotUnderstood { failure },
        };

        Ok(Processed { source, outcome })
    }

    /// Store an expense and adjust its balance
    pub async fn record(
        &self,
        expense: &ParsedExpense,
        source: InterpretationSource,
        ctx: &InterpretContext,
    ) -> Result<Outcome> {
        let transaction = self.db.insert_transaction(self.user_id, expense, source)?;
        let balance = self.db.balance(self.user_id)?;

        let today = self.db.spending_summary(self.user_id, ctx.today, ctx.today)?;
        let (from, to) = StatsPeriod::Week.range(ctx.today);
        let week = self.db.spending_summary(self.user_id, from, to)?;

        self.sync_pending().await;

        Ok(Outcome::Recorded {
            transaction,
            balance,
            today,
            week,
        })
    }

    /// Set or add to the named balances
    pub async fn update_balance(&self, update: BalanceUpdate) -> Result<Outcome> {
        let before = self.db.balance(self.user_id)?;

        let mut after = before;
        for (&account, &amount) in update.amounts() {
            after = self.apply_amount(account, amount, update.operation())?;
        }

        self.sync_balance().await;

        Ok(Outcome::BalanceUpdated {
            update,
            before,
            after,
        })
    }

    fn apply_amount(
        &self,
        account: BalanceAccount,
        amount: u64,
        operation: BalanceOperation,
    ) -> Result<Balance> {
        let amount = i64::try_from(amount)
            .map_err(|_| Error::InvalidData(format!("Amount too large: {}", amount)))?;
        match operation {
            BalanceOperation::Set => self.db.set_balance(self.user_id, account, amount),
            BalanceOperation::Add => self.db.adjust_balance(self.user_id, account, amount),
        }
    }

    /// Delete the most recent transaction matching `intent`
    pub fn delete(&self, intent: DeleteIntent) -> Result<Outcome> {
        let target = if intent.is_most_recent() {
            self.db.recent_transactions(self.user_id, 1)?
        } else {
            let query = TransactionQuery::from(&intent);
            self.db.find_transactions(self.user_id, &query)?
        };

        let Some(found) = target.into_iter().next() else {
            return Ok(Outcome::NothingToDelete { intent });
        };

        match self.db.delete_transaction(found.id)? {
            Some(transaction) => Ok(Outcome::Deleted {
                transaction,
                balance: self.db.balance(self.user_id)?,
            }),
            None => Ok(Outcome::NothingToDelete { intent }),
        }
    }

    /// Spending summary for a period plus the latest few transactions
    pub fn statistics(&self, period: StatsPeriod, ctx: &InterpretContext) -> Result<Outcome> {
        let (from, to) = period.range(ctx.today);
        let summary = self.db.spending_summary(self.user_id, from, to)?;
        let recent = self.db.recent_transactions(self.user_id, STATS_RECENT_LIMIT)?;
        Ok(Outcome::Statistics {
            period,
            summary,
            recent,
        })
    }

    pub fn balance(&self) -> Result<Balance> {
        self.db.balance(self.user_id)
    }

    async fn sync_pending(&self) {
        if let Some(sync) = &self.sync {
            if let Err(e) = sync.push_pending(&self.db, self.user_id).await {
                warn!("Sync to {} failed: {}", sync.name(), e);
            }
        }
    }

    async fn sync_balance(&self) {
        if let Some(sync) = &self.sync {
            if let Err(e) = sync.push_balance(&self.db, self.user_id).await {
                warn!("Balance sync to {} failed: {}", sync.name(), e);
            }
        }
    }
}
