//! Transaction handle.
//!
//! Statements subscribe to the transaction they run in; commit and rollback
//! publish the outcome so bound statements can close themselves.

use tokio::sync::watch;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::messages::{HandleMessage, TransactionMessage};
use crate::protocol::param_buffer::TransactionParameterBuffer;
use crate::protocol::transport::Transport;

/// Lifecycle of a transaction as seen by bound statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// A started transaction.
#[derive(Debug)]
pub struct Transaction {
    handle: i32,
    state: watch::Sender<TransactionState>,
}

impl Transaction {
    /// Start a transaction with the given TPB.
    pub async fn begin<T: Transport>(
        db: &mut Database<T>,
        tpb: &TransactionParameterBuffer,
    ) -> Result<Self> {
        let response = db
            .execute(&TransactionMessage {
                db_handle: db.handle(),
                tpb: tpb.as_bytes(),
            })
            .await?;
        tracing::debug!(handle = response.handle, "transaction started");
        let (state, _) = watch::channel(TransactionState::Active);
        Ok(Self {
            handle: response.handle,
            state,
        })
    }

    /// Server-side transaction handle.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        *self.state.borrow()
    }

    /// Whether the transaction can still run statements.
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Subscribe to the outcome of this transaction.
    pub fn bind(&self) -> TransactionBinding {
        TransactionBinding {
            handle: self.handle,
            updates: self.state.subscribe(),
        }
    }

    /// Commit and end the transaction.
    pub async fn commit<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        self.finish(db, OP_COMMIT, TransactionState::Committed).await
    }

    /// Commit but keep the transaction context open.
    pub async fn commit_retaining<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        self.ensure_active()?;
        db.execute(&HandleMessage::new(OP_COMMIT_RETAINING, self.handle))
            .await?;
        tracing::debug!(handle = self.handle, "transaction commit retaining");
        Ok(())
    }

    /// Roll back and end the transaction.
    pub async fn rollback<T: Transport>(&mut self, db: &mut Database<T>) -> Result<()> {
        self.finish(db, OP_ROLLBACK, TransactionState::RolledBack)
            .await
    }

    async fn finish<T: Transport>(
        &mut self,
        db: &mut Database<T>,
        op: u32,
        outcome: TransactionState,
    ) -> Result<()> {
        self.ensure_active()?;
        db.execute(&HandleMessage::new(op, self.handle)).await?;
        self.state.send_replace(outcome);
        tracing::debug!(handle = self.handle, state = ?outcome, "transaction finished");
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::NoTransaction)
        }
    }
}

/// A statement's link to its transaction.
#[derive(Debug, Clone)]
pub struct TransactionBinding {
    handle: i32,
    updates: watch::Receiver<TransactionState>,
}

impl TransactionBinding {
    /// Transaction handle to send with requests.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Whether the transaction has been committed or rolled back.
    ///
    /// A dropped transaction handle counts as finished.
    pub fn is_finished(&self) -> bool {
        match self.updates.has_changed() {
            Err(_) => true,
            Ok(_) => *self.updates.borrow() != TransactionState::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(handle: i32) -> Transaction {
        let (state, _) = watch::channel(TransactionState::Active);
        Transaction { handle, state }
    }

    #[test]
    fn test_binding_sees_outcome() {
        let tx = transaction(5);
        let binding = tx.bind();
        assert_eq!(binding.handle(), 5);
        assert!(!binding.is_finished());

        tx.state.send_replace(TransactionState::Committed);
        assert!(binding.is_finished());
        assert!(!tx.is_active());
    }

    #[test]
    fn test_dropped_transaction_finishes_binding() {
        let tx = transaction(1);
        let binding = tx.bind();
        drop(tx);
        assert!(binding.is_finished());
    }
}
