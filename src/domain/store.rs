use {
    super::error::PipelineError,
    super::order::{Order, OrderLookup, Settlement},
    std::{future::Future, pin::Pin},
    thiserror::Error,
};

/// Outcome of the conditional `pending -> paid` write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleWrite {
    /// Status flipped and the credit was inserted.
    Applied,
    /// Status was already `paid` when the conditional update ran.
    AlreadyPaid,
    /// No row with the settlement's order id exists.
    Missing,
}

#[derive(Debug, Error)]
pub enum SettleError {
    #[error("status update failed: {0}")]
    StatusUpdate(#[source] PipelineError),

    /// `order_left_paid` is false when the store rolled the status update
    /// back together with the failed insert.
    #[error("balance operation insert failed: {source}")]
    Ledger {
        #[source]
        source: PipelineError,
        order_left_paid: bool,
    },
}

/// The datastore that owns `orders` and `balance_operations`.
pub trait OrderStore: Send + Sync {
    fn find_order<'a>(
        &'a self,
        lookup: &'a OrderLookup,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Order>, PipelineError>> + Send + 'a>>;

    /// Atomically move the order to `paid` unless it already is, and insert
    /// the credit only when this call performed the transition.
    fn settle<'a>(
        &'a self,
        settlement: &'a Settlement,
    ) -> Pin<Box<dyn Future<Output = Result<SettleWrite, SettleError>> + Send + 'a>>;
}
