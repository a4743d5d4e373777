use {
    super::id::{CheckoutSessionId, CustomerId, OrderId, PaymentIntentId},
    super::money::{Hours, MoneyAmount},
    chrono::{DateTime, Utc},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    /// Any state owned by other flows (cancelled, refunded, ...). This
    /// service never produces one.
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Other(s) => s,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            other => Self::Other(other.to_string()),
        }
    }
}

/// The slice of an `orders` row this service reads.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub status: OrderStatus,
    pub hours: Hours,
    pub amount: MoneyAmount,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Ledger entry crediting this order's hours and amount to its owner.
    pub fn credit_entry(&self) -> NewBalanceOperation {
        NewBalanceOperation {
            id: Uuid::now_v7(),
            user_id: self.user_id.clone(),
            kind: OperationKind::Credit,
            hours_delta: self.hours,
            amount: self.amount,
            source: OperationSource::Order,
            order_id: self.id.clone(),
            note: format!("Payment for order {}", self.id),
        }
    }

    pub fn settlement(&self, refs: ProcessorRefs, paid_at: DateTime<Utc>) -> Settlement {
        Settlement {
            order_id: self.id.clone(),
            paid_at,
            refs,
            credit: self.credit_entry(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Credit,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationSource {
    Order,
}

impl OperationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
        }
    }
}

/// For INSERT into `balance_operations`. Id generated in Rust via Uuid::now_v7().
#[derive(Debug, Clone)]
pub struct NewBalanceOperation {
    pub id: Uuid,
    pub user_id: String,
    pub kind: OperationKind,
    pub hours_delta: Hours,
    pub amount: MoneyAmount,
    pub source: OperationSource,
    pub order_id: OrderId,
    pub note: String,
}

/// Processor identifiers worth keeping on the order for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorRefs {
    pub checkout_session: Option<CheckoutSessionId>,
    pub payment_intent: Option<PaymentIntentId>,
    pub customer: Option<CustomerId>,
}

/// Everything the store needs to move one order to `paid` and credit it.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub order_id: OrderId,
    pub paid_at: DateTime<Utc>,
    pub refs: ProcessorRefs,
    pub credit: NewBalanceOperation,
}

/// How to find the order an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    Id(OrderId),
    CheckoutSession(CheckoutSessionId),
    PaymentIntent(PaymentIntentId),
}

impl fmt::Display for OrderLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "order_id={id}"),
            Self::CheckoutSession(id) => write!(f, "stripe_session_id={id}"),
            Self::PaymentIntent(id) => write!(f, "stripe_payment_intent={id}"),
        }
    }
}

/// A verified payment confirmation, ready for settlement.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    /// Tried in order; the first hit wins.
    pub lookups: Vec<OrderLookup>,
    pub refs: ProcessorRefs,
}

/// What a verified event asks the service to do.
#[derive(Debug, Clone)]
pub enum WebhookTrigger {
    Settle(SettlementRequest),
    /// Recognised event that does not confirm a payment.
    Skip { reason: String },
    /// Event type outside the handled set.
    Ignore { event_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResult {
    /// Order moved to paid and exactly one credit was written.
    Settled { order_id: OrderId, operation_id: Uuid },
    /// Order was already paid (replay or lost race). Nothing written.
    AlreadyPaid(OrderId),
    /// No order matched any lookup.
    OrderNotFound,
    /// Status update failed; no credit written.
    StatusUpdateFailed(OrderId),
    /// Credit insert failed. `order_left_paid` tells whether the status
    /// update survived and needs manual reconciliation.
    LedgerFailed { order_id: OrderId, order_left_paid: bool },
    /// The store could not be queried for the order.
    LookupFailed,
}

impl SettleResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settled { .. } => "settled",
            Self::AlreadyPaid(_) => "already_paid",
            Self::OrderNotFound => "order_not_found",
            Self::StatusUpdateFailed(_) => "status_update_failed",
            Self::LedgerFailed { .. } => "ledger_failed",
            Self::LookupFailed => "lookup_failed",
        }
    }
}

/// Result of handling one verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Settlement(SettleResult),
    Skipped,
    Ignored,
    InvalidData,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settlement(result) => result.as_str(),
            Self::Skipped => "skipped",
            Self::Ignored => "ignored",
            Self::InvalidData => "invalid_data",
        }
    }
}
