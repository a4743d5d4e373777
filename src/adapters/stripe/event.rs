use {
    crate::domain::{
        error::PipelineError,
        id::{CheckoutSessionId, CustomerId, OrderId, PaymentIntentId},
        order::{OrderLookup, ProcessorRefs, SettlementRequest, WebhookTrigger},
    },
    serde::Deserialize,
};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str =
    "checkout.session.async_payment_succeeded";
pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

/// A related object that Stripe sends either as a bare id or expanded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: CheckoutPaymentStatus,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub payment_intent: Option<Expandable>,
    #[serde(default)]
    pub customer: Option<Expandable>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub customer: Option<Expandable>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// `checkout.session.completed` and `checkout.session.async_payment_succeeded`.
    CheckoutCompleted(CheckoutSession),
    PaymentIntentSucceeded(PaymentIntent),
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripeEvent {
    pub id: Option<String>,
    pub event_type: String,
    pub kind: EventKind,
}

impl StripeEvent {
    /// Parse a verified raw body. Anything that isn't an event envelope, or a
    /// recognised event whose object doesn't have the expected shape, is
    /// `MalformedPayload`.
    pub fn parse(body: &[u8]) -> Result<Self, PipelineError> {
        let envelope: Envelope = serde_json::from_slice(body)?;

        let kind = match envelope.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED | CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED => {
                EventKind::CheckoutCompleted(serde_json::from_value(envelope.data.object)?)
            }
            PAYMENT_INTENT_SUCCEEDED => {
                EventKind::PaymentIntentSucceeded(serde_json::from_value(envelope.data.object)?)
            }
            _ => EventKind::Unrecognized,
        };

        Ok(Self {
            id: envelope.id,
            event_type: envelope.event_type,
            kind,
        })
    }

    /// Decide what the event asks for. `Validation` means the event carried
    /// identifiers that can't be used as lookup keys.
    pub fn into_trigger(self) -> Result<WebhookTrigger, PipelineError> {
        match self.kind {
            EventKind::CheckoutCompleted(session) => {
                if session.payment_status != CheckoutPaymentStatus::Paid {
                    return Ok(WebhookTrigger::Skip {
                        reason: format!(
                            "checkout session {} has payment_status {:?}",
                            session.id, session.payment_status
                        ),
                    });
                }

                let session_id = CheckoutSessionId::new(session.id)?;
                let mut lookups = Vec::with_capacity(2);
                if let Some(order_id) = metadata_order_id(session.metadata.as_ref()) {
                    lookups.push(OrderLookup::Id(order_id));
                }
                lookups.push(OrderLookup::CheckoutSession(session_id.clone()));

                Ok(WebhookTrigger::Settle(SettlementRequest {
                    lookups,
                    refs: ProcessorRefs {
                        checkout_session: Some(session_id),
                        payment_intent: audit_ref(
                            session.payment_intent.as_ref(),
                            PaymentIntentId::new,
                        ),
                        customer: audit_ref(session.customer.as_ref(), CustomerId::new),
                    },
                }))
            }
            EventKind::PaymentIntentSucceeded(intent) => {
                let intent_id = PaymentIntentId::new(intent.id)?;
                let mut lookups = Vec::with_capacity(2);
                if let Some(order_id) = metadata_order_id(intent.metadata.as_ref()) {
                    lookups.push(OrderLookup::Id(order_id));
                }
                lookups.push(OrderLookup::PaymentIntent(intent_id.clone()));

                Ok(WebhookTrigger::Settle(SettlementRequest {
                    lookups,
                    refs: ProcessorRefs {
                        checkout_session: None,
                        payment_intent: Some(intent_id),
                        customer: audit_ref(intent.customer.as_ref(), CustomerId::new),
                    },
                }))
            }
            EventKind::Unrecognized => Ok(WebhookTrigger::Ignore {
                event_type: self.event_type,
            }),
        }
    }
}

fn metadata_order_id(
    metadata: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Option<OrderId> {
    metadata?
        .get("order_id")?
        .as_str()
        .and_then(|raw| OrderId::new(raw).ok())
}

// Audit-only references: a bad one is not worth dropping a paid order over.
fn audit_ref<T>(
    reference: Option<&Expandable>,
    parse: fn(String) -> Result<T, PipelineError>,
) -> Option<T> {
    let raw = reference?.id();
    match parse(raw.to_string()) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid processor reference");
            None
        }
    }
}
