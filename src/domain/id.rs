use derive_more::Display;

use super::error::PipelineError;

/// Application-side order identifier, as stored in `orders.id` and echoed
/// back by the processor in `metadata.order_id`. Opaque: kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PipelineError::Validation("OrderId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Checkout session identifier (`cs_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct CheckoutSessionId(String);

impl CheckoutSessionId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if !id.starts_with("cs_") {
            return Err(PipelineError::Validation(format!(
                "CheckoutSessionId must start with cs_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment-intent identifier (`pi_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct PaymentIntentId(String);

impl PaymentIntentId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if !id.starts_with("pi_") {
            return Err(PipelineError::Validation(format!(
                "PaymentIntentId must start with pi_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Processor customer identifier (`cus_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if !id.starts_with("cus_") {
            return Err(PipelineError::Validation(format!(
                "CustomerId must start with cus_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
