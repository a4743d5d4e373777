//! Stripe-facing side of the service: signature check, event decoding and
//! the axum handler that ties them to the settlement pipeline.

pub mod event;
pub mod signature;
pub mod webhook;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
