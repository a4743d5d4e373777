use {
    super::{
        SIGNATURE_HEADER,
        event::StripeEvent,
        signature::SignatureError,
    },
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{error::PipelineError, order::EventOutcome},
        services::settlement::process_trigger,
    },
    axum::{
        Json,
        body::Bytes,
        extract::{State, rejection::BytesRejection},
        http::HeaderMap,
    },
};

/// `POST /webhook`. The body is taken as raw bytes: the signature covers the
/// exact bytes Stripe sent, so nothing may re-encode it before verification.
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn wh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Oversized or unreadable bodies get the same answer as unparseable ones.
    let body = body.map_err(|e| {
        tracing::warn!(error = %e, "rejecting unreadable webhook body");
        PipelineError::MalformedPayload(e.body_text())
    })?;

    let verified = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(sig) => state.verifier.verify(&body, sig),
        None => Err(SignatureError::MissingHeader),
    };
    if let Err(e) = verified {
        tracing::warn!(reason = %e, "rejecting webhook with invalid signature");
        return Err(PipelineError::WebhookSignature(e.to_string()).into());
    }

    let event = StripeEvent::parse(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "rejecting webhook with malformed payload");
    })?;

    let span = tracing::Span::current();
    if let Some(id) = &event.id {
        span.record("event_id", tracing::field::display(id));
    }
    span.record("event_type", tracing::field::display(&event.event_type));

    let outcome = match event.into_trigger() {
        Ok(trigger) => process_trigger(&*state.store, trigger).await,
        Err(PipelineError::Validation(msg)) => {
            tracing::warn!("skipping event with invalid data: {msg}");
            EventOutcome::InvalidData
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(outcome = outcome.as_str(), "webhook handled");
    Ok(Json(serde_json::json!({ "received": true })))
}

/// Any other method on the webhook path. Health probes hit this, so it
/// acknowledges instead of erroring.
pub async fn non_post_ack() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
