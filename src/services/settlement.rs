use {
    crate::domain::{
        error::PipelineError,
        order::{EventOutcome, Order, OrderLookup, SettleResult, SettlementRequest, WebhookTrigger},
        store::{OrderStore, SettleError, SettleWrite},
    },
    chrono::Utc,
};

/// Walk the lookups in order and return the first order found.
pub async fn resolve_order(
    store: &dyn OrderStore,
    lookups: &[OrderLookup],
) -> Result<Option<Order>, PipelineError> {
    for lookup in lookups {
        if let Some(order) = store.find_order(lookup).await? {
            tracing::debug!(%lookup, order_id = %order.id, "order resolved");
            return Ok(Some(order));
        }
    }
    Ok(None)
}

/// Move the resolved order to `paid` and credit its owner, at most once.
///
/// Only lookup failures are returned as errors. Write failures are logged
/// here with the order id and the failed step and reported through
/// `SettleResult`, since the processor must not be asked to retry a
/// half-applied settlement.
pub async fn settle_order(
    store: &dyn OrderStore,
    request: &SettlementRequest,
) -> Result<SettleResult, PipelineError> {
    let Some(order) = resolve_order(store, &request.lookups).await? else {
        tracing::warn!(
            lookups = ?request.lookups,
            "no order matches payment confirmation, ignoring"
        );
        return Ok(SettleResult::OrderNotFound);
    };

    if order.status.is_paid() {
        tracing::info!(order_id = %order.id, "order already paid, nothing to do");
        return Ok(SettleResult::AlreadyPaid(order.id));
    }

    let settlement = order.settlement(request.refs.clone(), Utc::now());

    match store.settle(&settlement).await {
        Ok(SettleWrite::Applied) => {
            tracing::info!(
                order_id = %order.id,
                user_id = %order.user_id,
                hours = %order.hours,
                amount_cents = %order.amount,
                operation_id = %settlement.credit.id,
                "order paid, balance credited"
            );
            Ok(SettleResult::Settled {
                order_id: order.id,
                operation_id: settlement.credit.id,
            })
        }
        // Another delivery got there between our read and the conditional write.
        Ok(SettleWrite::AlreadyPaid) => {
            tracing::info!(order_id = %order.id, "order paid concurrently, nothing to do");
            Ok(SettleResult::AlreadyPaid(order.id))
        }
        Ok(SettleWrite::Missing) => {
            tracing::warn!(
                order_id = %order.id,
                "order vanished before settlement, nothing written"
            );
            Ok(SettleResult::OrderNotFound)
        }
        Err(SettleError::StatusUpdate(e)) => {
            tracing::error!(
                order_id = %order.id,
                step = "status_update",
                error = %e,
                "failed to mark order paid, no credit written"
            );
            Ok(SettleResult::StatusUpdateFailed(order.id))
        }
        Err(SettleError::Ledger {
            source,
            order_left_paid,
        }) => {
            if order_left_paid {
                tracing::error!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    hours = %order.hours,
                    amount_cents = %order.amount,
                    step = "balance_credit",
                    reconciliation_required = true,
                    error = %source,
                    "order marked paid but balance credit failed"
                );
            } else {
                tracing::error!(
                    order_id = %order.id,
                    step = "balance_credit",
                    error = %source,
                    "balance credit failed, settlement rolled back"
                );
            }
            Ok(SettleResult::LedgerFailed {
                order_id: order.id,
                order_left_paid,
            })
        }
    }
}

/// Act on a verified event. Never fails: every internal error is logged and
/// folded into the outcome.
pub async fn process_trigger(store: &dyn OrderStore, trigger: WebhookTrigger) -> EventOutcome {
    match trigger {
        WebhookTrigger::Settle(request) => match settle_order(store, &request).await {
            Ok(result) => EventOutcome::Settlement(result),
            Err(e) => {
                tracing::error!(
                    lookups = ?request.lookups,
                    step = "lookup",
                    error = %e,
                    "failed to look up order"
                );
                EventOutcome::Settlement(SettleResult::LookupFailed)
            }
        },
        WebhookTrigger::Skip { reason } => {
            tracing::info!(%reason, "event does not confirm a payment, skipped");
            EventOutcome::Skipped
        }
        WebhookTrigger::Ignore { event_type } => {
            tracing::debug!(%event_type, "unhandled event type, ignored");
            EventOutcome::Ignored
        }
    }
}
