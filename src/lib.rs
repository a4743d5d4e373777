pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    adapters::stripe::{
        signature::WebhookVerifier,
        webhook::{non_post_ack, wh_handler},
    },
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    domain::store::OrderStore,
    std::{sync::Arc, time::Duration},
    tower::ServiceBuilder,
    tower_http::timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub verifier: WebhookVerifier,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook", post(wh_handler).fallback(non_post_ack))
        .layer(
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(request_timeout))
                // 64 KB, Stripe events are typically <20 KB
                .layer(DefaultBodyLimit::max(64 * 1024)),
        )
        .with_state(state)
}
