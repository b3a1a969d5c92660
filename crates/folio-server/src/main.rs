//! OpenFolio HTTP Server
//!
//! Axum-based server for the subscription checkout API and the static
//! marketing/legal pages. All durable state lives in the external payment
//! provider; the server is a thin, validated caller of it.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_payments::{CheckoutOrchestrator, StripeGateway};

use crate::config::ServerConfig;
use crate::handlers::router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    // Initialize payments; without a credential every payment endpoint
    // returns a configuration error instead of attempting a call
    let checkout = config.stripe_secret_key.as_deref().map(|key| {
        Arc::new(CheckoutOrchestrator::new(
            Arc::new(StripeGateway::new(key)),
            config.checkout.clone(),
        ))
    });

    if checkout.is_some() {
        tracing::info!("✓ Stripe configured");
    } else {
        tracing::warn!("⚠ Stripe not configured - payment endpoints disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
    }

    let state = AppState { checkout };
    let app = router(state, &config.static_dir);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 OpenFolio server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  POST /create-subscription     - Incomplete subscription + client secret");
    tracing::info!("  POST /create-payment-intent   - Stand-alone payment intent");
    tracing::info!("  POST /verify-subscription     - Reconcile after payment");
    tracing::info!("  POST /cancel-subscription     - Cancel at period end");
    tracing::info!("  GET  /list-subscriptions      - List subscriptions");
    tracing::info!("  POST /create-checkout-session - Hosted checkout redirect");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
