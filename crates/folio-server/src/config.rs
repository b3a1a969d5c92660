//! Server Configuration
//!
//! Read once from the environment at startup; the Stripe credential travels
//! as an explicit `Option` into application state, never as process-global
//! mutable state.

use std::path::PathBuf;

use folio_payments::CheckoutConfig;

/// Configuration assembled from the process environment
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address, `BIND_ADDR`
    pub bind_addr: String,

    /// Stripe API credential, `STRIPE_SECRET_KEY`; `None` disables every
    /// payment endpoint without attempting a provider call
    pub stripe_secret_key: Option<String>,

    /// Directory holding the static document pages, `STATIC_DIR`
    pub static_dir: PathBuf,

    /// Checkout behavior passed to the orchestrator
    pub checkout: CheckoutConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let mut checkout = CheckoutConfig::default();
        if let Ok(url) = std::env::var("CHECKOUT_SUCCESS_URL") {
            checkout.success_url = url;
        }
        if let Ok(url) = std::env::var("CHECKOUT_CANCEL_URL") {
            checkout.cancel_url = url;
        }

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4242".into()),
            stripe_secret_key,
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".into())
                .into(),
            checkout,
        }
    }
}
