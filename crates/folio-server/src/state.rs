//! Application State

use std::sync::Arc;

use folio_payments::CheckoutOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout orchestrator (None if Stripe is not configured)
    pub checkout: Option<Arc<CheckoutOrchestrator>>,
}
