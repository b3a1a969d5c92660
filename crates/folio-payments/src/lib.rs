//! # folio-payments
//!
//! Payment gateway abstraction and checkout orchestration for OpenFolio
//! subscriptions.
//!
//! All state of record (customers, prices, subscriptions, invoices) lives in
//! the external payment provider; this crate owns only the orchestration
//! that drives it:
//!
//! - [`PaymentGateway`]: provider-neutral capability trait covering the
//!   outbound operations the flows need. [`StripeGateway`] implements it
//!   over the Stripe API; [`MockGateway`] is the in-memory test double.
//! - [`CheckoutOrchestrator`]: sequences gateway calls for the supported
//!   flows (default-incomplete subscription, direct payment intent,
//!   post-payment verification, hosted redirect, cancellation, listing)
//!   while keeping price and customer resolution idempotent.
//! - [`PaymentError`]: the typed error union every provider failure is
//!   mapped into at the gateway seam.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio_payments::{
//!     CheckoutConfig, CheckoutOrchestrator, CheckoutRequest, PriceSelection, StripeGateway,
//! };
//! use folio_pricing::BillingPeriod;
//!
//! let gateway = Arc::new(StripeGateway::new("sk_test_xxx"));
//! let orchestrator = CheckoutOrchestrator::new(gateway, CheckoutConfig::default());
//!
//! let checkout = orchestrator.start_subscription(&CheckoutRequest {
//!     email: "user@example.ch".into(),
//!     name: "User Example".into(),
//!     selection: PriceSelection::Quoted {
//!         portfolio_count: 2,
//!         billing_period: BillingPeriod::Annual,
//!     },
//!     portfolios: vec![],
//! }).await?;
//!
//! // Hand checkout.client_secret to the browser for confirmation.
//! ```

mod checkout;
mod error;
mod gateway;
mod mock;
mod stripe;

pub use checkout::{
    CanceledSubscription, CheckoutConfig, CheckoutOrchestrator, CheckoutRequest, HostedCheckout,
    PaymentIntentCheckout, PriceSelection, SubscriptionCheckout, SubscriptionSummary,
    VerifiedSubscription,
};
pub use error::{PaymentError, Result};
pub use gateway::{
    CheckoutSessionRef, CustomerRef, InvoiceRef, NewCheckoutSession, NewPaymentIntent, NewPrice,
    NewSubscription, PaymentGateway, PaymentIntentRef, PaymentState, PriceRef, SubscriptionRef,
    SubscriptionState,
};
pub use mock::MockGateway;
pub use self::stripe::StripeGateway;
