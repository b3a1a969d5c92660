//! # folio-pricing
//!
//! Deterministic pricing engine for OpenFolio portfolio subscriptions.
//!
//! Pure computation only: given a portfolio count and a billing period, the
//! engine produces a [`PriceQuote`] with volume and annual discounts applied
//! and Swiss VAT added. No network calls, no side effects. The quote carries
//! the minor-unit amount used for payment provider calls and the stable
//! lookup key used to resolve the matching remote price object.
//!
//! Rounding is two-stage: the excl.-tax subtotal is rounded to currency
//! precision first, then the tax computed on that rounded subtotal is rounded
//! again. Both stages use round-half-up. Externally quoted totals depend on
//! this exact order.

mod error;
mod quote;

pub use error::{PricingError, Result};
pub use quote::{
    ANNUAL_EXTRA_DISCOUNT, BASE_PRICE_PER_PORTFOLIO_PER_SEMESTER, BillingPeriod, MAX_PORTFOLIOS,
    MIN_PORTFOLIOS, PriceQuote, TAX_RATE, lookup_key, quote, volume_discount_rate,
};
