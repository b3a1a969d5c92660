//! Pricing Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PricingError>;

/// Errors produced while computing a price quote
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Portfolio count outside the supported 1-4 range
    #[error("portfolio count {0} is outside the supported range 1-4")]
    PortfolioCountOutOfRange(u8),

    /// Billing period string not recognized
    #[error("unknown billing period: {0:?} (expected monthly, biannual or annual)")]
    UnknownBillingPeriod(String),

    /// Computed total does not fit a minor-unit integer
    #[error("computed amount does not fit a minor-unit integer")]
    AmountOverflow,
}
