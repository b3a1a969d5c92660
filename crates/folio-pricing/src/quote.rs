//! Price Quotes
//!
//! Computes volume-discounted, VAT-inclusive subscription prices.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Base price per portfolio per semester, CHF excl. tax
pub const BASE_PRICE_PER_PORTFOLIO_PER_SEMESTER: Decimal = dec!(180);

/// Swiss VAT rate applied to all subscriptions
pub const TAX_RATE: Decimal = dec!(0.081);

/// Additional multiplicative discount for annual billing
pub const ANNUAL_EXTRA_DISCOUNT: Decimal = dec!(0.10);

/// Smallest supported portfolio count
pub const MIN_PORTFOLIOS: u8 = 1;

/// Largest supported portfolio count
pub const MAX_PORTFOLIOS: u8 = 4;

/// Currency precision in decimal places (CHF minor unit = rappen)
const CURRENCY_DP: u32 = 2;

/// Subscription billing period
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Biannual,
    Annual,
}

impl BillingPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Biannual => "biannual",
            Self::Annual => "annual",
        }
    }

    /// All supported periods, for validation messages and tests
    pub const ALL: [Self; 3] = [Self::Monthly, Self::Biannual, Self::Annual];
}

impl std::str::FromStr for BillingPeriod {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "biannual" => Ok(Self::Biannual),
            "annual" => Ok(Self::Annual),
            other => Err(PricingError::UnknownBillingPeriod(other.to_string())),
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully computed price quote
///
/// Created per request, never persisted. All decimal amounts are rounded to
/// currency precision; `unit_amount_minor` is the integer amount in rappen
/// passed to the payment provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Number of portfolios (1-4)
    pub portfolio_count: u8,

    /// Billing period the quote covers
    pub billing_period: BillingPeriod,

    /// Base price per portfolio per semester, excl. tax
    pub unit_base_price: Decimal,

    /// Volume discount rate keyed by portfolio count
    pub volume_discount_rate: Decimal,

    /// Extra discount rate, non-zero only for annual billing
    pub annual_discount_rate: Decimal,

    /// Tax rate applied to the discounted subtotal
    pub tax_rate: Decimal,

    /// Undiscounted excl.-tax amount (the externally visible "original" price)
    pub gross_excl_tax: Decimal,

    /// Discounted excl.-tax subtotal
    pub amount_excl_tax: Decimal,

    /// Tax on the rounded subtotal
    pub tax_amount: Decimal,

    /// Final amount incl. tax
    pub amount_incl_tax: Decimal,

    /// `amount_incl_tax` in minor units (rappen), for provider API calls
    pub unit_amount_minor: i64,
}

/// Volume discount rate for a portfolio count
///
/// Unknown counts fall back to no discount; `quote` rejects them before this
/// matters.
pub fn volume_discount_rate(portfolio_count: u8) -> Decimal {
    match portfolio_count {
        2 => dec!(0.10),
        3 => dec!(0.20),
        4 => dec!(0.30),
        _ => Decimal::ZERO,
    }
}

/// Compute the quote for a (portfolio count, billing period) pair
///
/// Discounts are applied to the unrounded subtotal: volume discount first,
/// then the annual discount for annual billing. The subtotal is rounded once
/// to currency precision before tax is computed on it.
pub fn quote(portfolio_count: u8, billing_period: BillingPeriod) -> Result<PriceQuote> {
    if !(MIN_PORTFOLIOS..=MAX_PORTFOLIOS).contains(&portfolio_count) {
        return Err(PricingError::PortfolioCountOutOfRange(portfolio_count));
    }

    let base = BASE_PRICE_PER_PORTFOLIO_PER_SEMESTER;
    let count = Decimal::from(portfolio_count);
    let gross = match billing_period {
        BillingPeriod::Monthly => base * count / dec!(6),
        BillingPeriod::Biannual => base * count,
        BillingPeriod::Annual => base * count * dec!(2),
    };

    let volume_rate = volume_discount_rate(portfolio_count);
    let annual_rate = if billing_period == BillingPeriod::Annual {
        ANNUAL_EXTRA_DISCOUNT
    } else {
        Decimal::ZERO
    };

    let net = gross * (Decimal::ONE - volume_rate) * (Decimal::ONE - annual_rate);

    let gross_excl_tax = round_currency(gross);
    let amount_excl_tax = round_currency(net);
    let tax_amount = round_currency(amount_excl_tax * TAX_RATE);
    let amount_incl_tax = round_currency(amount_excl_tax + tax_amount);

    let unit_amount_minor = (amount_incl_tax * dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::AmountOverflow)?;

    Ok(PriceQuote {
        portfolio_count,
        billing_period,
        unit_base_price: base,
        volume_discount_rate: volume_rate,
        annual_discount_rate: annual_rate,
        tax_rate: TAX_RATE,
        gross_excl_tax,
        amount_excl_tax,
        tax_amount,
        amount_incl_tax,
        unit_amount_minor,
    })
}

/// Stable provider lookup key for a (portfolio count, billing period) pair
///
/// Repeated requests for the same pair derive the same key, so remote price
/// resolution stays idempotent. The `incl_tax` marker records that created
/// prices embed the taxed total.
pub fn lookup_key(portfolio_count: u8, billing_period: BillingPeriod) -> String {
    format!("openfolio_{}_{}_portfolios_incl_tax", billing_period.as_str(), portfolio_count)
}

fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_portfolio_biannual() {
        let q = quote(1, BillingPeriod::Biannual).unwrap();
        assert_eq!(q.gross_excl_tax, dec!(180.00));
        assert_eq!(q.amount_excl_tax, dec!(180.00));
        assert_eq!(q.tax_amount, dec!(14.58));
        assert_eq!(q.amount_incl_tax, dec!(194.58));
        assert_eq!(q.unit_amount_minor, 19458);
    }

    #[test]
    fn test_four_portfolios_annual() {
        let q = quote(4, BillingPeriod::Annual).unwrap();
        assert_eq!(q.gross_excl_tax, dec!(1440.00));
        // 30% volume discount, then an extra 10% for annual billing
        assert_eq!(q.amount_excl_tax, dec!(907.20));
        assert_eq!(q.tax_amount, dec!(73.48));
        assert_eq!(q.amount_incl_tax, dec!(980.68));
        assert_eq!(q.unit_amount_minor, 98068);
    }

    #[test]
    fn test_three_portfolios_monthly() {
        let q = quote(3, BillingPeriod::Monthly).unwrap();
        assert_eq!(q.gross_excl_tax, dec!(90.00)); // 180 * 3 / 6
        assert_eq!(q.amount_excl_tax, dec!(72.00));
        assert_eq!(q.tax_amount, dec!(5.83));
        assert_eq!(q.amount_incl_tax, dec!(77.83));
    }

    #[test]
    fn test_two_portfolios_annual() {
        let q = quote(2, BillingPeriod::Annual).unwrap();
        assert_eq!(q.gross_excl_tax, dec!(720.00));
        assert_eq!(q.amount_excl_tax, dec!(583.20));
        assert_eq!(q.tax_amount, dec!(47.24));
        assert_eq!(q.amount_incl_tax, dec!(630.44));
    }

    #[test]
    fn test_quotes_are_deterministic() {
        for count in MIN_PORTFOLIOS..=MAX_PORTFOLIOS {
            for period in BillingPeriod::ALL {
                let first = quote(count, period).unwrap();
                let second = quote(count, period).unwrap();
                assert_eq!(first, second);
                assert_eq!(
                    first.amount_incl_tax,
                    first.amount_excl_tax + first.tax_amount
                );
            }
        }
    }

    #[test]
    fn test_portfolio_count_out_of_range() {
        assert_eq!(
            quote(0, BillingPeriod::Monthly),
            Err(PricingError::PortfolioCountOutOfRange(0))
        );
        assert_eq!(
            quote(5, BillingPeriod::Annual),
            Err(PricingError::PortfolioCountOutOfRange(5))
        );
    }

    #[test]
    fn test_billing_period_parsing() {
        assert_eq!("monthly".parse::<BillingPeriod>().unwrap(), BillingPeriod::Monthly);
        assert_eq!("BIANNUAL".parse::<BillingPeriod>().unwrap(), BillingPeriod::Biannual);
        assert_eq!(" annual ".parse::<BillingPeriod>().unwrap(), BillingPeriod::Annual);
        assert!(matches!(
            "quarterly".parse::<BillingPeriod>(),
            Err(PricingError::UnknownBillingPeriod(_))
        ));
    }

    #[test]
    fn test_lookup_key_is_stable() {
        let key = lookup_key(2, BillingPeriod::Annual);
        assert_eq!(key, "openfolio_annual_2_portfolios_incl_tax");
        assert_eq!(key, lookup_key(2, BillingPeriod::Annual));
        assert_ne!(key, lookup_key(3, BillingPeriod::Annual));
        assert_ne!(key, lookup_key(2, BillingPeriod::Monthly));
    }
}
