//! Payment Gateway Abstraction
//!
//! Provider-neutral capability trait over the external payment processor.
//! The orchestrator only talks to this trait; the Stripe implementation and
//! the in-memory mock both live behind it.

use std::collections::HashMap;

use async_trait::async_trait;

use folio_pricing::BillingPeriod;

use crate::error::Result;

/// Reference to a customer record in the external payment system
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerRef {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Reference to a remote price object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceRef {
    pub id: String,
    pub lookup_key: Option<String>,
    /// Amount in currency minor units (rappen)
    pub unit_amount_minor: i64,
    pub currency: String,
    pub active: bool,
    pub recurring: bool,
}

/// Status of a payment authorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentState {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Other(String),
}

impl PaymentState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a payment authorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntentRef {
    pub id: String,
    /// Secret the browser uses to confirm the authorization
    pub client_secret: Option<String>,
    pub status: PaymentState,
    pub payment_method_id: Option<String>,
}

/// Externally-visible subscription status
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Incomplete,
    Active,
    PastDue,
    Canceled,
    Other(String),
}

impl SubscriptionState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a subscription object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionRef {
    pub id: String,
    pub status: SubscriptionState,
    pub cancel_at_period_end: bool,
    /// End of the current billing period, unix seconds
    pub current_period_end: Option<i64>,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub latest_invoice_id: Option<String>,
    /// Client secret of the auto-generated payment authorization, present
    /// when the subscription was created in the default-incomplete flow
    pub client_secret: Option<String>,
    /// Portfolio names recorded in subscription metadata
    pub portfolios: Option<String>,
}

/// Reference to an invoice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceRef {
    pub id: String,
    pub status: Option<String>,
    pub payment_intent_id: Option<String>,
}

impl InvoiceRef {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("paid")
    }
}

/// Reference to a hosted checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionRef {
    pub id: String,
    pub url: String,
}

/// Parameters for creating a remote price object
#[derive(Clone, Debug)]
pub struct NewPrice {
    /// Stable lookup key derived from (count, period); makes creation idempotent
    pub lookup_key: String,
    pub unit_amount_minor: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub product_name: String,
    pub metadata: HashMap<String, String>,
}

/// Parameters for creating a stand-alone payment authorization
#[derive(Clone, Debug)]
pub struct NewPaymentIntent {
    pub customer_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

/// Parameters for creating an incomplete subscription
#[derive(Clone, Debug)]
pub struct NewSubscription {
    pub customer_id: String,
    pub price_id: String,
    pub metadata: HashMap<String, String>,
}

/// Parameters for creating a hosted checkout session
#[derive(Clone, Debug)]
pub struct NewCheckoutSession {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

/// Payment gateway trait
///
/// One method per outbound provider operation the orchestrator needs. Every
/// method surfaces failures as [`crate::PaymentError`], never as a raw SDK
/// error. Calls are synchronous from the caller's perspective and are never
/// retried here; idempotency relies on provider-side lookup keys and
/// email-based customer dedup.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Look up a customer by email, returning at most one match
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRef>>;

    /// Create a customer record
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<CustomerRef>;

    /// Update a customer's display name
    async fn rename_customer(&self, customer_id: &str, name: &str) -> Result<CustomerRef>;

    /// Set the customer's default payment method for invoices
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()>;

    /// Find an active price by its lookup key
    async fn find_price_by_lookup_key(&self, lookup_key: &str) -> Result<Option<PriceRef>>;

    /// Create a remote price object
    async fn create_price(&self, spec: &NewPrice) -> Result<PriceRef>;

    /// Retrieve a price by id
    async fn retrieve_price(&self, price_id: &str) -> Result<PriceRef>;

    /// Create a stand-alone payment authorization
    async fn create_payment_intent(&self, spec: &NewPaymentIntent) -> Result<PaymentIntentRef>;

    /// Retrieve a payment authorization by id
    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentRef>;

    /// Create a subscription in the incomplete state, letting the provider
    /// generate the linked payment authorization
    async fn create_incomplete_subscription(
        &self,
        spec: &NewSubscription,
    ) -> Result<SubscriptionRef>;

    /// Retrieve a subscription by id
    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<SubscriptionRef>;

    /// Mark a subscription to cancel at the end of the current billing period
    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<SubscriptionRef>;

    /// List subscriptions, optionally scoped to one customer
    async fn list_subscriptions(
        &self,
        customer_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<SubscriptionRef>>;

    /// Retrieve an invoice by id
    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<InvoiceRef>;

    /// Pay an invoice with an explicit payment method
    async fn pay_invoice(&self, invoice_id: &str, payment_method_id: &str) -> Result<InvoiceRef>;

    /// Attach a payment method to a customer
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<()>;

    /// Create a hosted checkout session
    async fn create_checkout_session(
        &self,
        spec: &NewCheckoutSession,
    ) -> Result<CheckoutSessionRef>;
}
