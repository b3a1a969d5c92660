//! Checkout Orchestration
//!
//! Sequences gateway calls to turn a validated checkout request into a
//! payment-confirmation handle or a hosted redirect URL, without ever
//! charging a customer twice for the same logical subscription attempt.
//! Idempotency comes from provider-side lookup keys (prices) and
//! email-based dedup (customers); nothing here retries or locks.

use std::collections::HashMap;
use std::sync::Arc;

use folio_pricing::{BillingPeriod, lookup_key, quote};

use crate::error::{PaymentError, Result};
use crate::gateway::{
    CustomerRef, NewCheckoutSession, NewPaymentIntent, NewPrice, NewSubscription, PaymentGateway,
    PriceRef, SubscriptionRef, SubscriptionState,
};

/// How many subscriptions an unscoped list returns
const DEFAULT_LIST_LIMIT: u64 = 10;

/// Checkout behavior knobs, passed to the orchestrator at construction
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Product name used for remote price objects
    pub product_name: String,
    /// Lowercase ISO currency code
    pub currency: String,
    /// Redirect target after a completed hosted checkout
    pub success_url: String,
    /// Redirect target after an abandoned hosted checkout
    pub cancel_url: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            product_name: "OpenFolio".into(),
            currency: "chf".into(),
            success_url: "http://localhost:4242/payment?checkout=success".into(),
            cancel_url: "http://localhost:4242/payment?checkout=cancelled".into(),
        }
    }
}

/// Which price the caller wants
#[derive(Clone, Debug)]
pub enum PriceSelection {
    /// An explicit remote price id; must be active and recurring
    Existing(String),
    /// A (count, period) pair quoted by the pricing engine
    Quoted {
        portfolio_count: u8,
        billing_period: BillingPeriod,
    },
}

/// A validated-enough inbound checkout request
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    pub email: String,
    pub name: String,
    pub selection: PriceSelection,
    /// Selected portfolio names, recorded as provider metadata
    pub portfolios: Vec<String>,
}

/// Result of the default-incomplete subscription flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionCheckout {
    pub subscription_id: String,
    pub client_secret: Option<String>,
    pub customer_id: String,
    pub price_id: String,
}

/// Result of the direct-intent flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntentCheckout {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub customer_id: String,
    pub price_id: String,
}

/// Provider-observed state after reconciliation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSubscription {
    pub subscription_id: String,
    pub status: SubscriptionState,
    pub customer_id: String,
}

/// Provider-observed state after a cancel-at-period-end request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanceledSubscription {
    pub subscription_id: String,
    pub status: SubscriptionState,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
}

/// Result of the hosted-redirect flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedCheckout {
    pub url: String,
    pub session_id: String,
}

/// One row of a subscription listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionSummary {
    pub id: String,
    pub status: SubscriptionState,
    pub current_period_end: Option<i64>,
    pub portfolios: String,
    pub customer_email: String,
}

/// Drives the external payment capability through the supported flows
pub struct CheckoutOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl CheckoutOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: CheckoutConfig) -> Self {
        Self { gateway, config }
    }

    /// Default-incomplete flow: create the subscription up front so the
    /// provider generates the linked payment authorization, and hand its
    /// client secret back for browser-side confirmation.
    pub async fn start_subscription(&self, request: &CheckoutRequest) -> Result<SubscriptionCheckout> {
        validate_request(request)?;

        let price = self.resolve_price(&request.selection).await?;
        let customer = self.resolve_customer(&request.email, &request.name, &request.portfolios).await?;

        let subscription = self
            .gateway
            .create_incomplete_subscription(&NewSubscription {
                customer_id: customer.id.clone(),
                price_id: price.id.clone(),
                metadata: request_metadata(request, None),
            })
            .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            customer_id = %customer.id,
            price_id = %price.id,
            "Created incomplete subscription"
        );

        Ok(SubscriptionCheckout {
            subscription_id: subscription.id,
            client_secret: subscription.client_secret,
            customer_id: customer.id,
            price_id: price.id,
        })
    }

    /// Direct-intent flow: a stand-alone payment authorization for the
    /// quoted amount; subscription creation is deferred until the caller
    /// reports the authorization succeeded.
    pub async fn start_payment_intent(&self, request: &CheckoutRequest) -> Result<PaymentIntentCheckout> {
        validate_request(request)?;

        let price = self.resolve_price(&request.selection).await?;
        let customer = self.resolve_customer(&request.email, &request.name, &request.portfolios).await?;

        let intent = self
            .gateway
            .create_payment_intent(&NewPaymentIntent {
                customer_id: customer.id.clone(),
                amount_minor: price.unit_amount_minor,
                currency: self.config.currency.clone(),
                metadata: request_metadata(request, Some(&price.id)),
            })
            .await?;

        tracing::info!(
            payment_intent_id = %intent.id,
            customer_id = %customer.id,
            price_id = %price.id,
            amount_minor = price.unit_amount_minor,
            "Created payment intent"
        );

        Ok(PaymentIntentCheckout {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            customer_id: customer.id,
            price_id: price.id,
        })
    }

    /// Post-payment attach flow plus reconciliation: when the caller
    /// reports a succeeded authorization, attach its payment method, make
    /// it the customer default, pay the first invoice with it, then report
    /// whatever status the provider shows. A subscription that is not yet
    /// `active` is expected (asynchronous settlement) and is not an error.
    pub async fn verify_subscription(
        &self,
        subscription_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<VerifiedSubscription> {
        if subscription_id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "missing required field: subscriptionId".into(),
            ));
        }

        let subscription = self.gateway.retrieve_subscription(subscription_id).await?;

        if let Some(intent_id) = payment_intent_id {
            let intent = self.gateway.retrieve_payment_intent(intent_id).await?;
            if intent.status.is_succeeded() {
                match intent.payment_method_id.as_deref() {
                    Some(payment_method_id) => {
                        self.settle_with_payment_method(&subscription, payment_method_id).await;
                    }
                    None => tracing::warn!(
                        payment_intent_id = %intent.id,
                        "Succeeded payment intent carries no payment method"
                    ),
                }
            } else {
                tracing::info!(
                    payment_intent_id = %intent.id,
                    status = %intent.status,
                    "Payment not settled yet"
                );
            }
        }

        let refreshed = self.gateway.retrieve_subscription(subscription_id).await?;
        if !refreshed.status.is_active() {
            tracing::info!(
                subscription_id = %refreshed.id,
                status = %refreshed.status,
                "Subscription not active yet"
            );
        }

        Ok(VerifiedSubscription {
            subscription_id: refreshed.id,
            status: refreshed.status,
            customer_id: refreshed.customer_id,
        })
    }

    /// Hosted-redirect flow: bind a checkout session to the resolved price
    /// and customer and return its redirect URL. The provider handles
    /// authorization and activation entirely off-box.
    pub async fn hosted_checkout(&self, request: &CheckoutRequest) -> Result<HostedCheckout> {
        validate_request(request)?;

        let price = self.resolve_price(&request.selection).await?;
        let customer = self.resolve_customer(&request.email, &request.name, &request.portfolios).await?;

        let session = self
            .gateway
            .create_checkout_session(&NewCheckoutSession {
                customer_id: customer.id.clone(),
                price_id: price.id.clone(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
                metadata: request_metadata(request, Some(&price.id)),
            })
            .await?;

        tracing::info!(
            session_id = %session.id,
            customer_id = %customer.id,
            price_id = %price.id,
            "Created hosted checkout session"
        );

        Ok(HostedCheckout {
            url: session.url,
            session_id: session.id,
        })
    }

    /// Mark a subscription to cancel at the end of the current billing
    /// period. The returned status is the provider's, not an assumed value.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<CanceledSubscription> {
        if subscription_id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "missing required field: subscriptionId".into(),
            ));
        }

        let subscription = self.gateway.cancel_at_period_end(subscription_id).await?;

        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Subscription set to cancel at period end"
        );

        Ok(CanceledSubscription {
            subscription_id: subscription.id,
            status: subscription.status,
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end: subscription.current_period_end,
        })
    }

    /// List subscriptions, scoped to a customer when an email is given.
    /// An unknown email yields an empty list, not an error.
    pub async fn list_subscriptions(&self, email: Option<&str>) -> Result<Vec<SubscriptionSummary>> {
        let subscriptions = match email {
            Some(email) => match self.gateway.find_customer_by_email(email).await? {
                Some(customer) => {
                    self.gateway
                        .list_subscriptions(Some(&customer.id), DEFAULT_LIST_LIMIT)
                        .await?
                }
                None => Vec::new(),
            },
            None => self.gateway.list_subscriptions(None, DEFAULT_LIST_LIMIT).await?,
        };

        Ok(subscriptions.into_iter().map(summary_row).collect())
    }

    /// Resolve the remote price for a selection.
    ///
    /// An explicit id is retrieved and checked; a quoted pair is priced by
    /// the engine and resolved find-then-create by lookup key. A create
    /// failure when the key now resolves is the benign concurrent-create
    /// race and is answered with the refetched price.
    pub async fn resolve_price(&self, selection: &PriceSelection) -> Result<PriceRef> {
        match selection {
            PriceSelection::Existing(price_id) => {
                let price = self.gateway.retrieve_price(price_id).await?;
                if !price.active || !price.recurring {
                    return Err(PaymentError::InvalidPrice(format!(
                        "price {price_id} is not an active recurring price"
                    )));
                }
                Ok(price)
            }
            PriceSelection::Quoted {
                portfolio_count,
                billing_period,
            } => {
                let quote = quote(*portfolio_count, *billing_period)
                    .map_err(|e| PaymentError::Validation(e.to_string()))?;
                let key = lookup_key(*portfolio_count, *billing_period);

                if let Some(price) = self.gateway.find_price_by_lookup_key(&key).await? {
                    return Ok(price);
                }

                let spec = NewPrice {
                    lookup_key: key.clone(),
                    unit_amount_minor: quote.unit_amount_minor,
                    currency: self.config.currency.clone(),
                    billing_period: *billing_period,
                    product_name: format!(
                        "{} subscription ({} portfolios, {})",
                        self.config.product_name, portfolio_count, billing_period
                    ),
                    metadata: HashMap::from([
                        ("portfolio_count".into(), portfolio_count.to_string()),
                        ("billing_period".into(), billing_period.to_string()),
                    ]),
                };

                match self.gateway.create_price(&spec).await {
                    Ok(price) => Ok(price),
                    Err(err) => match self.gateway.find_price_by_lookup_key(&key).await? {
                        Some(price) => {
                            tracing::debug!(
                                lookup_key = %key,
                                "Price created concurrently, reusing"
                            );
                            Ok(price)
                        }
                        None => Err(err),
                    },
                }
            }
        }
    }

    /// Resolve the customer record for an email, reusing an existing one
    /// and updating its display name on mismatch. Never creates two
    /// customers for the same email within one logical run.
    pub async fn resolve_customer(
        &self,
        email: &str,
        name: &str,
        portfolios: &[String],
    ) -> Result<CustomerRef> {
        match self.gateway.find_customer_by_email(email).await? {
            Some(customer) => {
                if customer.name.as_deref() != Some(name) {
                    let renamed = self.gateway.rename_customer(&customer.id, name).await?;
                    tracing::debug!(customer_id = %renamed.id, "Updated customer name");
                    Ok(renamed)
                } else {
                    Ok(customer)
                }
            }
            None => {
                let metadata = HashMap::from([(
                    "selected_portfolios".to_string(),
                    portfolios_label(portfolios),
                )]);
                self.gateway.create_customer(email, name, metadata).await
            }
        }
    }

    /// Partial failures after the subscription exists are logged, never
    /// surfaced; the response reports provider-observed status.
    async fn settle_with_payment_method(
        &self,
        subscription: &SubscriptionRef,
        payment_method_id: &str,
    ) {
        if let Err(err) = self
            .gateway
            .attach_payment_method(payment_method_id, &subscription.customer_id)
            .await
        {
            tracing::warn!(
                error = %err,
                customer_id = %subscription.customer_id,
                "Payment method attach failed"
            );
        }

        if let Err(err) = self
            .gateway
            .set_default_payment_method(&subscription.customer_id, payment_method_id)
            .await
        {
            tracing::warn!(
                error = %err,
                customer_id = %subscription.customer_id,
                "Setting default payment method failed"
            );
        }

        let Some(invoice_id) = subscription.latest_invoice_id.as_deref() else {
            tracing::warn!(
                subscription_id = %subscription.id,
                "Subscription has no invoice to pay"
            );
            return;
        };

        match self.gateway.retrieve_invoice(invoice_id).await {
            Ok(invoice) if invoice.is_paid() => {
                tracing::debug!(invoice_id = %invoice.id, "Invoice already paid");
            }
            Ok(invoice) => {
                if let Err(err) = self.gateway.pay_invoice(&invoice.id, payment_method_id).await {
                    tracing::warn!(
                        error = %err,
                        invoice_id = %invoice.id,
                        "Paying initial invoice failed"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    invoice_id = %invoice_id,
                    "Fetching initial invoice failed"
                );
            }
        }
    }
}

fn validate_request(request: &CheckoutRequest) -> Result<()> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(PaymentError::Validation(
            "a valid email address is required".into(),
        ));
    }
    if request.name.trim().is_empty() {
        return Err(PaymentError::Validation("missing required field: name".into()));
    }
    if let PriceSelection::Existing(price_id) = &request.selection {
        if price_id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "missing required field: priceId".into(),
            ));
        }
    }
    Ok(())
}

fn portfolios_label(portfolios: &[String]) -> String {
    if portfolios.is_empty() {
        "N/A".into()
    } else {
        portfolios.join(", ")
    }
}

fn request_metadata(request: &CheckoutRequest, price_id: Option<&str>) -> HashMap<String, String> {
    let portfolio_count = match &request.selection {
        PriceSelection::Quoted { portfolio_count, .. } => usize::from(*portfolio_count),
        PriceSelection::Existing(_) => request.portfolios.len(),
    };

    let mut metadata = HashMap::from([
        ("portfolios".to_string(), portfolios_label(&request.portfolios)),
        ("portfolio_count".to_string(), portfolio_count.to_string()),
    ]);
    if let Some(price_id) = price_id {
        metadata.insert("price_id".to_string(), price_id.to_string());
    }
    metadata
}

fn summary_row(subscription: SubscriptionRef) -> SubscriptionSummary {
    SubscriptionSummary {
        id: subscription.id,
        status: subscription.status,
        current_period_end: subscription.current_period_end,
        portfolios: subscription.portfolios.unwrap_or_else(|| "N/A".into()),
        customer_email: subscription.customer_email.unwrap_or_else(|| "N/A".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGateway;

    fn orchestrator() -> (Arc<MockGateway>, CheckoutOrchestrator) {
        let gateway = Arc::new(MockGateway::new());
        let orchestrator = CheckoutOrchestrator::new(gateway.clone(), CheckoutConfig::default());
        (gateway, orchestrator)
    }

    fn quoted_request(count: u8, period: BillingPeriod) -> CheckoutRequest {
        CheckoutRequest {
            email: "anna@example.ch".into(),
            name: "Anna Meier".into(),
            selection: PriceSelection::Quoted {
                portfolio_count: count,
                billing_period: period,
            },
            portfolios: vec!["Global Equities".into(), "Swiss Bonds".into()],
        }
    }

    #[tokio::test]
    async fn test_start_subscription_returns_confirmation_handle() {
        let (_, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_subscription(&quoted_request(2, BillingPeriod::Annual))
            .await
            .unwrap();

        assert_eq!(checkout.subscription_id, "sub_mock_1");
        assert_eq!(checkout.customer_id, "cus_mock_1");
        assert_eq!(checkout.price_id, "price_mock_1");
        assert!(checkout.client_secret.is_some());
    }

    #[tokio::test]
    async fn test_repeated_quotes_reuse_the_remote_price() {
        let (gateway, orchestrator) = orchestrator();

        let first = orchestrator
            .start_subscription(&quoted_request(3, BillingPeriod::Monthly))
            .await
            .unwrap();
        let second = orchestrator
            .start_subscription(&quoted_request(3, BillingPeriod::Monthly))
            .await
            .unwrap();

        assert_eq!(first.price_id, second.price_id);
        assert_eq!(gateway.price_creates(), 1);
    }

    #[tokio::test]
    async fn test_price_create_conflict_resolves_by_refetch() {
        let (gateway, orchestrator) = orchestrator();
        gateway.induce_price_create_conflict();

        let checkout = orchestrator
            .start_subscription(&quoted_request(1, BillingPeriod::Biannual))
            .await
            .unwrap();

        assert_eq!(checkout.price_id, "price_mock_1");
    }

    #[tokio::test]
    async fn test_customer_reused_and_renamed_once() {
        let (gateway, orchestrator) = orchestrator();

        let mut request = quoted_request(1, BillingPeriod::Biannual);
        orchestrator.start_subscription(&request).await.unwrap();

        request.name = "Anna Meier-Huber".into();
        orchestrator.start_subscription(&request).await.unwrap();
        orchestrator.start_subscription(&request).await.unwrap();

        assert_eq!(gateway.customer_creates(), 1);
        assert_eq!(gateway.customer_renames(), 1);
    }

    #[tokio::test]
    async fn test_explicit_price_must_be_active_and_recurring() {
        let (_, orchestrator) = orchestrator();

        let request = CheckoutRequest {
            selection: PriceSelection::Existing("price_unknown".into()),
            ..quoted_request(1, BillingPeriod::Biannual)
        };
        let err = orchestrator.start_subscription(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn test_start_payment_intent_uses_quoted_amount() {
        let (_, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_payment_intent(&quoted_request(4, BillingPeriod::Annual))
            .await
            .unwrap();

        assert_eq!(checkout.payment_intent_id, "pi_mock_1");
        assert_eq!(checkout.client_secret.as_deref(), Some("pi_mock_1_secret_test"));
    }

    #[tokio::test]
    async fn test_card_decline_is_typed() {
        let (gateway, orchestrator) = orchestrator();
        gateway.decline_card();

        let err = orchestrator
            .start_payment_intent(&quoted_request(1, BillingPeriod::Monthly))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::CardDeclined(_)));
    }

    #[tokio::test]
    async fn test_verify_settles_with_succeeded_intent() {
        let (gateway, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_subscription(&quoted_request(2, BillingPeriod::Annual))
            .await
            .unwrap();
        gateway.mark_intent_succeeded("pi_mock_1", "pm_card_visa");

        let verified = orchestrator
            .verify_subscription(&checkout.subscription_id, Some("pi_mock_1"))
            .await
            .unwrap();

        assert_eq!(verified.status, SubscriptionState::Active);
        assert_eq!(
            gateway.attached(),
            vec![("pm_card_visa".to_string(), checkout.customer_id.clone())]
        );
        assert_eq!(
            gateway.default_payment_methods(),
            vec![(checkout.customer_id, "pm_card_visa".to_string())]
        );
        assert_eq!(gateway.paid_invoices().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_reports_observed_status_when_invoice_pay_fails() {
        let (gateway, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_subscription(&quoted_request(2, BillingPeriod::Annual))
            .await
            .unwrap();
        gateway.mark_intent_succeeded("pi_mock_1", "pm_card_visa");
        gateway.fail_invoice_pay();

        let verified = orchestrator
            .verify_subscription(&checkout.subscription_id, Some("pi_mock_1"))
            .await
            .unwrap();

        // The request still succeeds; the reported status is what the
        // provider shows, not an assumed `active`.
        assert_eq!(verified.status, SubscriptionState::Incomplete);
    }

    #[tokio::test]
    async fn test_verify_without_intent_only_reports() {
        let (gateway, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_subscription(&quoted_request(1, BillingPeriod::Monthly))
            .await
            .unwrap();

        let verified = orchestrator
            .verify_subscription(&checkout.subscription_id, None)
            .await
            .unwrap();

        assert_eq!(verified.status, SubscriptionState::Incomplete);
        assert!(gateway.attached().is_empty());
        assert!(gateway.paid_invoices().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_sets_period_end_flag_only() {
        let (_, orchestrator) = orchestrator();

        let checkout = orchestrator
            .start_subscription(&quoted_request(1, BillingPeriod::Biannual))
            .await
            .unwrap();
        let canceled = orchestrator
            .cancel_subscription(&checkout.subscription_id)
            .await
            .unwrap();

        assert!(canceled.cancel_at_period_end);
        // Status is whatever the provider reports at call time, not a
        // terminal state.
        assert_eq!(canceled.status, SubscriptionState::Incomplete);
        assert!(canceled.current_period_end.is_some());
    }

    #[tokio::test]
    async fn test_hosted_checkout_returns_redirect() {
        let (_, orchestrator) = orchestrator();

        let hosted = orchestrator
            .hosted_checkout(&quoted_request(2, BillingPeriod::Biannual))
            .await
            .unwrap();

        assert_eq!(hosted.session_id, "cs_mock_1");
        assert!(hosted.url.contains("cs_mock_1"));
    }

    #[tokio::test]
    async fn test_list_by_unknown_email_is_empty() {
        let (_, orchestrator) = orchestrator();
        let rows = orchestrator
            .list_subscriptions(Some("nobody@example.ch"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_rows_carry_portfolio_metadata() {
        let (_, orchestrator) = orchestrator();

        orchestrator
            .start_subscription(&quoted_request(2, BillingPeriod::Annual))
            .await
            .unwrap();

        let rows = orchestrator
            .list_subscriptions(Some("anna@example.ch"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].portfolios, "Global Equities, Swiss Bonds");
        assert_eq!(rows[0].customer_email, "anna@example.ch");
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_input() {
        let (_, orchestrator) = orchestrator();

        let mut request = quoted_request(1, BillingPeriod::Monthly);
        request.email = "not-an-email".into();
        assert!(matches!(
            orchestrator.start_subscription(&request).await,
            Err(PaymentError::Validation(_))
        ));

        let mut request = quoted_request(1, BillingPeriod::Monthly);
        request.name = "  ".into();
        assert!(matches!(
            orchestrator.start_subscription(&request).await,
            Err(PaymentError::Validation(_))
        ));

        let request = CheckoutRequest {
            selection: PriceSelection::Existing(String::new()),
            ..quoted_request(1, BillingPeriod::Monthly)
        };
        assert!(matches!(
            orchestrator.start_subscription(&request).await,
            Err(PaymentError::Validation(_))
        ));

        let request = quoted_request(5, BillingPeriod::Monthly);
        assert!(matches!(
            orchestrator.start_subscription(&request).await,
            Err(PaymentError::Validation(_))
        ));
    }
}
