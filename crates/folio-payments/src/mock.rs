//! Mock Payment Gateway
//!
//! In-memory [`PaymentGateway`] for tests and demos. Deterministic ids,
//! call counters, and injectable failures (price-create conflict, card
//! decline, invoice-pay failure).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{PaymentError, Result};
use crate::gateway::{
    CheckoutSessionRef, CustomerRef, InvoiceRef, NewCheckoutSession, NewPaymentIntent, NewPrice,
    NewSubscription, PaymentGateway, PaymentIntentRef, PaymentState, PriceRef, SubscriptionRef,
    SubscriptionState,
};

/// Fixed period-end timestamp returned for every mock subscription
const MOCK_PERIOD_END: i64 = 1_767_225_600;

#[derive(Default)]
struct MockState {
    customers: Vec<CustomerRef>,
    prices: Vec<PriceRef>,
    intents: Vec<PaymentIntentRef>,
    subscriptions: Vec<SubscriptionRef>,
    invoices: Vec<InvoiceRef>,

    customer_creates: usize,
    customer_renames: usize,
    price_creates: usize,
    session_creates: usize,

    attached: Vec<(String, String)>,
    default_payment_methods: Vec<(String, String)>,
    paid_invoices: Vec<(String, String)>,

    conflict_on_next_price_create: bool,
    decline_card: bool,
    fail_invoice_pay: bool,
}

/// Mock gateway with in-memory state
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    /// Make the next `create_price` register the price but fail, simulating
    /// a concurrent creator winning the lookup-key race
    pub fn induce_price_create_conflict(&self) {
        self.lock().conflict_on_next_price_create = true;
    }

    /// Make payment authorization attempts fail with a card decline
    pub fn decline_card(&self) {
        self.lock().decline_card = true;
    }

    /// Make `pay_invoice` fail while leaving the subscription in place
    pub fn fail_invoice_pay(&self) {
        self.lock().fail_invoice_pay = true;
    }

    /// Flip a payment authorization to succeeded with the given payment method
    pub fn mark_intent_succeeded(&self, payment_intent_id: &str, payment_method_id: &str) {
        let mut state = self.lock();
        if let Some(intent) = state
            .intents
            .iter_mut()
            .find(|i| i.id == payment_intent_id)
        {
            intent.status = PaymentState::Succeeded;
            intent.payment_method_id = Some(payment_method_id.to_string());
        }
    }

    pub fn customer_creates(&self) -> usize {
        self.lock().customer_creates
    }

    pub fn customer_renames(&self) -> usize {
        self.lock().customer_renames
    }

    pub fn price_creates(&self) -> usize {
        self.lock().price_creates
    }

    /// Payment methods attached so far, as (payment_method, customer) pairs
    pub fn attached(&self) -> Vec<(String, String)> {
        self.lock().attached.clone()
    }

    /// Default payment methods set so far, as (customer, payment_method) pairs
    pub fn default_payment_methods(&self) -> Vec<(String, String)> {
        self.lock().default_payment_methods.clone()
    }

    /// Invoices paid so far, as (invoice, payment_method) pairs
    pub fn paid_invoices(&self) -> Vec<(String, String)> {
        self.lock().paid_invoices.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<CustomerRef>> {
        let state = self.lock();
        Ok(state.customers.iter().find(|c| c.email == email).cloned())
    }

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<CustomerRef> {
        let mut state = self.lock();
        state.customer_creates += 1;
        let customer = CustomerRef {
            id: format!("cus_mock_{}", state.customer_creates),
            email: email.to_string(),
            name: Some(name.to_string()),
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn rename_customer(&self, customer_id: &str, name: &str) -> Result<CustomerRef> {
        let mut state = self.lock();
        state.customer_renames += 1;
        let customer = state
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("no such customer: {customer_id}"))
            })?;
        customer.name = Some(name.to_string());
        Ok(customer.clone())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<()> {
        self.lock()
            .default_payment_methods
            .push((customer_id.to_string(), payment_method_id.to_string()));
        Ok(())
    }

    async fn find_price_by_lookup_key(&self, lookup_key: &str) -> Result<Option<PriceRef>> {
        let state = self.lock();
        Ok(state
            .prices
            .iter()
            .find(|p| p.lookup_key.as_deref() == Some(lookup_key) && p.active)
            .cloned())
    }

    async fn create_price(&self, spec: &NewPrice) -> Result<PriceRef> {
        let mut state = self.lock();
        state.price_creates += 1;
        let price = PriceRef {
            id: format!("price_mock_{}", state.price_creates),
            lookup_key: Some(spec.lookup_key.clone()),
            unit_amount_minor: spec.unit_amount_minor,
            currency: spec.currency.clone(),
            active: true,
            recurring: true,
        };
        state.prices.push(price.clone());

        if state.conflict_on_next_price_create {
            state.conflict_on_next_price_create = false;
            return Err(PaymentError::InvalidRequest(format!(
                "a price with lookup key {:?} already exists",
                spec.lookup_key
            )));
        }
        Ok(price)
    }

    async fn retrieve_price(&self, price_id: &str) -> Result<PriceRef> {
        let state = self.lock();
        state
            .prices
            .iter()
            .find(|p| p.id == price_id)
            .cloned()
            .ok_or_else(|| PaymentError::InvalidPrice(format!("no such price: {price_id}")))
    }

    async fn create_payment_intent(&self, spec: &NewPaymentIntent) -> Result<PaymentIntentRef> {
        let mut state = self.lock();
        if state.decline_card {
            return Err(PaymentError::CardDeclined("Your card was declined.".into()));
        }
        if !state.customers.iter().any(|c| c.id == spec.customer_id) {
            return Err(PaymentError::InvalidRequest(format!(
                "no such customer: {}",
                spec.customer_id
            )));
        }
        let n = state.intents.len() + 1;
        let intent = PaymentIntentRef {
            id: format!("pi_mock_{n}"),
            client_secret: Some(format!("pi_mock_{n}_secret_test")),
            status: PaymentState::RequiresPaymentMethod,
            payment_method_id: None,
        };
        state.intents.push(intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentRef> {
        let state = self.lock();
        state
            .intents
            .iter()
            .find(|i| i.id == payment_intent_id)
            .cloned()
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!(
                    "no such payment intent: {payment_intent_id}"
                ))
            })
    }

    async fn create_incomplete_subscription(
        &self,
        spec: &NewSubscription,
    ) -> Result<SubscriptionRef> {
        let mut state = self.lock();
        if state.decline_card {
            return Err(PaymentError::CardDeclined("Your card was declined.".into()));
        }

        let n = state.subscriptions.len() + 1;
        let intent_n = state.intents.len() + 1;
        let intent = PaymentIntentRef {
            id: format!("pi_mock_{intent_n}"),
            client_secret: Some(format!("pi_mock_{intent_n}_secret_test")),
            status: PaymentState::RequiresPaymentMethod,
            payment_method_id: None,
        };
        let invoice = InvoiceRef {
            id: format!("in_mock_{n}"),
            status: Some("open".into()),
            payment_intent_id: Some(intent.id.clone()),
        };

        let customer_email = state
            .customers
            .iter()
            .find(|c| c.id == spec.customer_id)
            .map(|c| c.email.clone());

        let subscription = SubscriptionRef {
            id: format!("sub_mock_{n}"),
            status: SubscriptionState::Incomplete,
            cancel_at_period_end: false,
            current_period_end: Some(MOCK_PERIOD_END),
            customer_id: spec.customer_id.clone(),
            customer_email,
            latest_invoice_id: Some(invoice.id.clone()),
            client_secret: intent.client_secret.clone(),
            portfolios: spec.metadata.get("portfolios").cloned(),
        };

        state.intents.push(intent);
        state.invoices.push(invoice);
        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<SubscriptionRef> {
        let state = self.lock();
        state
            .subscriptions
            .iter()
            .find(|s| s.id == subscription_id)
            .cloned()
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("no such subscription: {subscription_id}"))
            })
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<SubscriptionRef> {
        let mut state = self.lock();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("no such subscription: {subscription_id}"))
            })?;
        subscription.cancel_at_period_end = true;
        Ok(subscription.clone())
    }

    async fn list_subscriptions(
        &self,
        customer_id: Option<&str>,
        limit: u64,
    ) -> Result<Vec<SubscriptionRef>> {
        let state = self.lock();
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| customer_id.is_none_or(|id| s.customer_id == id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<InvoiceRef> {
        let state = self.lock();
        state
            .invoices
            .iter()
            .find(|i| i.id == invoice_id)
            .cloned()
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("no such invoice: {invoice_id}"))
            })
    }

    async fn pay_invoice(&self, invoice_id: &str, payment_method_id: &str) -> Result<InvoiceRef> {
        let mut state = self.lock();
        if state.fail_invoice_pay {
            return Err(PaymentError::CardDeclined("Your card was declined.".into()));
        }

        let invoice = state
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice_id)
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("no such invoice: {invoice_id}"))
            })?;
        invoice.status = Some("paid".into());
        let paid = invoice.clone();

        state
            .paid_invoices
            .push((invoice_id.to_string(), payment_method_id.to_string()));

        // Settlement: the owning subscription becomes active.
        if let Some(subscription) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.latest_invoice_id.as_deref() == Some(invoice_id))
        {
            subscription.status = SubscriptionState::Active;
        }
        Ok(paid)
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<()> {
        self.lock()
            .attached
            .push((payment_method_id.to_string(), customer_id.to_string()));
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        spec: &NewCheckoutSession,
    ) -> Result<CheckoutSessionRef> {
        let mut state = self.lock();
        if !state.prices.iter().any(|p| p.id == spec.price_id) {
            return Err(PaymentError::InvalidPrice(format!(
                "no such price: {}",
                spec.price_id
            )));
        }
        state.session_creates += 1;
        let id = format!("cs_mock_{}", state.session_creates);
        Ok(CheckoutSessionRef {
            url: format!("https://checkout.mock.test/pay/{id}"),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_customer_roundtrip() {
        let gateway = MockGateway::new();
        assert!(gateway
            .find_customer_by_email("anna@example.ch")
            .await
            .unwrap()
            .is_none());

        let created = gateway
            .create_customer("anna@example.ch", "Anna Meier", HashMap::new())
            .await
            .unwrap();
        let found = gateway
            .find_customer_by_email("anna@example.ch")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created, found);
        assert_eq!(gateway.customer_creates(), 1);
    }

    #[tokio::test]
    async fn test_price_conflict_registers_price() {
        let gateway = MockGateway::new();
        gateway.induce_price_create_conflict();

        let spec = NewPrice {
            lookup_key: "openfolio_annual_2_portfolios_incl_tax".into(),
            unit_amount_minor: 63_044,
            currency: "chf".into(),
            billing_period: folio_pricing::BillingPeriod::Annual,
            product_name: "OpenFolio".into(),
            metadata: HashMap::new(),
        };
        assert!(gateway.create_price(&spec).await.is_err());

        // The conflicting creator's price is visible to a refetch.
        let refetched = gateway
            .find_price_by_lookup_key("openfolio_annual_2_portfolios_incl_tax")
            .await
            .unwrap();
        assert!(refetched.is_some());
    }

    #[tokio::test]
    async fn test_pay_invoice_activates_subscription() {
        let gateway = MockGateway::new();
        let customer = gateway
            .create_customer("anna@example.ch", "Anna Meier", HashMap::new())
            .await
            .unwrap();
        let subscription = gateway
            .create_incomplete_subscription(&NewSubscription {
                customer_id: customer.id,
                price_id: "price_mock_1".into(),
                metadata: HashMap::new(),
            })
            .await
            .unwrap();
        assert_eq!(subscription.status, SubscriptionState::Incomplete);

        let invoice_id = subscription.latest_invoice_id.unwrap();
        gateway.pay_invoice(&invoice_id, "pm_mock_1").await.unwrap();

        let refreshed = gateway.retrieve_subscription(&subscription.id).await.unwrap();
        assert!(refreshed.status.is_active());
    }
}
