//! HTTP Handlers
//!
//! JSON endpoints for the checkout flows plus the static document routes.
//! Every failure leaves the process as the `{"error": {"message", "type"}}`
//! envelope; no stack trace or HTML error page ever reaches the caller.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use folio_payments::{CheckoutOrchestrator, CheckoutRequest, PaymentError, PriceSelection};
use folio_pricing::BillingPeriod;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub stripe_configured: bool,
}

/// Shared body for the checkout entry points: customer identity plus either
/// an explicit price reference or a (count, period) pair
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub portfolio_count: Option<u8>,
    #[serde(default)]
    pub billing_period: Option<String>,
    #[serde(default)]
    pub portfolios: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCheckoutResponse {
    pub subscription_id: String,
    pub client_secret: Option<String>,
    pub customer_id: String,
    pub price_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentCheckoutResponse {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub customer_id: String,
    pub price_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub subscription_id: String,
    pub status: String,
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPayload {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub subscription_id: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// Listing rows keep the legacy snake_case field names
#[derive(Debug, Serialize)]
pub struct SubscriptionRow {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
    pub portfolios: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub subscriptions: Vec<SubscriptionRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Error Mapping
// ============================================================================

fn error_response(err: &PaymentError) -> ApiError {
    let status = match err {
        PaymentError::Validation(_)
        | PaymentError::CardDeclined(_)
        | PaymentError::InvalidRequest(_)
        | PaymentError::InvalidPrice(_)
        | PaymentError::Provider(_) => StatusCode::BAD_REQUEST,
        PaymentError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        PaymentError::AuthFailed => StatusCode::UNAUTHORIZED,
        PaymentError::Network(_) => StatusCode::BAD_GATEWAY,
        PaymentError::NotConfigured | PaymentError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                message: err.user_message(),
                error_type: err.error_type().into(),
            },
        }),
    )
}

fn validation_error(message: impl Into<String>) -> ApiError {
    error_response(&PaymentError::Validation(message.into()))
}

fn checkout_error(operation: &'static str, err: &PaymentError) -> ApiError {
    tracing::error!(operation, error = %err, "Checkout operation failed");
    error_response(err)
}

/// Unwrap the JSON extractor, mapping a malformed or absent body to the
/// validation envelope instead of axum's plain-text rejection
fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(validation_error(rejection.body_text())),
    }
}

/// Payment endpoints short-circuit here when no credential is configured;
/// no provider call is ever attempted in that state
fn require_configured(state: &AppState) -> Result<&Arc<CheckoutOrchestrator>, ApiError> {
    state
        .checkout
        .as_ref()
        .ok_or_else(|| error_response(&PaymentError::NotConfigured))
}

fn checkout_request(payload: CheckoutPayload) -> Result<CheckoutRequest, ApiError> {
    let selection = match (&payload.price_id, payload.portfolio_count, &payload.billing_period) {
        (Some(price_id), _, _) if !price_id.trim().is_empty() => {
            PriceSelection::Existing(price_id.clone())
        }
        (_, Some(portfolio_count), Some(period)) => PriceSelection::Quoted {
            portfolio_count,
            billing_period: period
                .parse::<BillingPeriod>()
                .map_err(|e| validation_error(e.to_string()))?,
        },
        _ => {
            return Err(validation_error(
                "missing required fields: priceId or (portfolioCount, billingPeriod)",
            ));
        }
    };

    Ok(CheckoutRequest {
        email: payload.email.unwrap_or_default(),
        name: payload.name.unwrap_or_default(),
        selection,
        portfolios: payload.portfolios,
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint; works without a provider credential
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stripe_configured: state.checkout.is_some(),
    })
}

/// Default-incomplete flow: subscription first, confirmation secret back
pub async fn create_subscription(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> ApiResult<SubscriptionCheckoutResponse> {
    let orchestrator = require_configured(&state)?;
    let request = checkout_request(require_json(payload)?)?;

    let checkout = orchestrator
        .start_subscription(&request)
        .await
        .map_err(|e| checkout_error("create_subscription", &e))?;

    Ok(Json(SubscriptionCheckoutResponse {
        subscription_id: checkout.subscription_id,
        client_secret: checkout.client_secret,
        customer_id: checkout.customer_id,
        price_id: checkout.price_id,
    }))
}

/// Direct-intent flow: stand-alone authorization for the quoted amount
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> ApiResult<PaymentIntentCheckoutResponse> {
    let orchestrator = require_configured(&state)?;
    let request = checkout_request(require_json(payload)?)?;

    let checkout = orchestrator
        .start_payment_intent(&request)
        .await
        .map_err(|e| checkout_error("create_payment_intent", &e))?;

    Ok(Json(PaymentIntentCheckoutResponse {
        payment_intent_id: checkout.payment_intent_id,
        client_secret: checkout.client_secret,
        customer_id: checkout.customer_id,
        price_id: checkout.price_id,
    }))
}

/// Post-payment reconciliation; reports provider-observed status
pub async fn verify_subscription(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPayload>, JsonRejection>,
) -> ApiResult<VerifyResponse> {
    let orchestrator = require_configured(&state)?;
    let payload = require_json(payload)?;

    let verified = orchestrator
        .verify_subscription(
            payload.subscription_id.as_deref().unwrap_or_default(),
            payload.payment_intent_id.as_deref(),
        )
        .await
        .map_err(|e| checkout_error("verify_subscription", &e))?;

    Ok(Json(VerifyResponse {
        subscription_id: verified.subscription_id,
        status: verified.status.to_string(),
        customer_id: verified.customer_id,
    }))
}

/// Cancel at the end of the current billing period, never immediately
pub async fn cancel_subscription(
    State(state): State<AppState>,
    payload: Result<Json<CancelPayload>, JsonRejection>,
) -> ApiResult<CancelResponse> {
    let orchestrator = require_configured(&state)?;
    let payload = require_json(payload)?;

    let canceled = orchestrator
        .cancel_subscription(payload.subscription_id.as_deref().unwrap_or_default())
        .await
        .map_err(|e| checkout_error("cancel_subscription", &e))?;

    Ok(Json(CancelResponse {
        subscription_id: canceled.subscription_id,
        status: canceled.status.to_string(),
        cancel_at_period_end: canceled.cancel_at_period_end,
        current_period_end: canceled.current_period_end,
    }))
}

/// List subscriptions, optionally scoped to one customer email
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ListResponse> {
    let orchestrator = require_configured(&state)?;

    let rows = orchestrator
        .list_subscriptions(query.email.as_deref())
        .await
        .map_err(|e| checkout_error("list_subscriptions", &e))?;

    Ok(Json(ListResponse {
        subscriptions: rows
            .into_iter()
            .map(|row| SubscriptionRow {
                id: row.id,
                status: row.status.to_string(),
                current_period_end: row.current_period_end,
                portfolios: row.portfolios,
                customer_email: row.customer_email,
            })
            .collect(),
    }))
}

/// Hosted-redirect flow: the provider runs the whole checkout off-box
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> ApiResult<CheckoutSessionResponse> {
    let orchestrator = require_configured(&state)?;
    let request = checkout_request(require_json(payload)?)?;

    let hosted = orchestrator
        .hosted_checkout(&request)
        .await
        .map_err(|e| checkout_error("create_checkout_session", &e))?;

    Ok(Json(CheckoutSessionResponse {
        url: hosted.url,
        session_id: hosted.session_id,
    }))
}

// ============================================================================
// Router
// ============================================================================

/// Build the full application router, including the static document routes
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & checkout API
        .route("/health", get(health))
        .route("/create-subscription", post(create_subscription))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/verify-subscription", post(verify_subscription))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/list-subscriptions", get(list_subscriptions))
        .route("/create-checkout-session", post(create_checkout_session))
        // Static document routes (opaque file serving)
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/payment", ServeFile::new(static_dir.join("payment.html")))
        .route_service("/privacy", ServeFile::new(static_dir.join("privacy.html")))
        .route_service("/terms", ServeFile::new(static_dir.join("terms.html")))
        .route_service("/app", ServeFile::new(static_dir.join("app.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt; // for `oneshot`

    use folio_payments::{CheckoutConfig, CheckoutOrchestrator, MockGateway};

    use super::*;
    use crate::state::AppState;

    fn configured_app() -> (Arc<MockGateway>, Router) {
        let gateway = Arc::new(MockGateway::new());
        let orchestrator =
            CheckoutOrchestrator::new(gateway.clone(), CheckoutConfig::default());
        let state = AppState {
            checkout: Some(Arc::new(orchestrator)),
        };
        (gateway, router(state, Path::new("static")))
    }

    fn unconfigured_app() -> Router {
        router(AppState { checkout: None }, Path::new("static"))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn subscribe_body() -> Value {
        json!({
            "email": "anna@example.ch",
            "name": "Anna Meier",
            "portfolioCount": 2,
            "billingPeriod": "annual",
            "portfolios": ["Global Equities", "Swiss Bonds"],
        })
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let (_, app) = configured_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stripe_configured"], true);

        let response = unconfigured_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["stripe_configured"], false);
    }

    #[tokio::test]
    async fn test_unconfigured_endpoints_return_configuration_error() {
        for uri in [
            "/create-subscription",
            "/create-payment-intent",
            "/verify-subscription",
            "/cancel-subscription",
            "/create-checkout-session",
        ] {
            let response = unconfigured_app()
                .oneshot(post_json(uri, subscribe_body()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            let body = body_json(response).await;
            assert_eq!(body["error"]["type"], "configuration_error", "{uri}");
        }

        let response = unconfigured_app()
            .oneshot(
                Request::builder()
                    .uri("/list-subscriptions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let (_, app) = configured_app();
        let request = Request::builder()
            .method("POST")
            .uri("/create-subscription")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_absent_body_is_a_validation_error() {
        let (_, app) = configured_app();
        let request = Request::builder()
            .method("POST")
            .uri("/cancel-subscription")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_subscription_happy_path() {
        let (_, app) = configured_app();
        let response = app
            .oneshot(post_json("/create-subscription", subscribe_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["subscriptionId"], "sub_mock_1");
        assert_eq!(body["customerId"], "cus_mock_1");
        assert_eq!(body["priceId"], "price_mock_1");
        assert!(body["clientSecret"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn test_create_payment_intent_happy_path() {
        let (_, app) = configured_app();
        let response = app
            .oneshot(post_json("/create-payment-intent", subscribe_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["paymentIntentId"], "pi_mock_1");
        assert_eq!(body["priceId"], "price_mock_1");
        assert!(body["clientSecret"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn test_unknown_billing_period_is_rejected() {
        let (_, app) = configured_app();
        let mut body = subscribe_body();
        body["billingPeriod"] = json!("quarterly");

        let response = app
            .oneshot(post_json("/create-subscription", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_missing_price_selection_is_rejected() {
        let (_, app) = configured_app();
        let body = json!({"email": "anna@example.ch", "name": "Anna Meier"});

        let response = app
            .oneshot(post_json("/create-subscription", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_verify_and_cancel_roundtrip() {
        let (gateway, app) = configured_app();

        let response = app
            .clone()
            .oneshot(post_json("/create-subscription", subscribe_body()))
            .await
            .unwrap();
        let created = body_json(response).await;
        let subscription_id = created["subscriptionId"].as_str().unwrap().to_string();

        gateway.mark_intent_succeeded("pi_mock_1", "pm_card_visa");
        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-subscription",
                json!({"subscriptionId": subscription_id, "paymentIntentId": "pi_mock_1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let verified = body_json(response).await;
        assert_eq!(verified["status"], "active");
        assert_eq!(verified["customerId"], "cus_mock_1");

        let response = app
            .oneshot(post_json(
                "/cancel-subscription",
                json!({"subscriptionId": subscription_id}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let canceled = body_json(response).await;
        assert_eq!(canceled["cancelAtPeriodEnd"], true);
        assert_eq!(canceled["status"], "active");
        assert!(canceled["currentPeriodEnd"].is_i64());
    }

    #[tokio::test]
    async fn test_list_subscriptions_by_email() {
        let (_, app) = configured_app();

        app.clone()
            .oneshot(post_json("/create-subscription", subscribe_body()))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/list-subscriptions?email=anna@example.ch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let rows = body["subscriptions"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "sub_mock_1");
        assert_eq!(rows[0]["portfolios"], "Global Equities, Swiss Bonds");
        assert_eq!(rows[0]["customer_email"], "anna@example.ch");
    }

    #[tokio::test]
    async fn test_create_checkout_session_returns_redirect() {
        let (_, app) = configured_app();
        let response = app
            .oneshot(post_json("/create-checkout-session", subscribe_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["sessionId"], "cs_mock_1");
        assert!(body["url"].as_str().unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn test_card_decline_maps_to_card_error() {
        let (gateway, app) = configured_app();
        gateway.decline_card();

        let response = app
            .oneshot(post_json("/create-payment-intent", subscribe_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "card_error");
        assert_eq!(body["error"]["message"], "Your card was declined.");
    }
}
