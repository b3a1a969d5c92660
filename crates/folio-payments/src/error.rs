//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
///
/// Provider SDK failures are converted into this union at the gateway seam,
/// so callers map errors to HTTP responses exhaustively instead of matching
/// on one SDK's exception classes.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Bad or missing input fields, range violations
    #[error("validation failed: {0}")]
    Validation(String),

    /// Provider credential missing - no call was attempted
    #[error("payment provider not configured")]
    NotConfigured,

    /// Card was declined by the provider
    #[error("card declined: {0}")]
    CardDeclined(String),

    /// Too many requests to the provider
    #[error("rate limit exceeded")]
    RateLimited,

    /// Provider rejected the request parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Referenced price is missing, inactive, or not recurring
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Authentication with the provider failed
    #[error("authentication with payment provider failed")]
    AuthFailed,

    /// Network communication with the provider failed
    #[error("network error: {0}")]
    Network(String),

    /// Any other provider-reported error
    #[error("provider error: {0}")]
    Provider(String),

    /// Unanticipated internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Stable `type` tag for the JSON error envelope
    pub fn error_type(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "validation_error",
            PaymentError::NotConfigured => "configuration_error",
            PaymentError::CardDeclined(_) => "card_error",
            PaymentError::RateLimited => "rate_limit_error",
            PaymentError::InvalidRequest(_) | PaymentError::InvalidPrice(_) => {
                "invalid_request_error"
            }
            PaymentError::AuthFailed => "authentication_error",
            PaymentError::Network(_) => "api_connection_error",
            PaymentError::Provider(_) => "provider_error",
            PaymentError::Internal(_) => "internal_error",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Validation(msg) => msg.clone(),
            PaymentError::NotConfigured => {
                "Server not configured. Set STRIPE_SECRET_KEY environment variable.".into()
            }
            PaymentError::CardDeclined(msg) if !msg.is_empty() => msg.clone(),
            PaymentError::CardDeclined(_) => "Your card was declined.".into(),
            PaymentError::RateLimited => "Too many requests. Please try again later.".into(),
            PaymentError::InvalidRequest(msg) | PaymentError::InvalidPrice(msg) => msg.clone(),
            PaymentError::AuthFailed => "Authentication with payment provider failed.".into(),
            PaymentError::Network(_) => "Network error. Please try again.".into(),
            PaymentError::Provider(msg) => msg.clone(),
            PaymentError::Internal(_) => "An unexpected error occurred.".into(),
        }
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        match err {
            stripe::StripeError::Stripe(e) => {
                let message = e
                    .message
                    .clone()
                    .unwrap_or_else(|| "payment provider error".into());
                match (e.error_type, e.http_status) {
                    (stripe::ErrorType::Card, _) => PaymentError::CardDeclined(message),
                    (_, 429) => PaymentError::RateLimited,
                    (_, 401) => PaymentError::AuthFailed,
                    (stripe::ErrorType::InvalidRequest, _) => PaymentError::InvalidRequest(message),
                    _ => PaymentError::Provider(message),
                }
            }
            stripe::StripeError::ClientError(msg) => PaymentError::Network(msg),
            stripe::StripeError::Timeout => {
                PaymentError::Network("request to payment provider timed out".into())
            }
            other => PaymentError::Internal(other.to_string()),
        }
    }
}
