use shared::payment::PaymentMethod;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Payment adapter errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment method not available: {0}")]
    NotConfigured(PaymentMethod),

    #[error("{0} does not receive callbacks")]
    CallbacksNotSupported(PaymentMethod),

    #[error("Invalid callback signature: {0}")]
    InvalidSignature(String),

    #[error("Malformed callback: {0}")]
    Malformed(String),

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected the charge: {0}")]
    Rejected(String),
}

impl PaymentError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured(method) | PaymentError::CallbacksNotSupported(method) => {
                AppError::new(ErrorCode::PaymentInvalidMethod).with_detail("method", method.as_str())
            }
            PaymentError::InvalidSignature(_) => AppError::new(ErrorCode::PaymentSignatureInvalid),
            PaymentError::Malformed(msg) => {
                AppError::with_message(ErrorCode::PaymentCallbackMalformed, msg)
            }
            PaymentError::Http(e) => {
                tracing::error!(error = %e, "Payment provider unreachable");
                AppError::new(ErrorCode::PaymentProviderUnavailable)
            }
            PaymentError::Rejected(msg) => {
                AppError::with_message(ErrorCode::PaymentProviderUnavailable, msg)
            }
        }
    }
}
