use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::option_chain_provider::ChainProviderError;
use crate::external::yield_classifier::ClassifierError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(sqlx::Error),
    #[error("Provider error: {0}")]
    Provider(ChainProviderError),
    #[error("Classifier error: {0}")]
    Classifier(ClassifierError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not found")]
    NotFound,
}

impl AppError {
    /// Short label stored in the fetch-failure log.
    pub fn failure_type(&self) -> &'static str {
        match self {
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Provider(e) => e.failure_type(),
            AppError::Classifier(_) => "classifier_error",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
            AppError::NotFound => "not_found",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            // Routes only read the store today; an upstream failure surfacing here is a gateway error.
            AppError::Provider(_) | AppError::Classifier(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
            },
            AppError::Config(_) | AppError::StoreUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::StoreUnavailable(value)
    }
}

impl From<ClassifierError> for AppError {
    fn from(value: ClassifierError) -> Self {
        AppError::Classifier(value)
    }
}

impl From<ChainProviderError> for AppError {
    fn from(value: ChainProviderError) -> Self {
        AppError::Provider(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_retries_maps_to_bad_gateway() {
        let err = AppError::Provider(ChainProviderError::ExhaustedRetries {
            attempts: 6,
            last_error: "rate limited".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get("Retry-After").is_none());
    }

    #[test]
    fn test_upstream_error_maps_to_bad_gateway() {
        let err = AppError::Provider(ChainProviderError::Upstream {
            status: 403,
            body: "forbidden".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_failure_type_labels() {
        assert_eq!(AppError::from(sqlx::Error::PoolClosed).failure_type(), "store_unavailable");
        assert_eq!(
            AppError::from(ChainProviderError::MissingCredential).failure_type(),
            "missing_credential"
        );
        assert_eq!(
            AppError::from(ClassifierError::Parse("missing chart result".into())).failure_type(),
            "classifier_error"
        );
    }

    #[test]
    fn test_classifier_error_maps_to_bad_gateway() {
        let err = AppError::from(ClassifierError::Transport("timed out".into()));
        assert_eq!(err.to_string(), "Classifier error: dividend lookup request failed: timed out");
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
