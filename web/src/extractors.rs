//! Custom Axum extractors.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(correlation_id: CorrelationId) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Extracts the correlation ID from the `X-Correlation-ID` header,
/// or generates a new UUID v4 if not present.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Try to extract from X-Correlation-ID header
        let correlation_id = parts
            .headers
            .get("X-Correlation-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header("X-Correlation-ID", id.to_string())
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();

        let extracted = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted.0, id);
    }

    #[tokio::test]
    async fn test_correlation_id_generated_when_missing() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, ()) = request.into_parts();

        let extracted = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_ne!(extracted.0, Uuid::nil());
    }
}
