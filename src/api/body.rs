use axum::body::{Body, Bytes};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const KIB: usize = 1024;

/// Read at most `limit` bytes of a request body
pub async fn read_bounded(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::bad_request("Request body too large")
    })
}

/// Read a JSON body, rejecting anything over `limit` bytes before parsing
pub async fn read_bounded_json<T: DeserializeOwned>(
    body: Body,
    limit: usize,
) -> Result<T, ApiError> {
    let bytes = read_bounded(body, limit).await?;
    parse_json(&bytes)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Message {
        message: String,
    }

    #[tokio::test]
    async fn test_read_within_limit() {
        let body: Message = read_bounded_json(Body::from(r#"{"message":"hi"}"#), KIB)
            .await
            .unwrap();
        assert_eq!(body.message, "hi");
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_parsing() {
        let raw = format!(r#"{{"message":"{}"}}"#, "x".repeat(2 * KIB));
        let err = read_bounded_json::<Message>(Body::from(raw), KIB)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Request body too large"));
    }

    #[tokio::test]
    async fn test_malformed_and_missing_fields() {
        assert!(read_bounded_json::<Message>(Body::from("{not json"), KIB).await.is_err());
        assert!(read_bounded_json::<Message>(Body::from(r#"{"other":1}"#), KIB).await.is_err());
        assert!(read_bounded_json::<Message>(Body::empty(), KIB).await.is_err());
    }
}
