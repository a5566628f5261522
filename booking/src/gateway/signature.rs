//! Webhook signature verification.
//!
//! The provider signs `"{timestamp}.{raw_body}"` with HMAC-SHA256 and sends
//! the hex digest plus the timestamp as headers. Verification operates on
//! the exact raw bytes received; the body is never re-serialized before
//! checking, since re-serialization can change byte-for-byte content and
//! invalidate the signature.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use turnstile_web::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Why a webhook signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Required header absent from the request.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// Header present but not decodable (non-hex signature, non-numeric
    /// timestamp, non-ASCII value).
    #[error("malformed {0} header")]
    Malformed(&'static str),

    /// Timestamp outside the replay-protection window.
    #[error("timestamp outside tolerance ({skew_secs}s skew)")]
    Stale {
        /// Observed clock skew in seconds
        skew_secs: i64,
    },

    /// Digest did not match the signed material.
    #[error("signature mismatch")]
    Mismatch,
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::MissingHeader(_) | SignatureError::Malformed(_) => {
                AppError::bad_request(err.to_string())
            }
            SignatureError::Stale { .. } | SignatureError::Mismatch => {
                AppError::unauthorized("Webhook signature rejected")
            }
        }
    }
}

/// Compute the hex HMAC-SHA256 digest over `"{timestamp}.{raw_body}"`.
///
/// Used by tests and by the mock provider to produce valid signatures.
#[must_use]
pub fn sign_payload(raw_body: &[u8], timestamp: &str, secret: &str) -> String {
    let mut mac = new_mac(secret);
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a webhook signature over the exact raw bytes received.
///
/// `tolerance` bounds the accepted clock skew of `timestamp` against the
/// current time (replay protection). The digest comparison is constant
/// time.
///
/// # Errors
///
/// Returns the specific [`SignatureError`] describing why the signature was
/// rejected; callers map missing/malformed headers to 400 and stale or
/// mismatching signatures to 401.
pub fn verify_signature(
    raw_body: &[u8],
    timestamp: &str,
    signature_hex: &str,
    secret: &str,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::Malformed("X-Webhook-Timestamp"))?;

    let now = chrono::Utc::now().timestamp();
    let skew_secs = (now - ts).abs();
    if skew_secs > tolerance.as_secs() as i64 {
        return Err(SignatureError::Stale { skew_secs });
    }

    let provided =
        hex::decode(signature_hex).map_err(|_| SignatureError::Malformed("X-Webhook-Signature"))?;

    let mut mac = new_mac(secret);
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    if constant_time_eq(&provided, &expected) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

// HMAC accepts keys of any length, so construction cannot fail.
#[allow(clippy::expect_used)]
fn new_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn now_ts() -> String {
        chrono::Utc::now().timestamp().to_string()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"event":"payment.captured","payload":{"order_id":"order_1"}}"#;
        let ts = now_ts();
        let sig = sign_payload(body, &ts, SECRET);

        assert!(verify_signature(body, &ts, &sig, SECRET, Duration::from_secs(300)).is_ok());
    }

    #[test]
    fn test_signature_over_different_bytes_rejected() {
        // Same JSON meaning, different raw bytes (whitespace); the digest
        // must not match because verification never re-serializes.
        let signed = br#"{"event":"payment.captured","payload":{"order_id":"order_1"}}"#;
        let delivered = br#"{ "event": "payment.captured", "payload": { "order_id": "order_1" } }"#;
        let ts = now_ts();
        let sig = sign_payload(signed, &ts, SECRET);

        assert_eq!(
            verify_signature(delivered, &ts, &sig, SECRET, Duration::from_secs(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"payload";
        let ts = now_ts();
        let sig = sign_payload(body, &ts, "other_secret");

        assert_eq!(
            verify_signature(body, &ts, &sig, SECRET, Duration::from_secs(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"payload";
        let old_ts = (chrono::Utc::now().timestamp() - 3_600).to_string();
        let sig = sign_payload(body, &old_ts, SECRET);

        assert!(matches!(
            verify_signature(body, &old_ts, &sig, SECRET, Duration::from_secs(300)),
            Err(SignatureError::Stale { .. })
        ));
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        // Timestamp is part of the signed material; changing it after
        // signing must invalidate the digest even inside the window.
        let body = b"payload";
        let ts = chrono::Utc::now().timestamp();
        let sig = sign_payload(body, &ts.to_string(), SECRET);
        let shifted = (ts + 10).to_string();

        assert_eq!(
            verify_signature(body, &shifted, &sig, SECRET, Duration::from_secs(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let body = b"payload";
        let ts = now_ts();
        let sig = sign_payload(body, &ts, SECRET);

        assert_eq!(
            verify_signature(body, "not-a-number", &sig, SECRET, Duration::from_secs(300)),
            Err(SignatureError::Malformed("X-Webhook-Timestamp"))
        );
        assert_eq!(
            verify_signature(body, &ts, "zz-not-hex", SECRET, Duration::from_secs(300)),
            Err(SignatureError::Malformed("X-Webhook-Signature"))
        );
    }
}
