//! Standard Webhooks signature scheme, as used by the payment provider.
//!
//! signed content: `<webhook-id>.<webhook-timestamp>.<raw body>`
//! signature:      base64(HMAC-SHA256(secret, signed content))
//! header:         space-separated `v1,<signature>` entries; any match passes

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";
/// Maximum clock distance between the signed timestamp and now.
const TOLERANCE_SECS: i64 = 5 * 60;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_SIGNATURE: &str = "webhook-signature";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("webhook secret is not valid base64")]
    InvalidSecret,

    #[error("timestamp header is not a unix timestamp")]
    InvalidTimestamp,

    #[error("timestamp is outside the allowed tolerance")]
    TimestampOutOfTolerance,

    #[error("no signature matched")]
    NoMatchingSignature,
}

/// The three signing headers, already extracted from the request.
#[derive(Debug, Clone, Copy)]
pub struct SignedHeaders<'a> {
    pub id: &'a str,
    pub signature: &'a str,
    pub timestamp: &'a str,
}

/// Holds the keyed MAC; each verification works on a clone of it.
#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha256,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, SignatureError> {
        let encoded = secret.trim().strip_prefix(SECRET_PREFIX).unwrap_or(secret.trim());
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| SignatureError::InvalidSecret)?;
        if key.is_empty() {
            return Err(SignatureError::InvalidSecret);
        }
        let keyed = <HmacSha256 as Mac>::new_from_slice(&key)
            .map_err(|_| SignatureError::InvalidSecret)?;
        Ok(Self { keyed })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    /// Produces a `v1,<base64>` signature header value.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let tag = self
            .mac(id, &timestamp.to_string(), body)
            .finalize()
            .into_bytes();
        format!("{SIGNATURE_VERSION},{}", STANDARD.encode(tag))
    }

    /// Verifies the headers against the raw body. Nothing in the body is
    /// parsed before this succeeds.
    pub fn verify(
        &self,
        headers: SignedHeaders<'_>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SignatureError> {
        let seconds: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let signed_at =
            DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(SignatureError::InvalidTimestamp)?;
        if (now - signed_at).num_seconds().abs() > TOLERANCE_SECS {
            return Err(SignatureError::TimestampOutOfTolerance);
        }

        let mac = self.mac(headers.id, headers.timestamp.trim(), body);
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(signed_at)
        } else {
            Err(SignatureError::NoMatchingSignature)
        }
    }
}
