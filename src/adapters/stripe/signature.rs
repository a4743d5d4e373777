//! `Stripe-Signature` verification.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The signed payload is `"{t}." + raw body`, keyed with the endpoint secret.
//! Several `v1` entries appear while a secret is being rotated; any match is
//! enough.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::{sync::Arc, time::Duration},
    subtle::ConstantTimeEq,
    thiserror::Error,
};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Why a signature was rejected. Only ever logged; callers answer with a
/// generic rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,

    #[error("missing or unparseable timestamp")]
    BadTimestamp,

    #[error("timestamp {timestamp} is {skew}s away from now (tolerance {tolerance}s)")]
    OutsideTolerance {
        timestamp: i64,
        skew: u64,
        tolerance: u64,
    },

    #[error("no v1 signatures in header")]
    NoSignatures,

    #[error("no v1 signature matches")]
    Mismatch,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    pub timestamp: i64,
    pub signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    pub fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::BadTimestamp)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Holds the endpoint secret and clock-skew tolerance for the process lifetime.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Arc<str>,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Arc<str>>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify against an explicit "now" (unix seconds).
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(header)?;

        let skew = now.abs_diff(header.timestamp);
        let tolerance = self.tolerance.as_secs();
        if skew > tolerance {
            return Err(SignatureError::OutsideTolerance {
                timestamp: header.timestamp,
                skew,
                tolerance,
            });
        }

        let expected = compute_signature(&self.secret, header.timestamp, payload);
        // Fold over every candidate so the time taken doesn't depend on which one matched.
        let matched = header
            .signatures
            .iter()
            .fold(subtle::Choice::from(0), |acc, candidate| {
                acc | expected.as_bytes().ct_eq(candidate.as_bytes())
            });

        if bool::from(matched) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}
