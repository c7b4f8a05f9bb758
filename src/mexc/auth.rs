//! Authentication utilities for the MEXC spot API

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{Result, TraderError};

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 signature of a query string
///
/// MEXC signs the urlencoded query string (including `timestamp` and
/// `recvWindow`) with the API secret and appends the digest as `signature`.
pub fn sign_query(secret: &str, query: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TraderError::Internal(format!("Failed to create HMAC: {}", e)))?;
    mac.update(query.as_bytes());
    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

/// Join key/value pairs into a query string
///
/// Values placed here must already be query-safe; every parameter this
/// client sends (symbols, sides, decimals, client order ids) is.
pub fn build_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the final signed query: params + timestamp + recvWindow + signature
pub fn signed_query(
    secret: &str,
    params: &[(&str, String)],
    timestamp_ms: i64,
    recv_window_ms: u64,
) -> Result<String> {
    let mut all: Vec<(&str, String)> = params.to_vec();
    all.push(("timestamp", timestamp_ms.to_string()));
    all.push(("recvWindow", recv_window_ms.to_string()));
    let query = build_query(&all);
    let signature = sign_query(secret, &query)?;
    Ok(format!("{}&signature={}", query, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_query_is_hex() {
        let signature = sign_query("test_secret_key_12345", "symbol=BTCUSDT&side=BUY").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(hex::decode(&signature).is_ok());
    }

    #[test]
    fn test_sign_query_is_deterministic() {
        let a = sign_query("secret", "symbol=BTCUSDT").unwrap();
        let b = sign_query("secret", "symbol=BTCUSDT").unwrap();
        assert_eq!(a, b);

        let c = sign_query("other", "symbol=BTCUSDT").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_signed_query_layout() {
        let query = signed_query(
            "secret",
            &[("symbol", "BTCUSDT".to_string()), ("side", "BUY".to_string())],
            1_700_000_000_000,
            5000,
        )
        .unwrap();

        assert!(query.starts_with("symbol=BTCUSDT&side=BUY&timestamp=1700000000000&recvWindow=5000"));
        assert!(query.contains("&signature="));
    }
}
