//! Request signing.
//!
//! Both schemes sign the canonical query: parameters sorted by key and joined
//! as `k=v&...`. HMAC appends `signature` and sends the key in a header;
//! wallet signing adds `signer` before signing and appends an EIP-191
//! `signature`.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::config::Credentials;
use super::error::BinanceError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key for HMAC-signed requests.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Canonical query string: keys sorted, `k=v` joined by `&`.
#[must_use]
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// A query ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    /// Full query string including the signature.
    pub query: String,
    /// API key header value, for HMAC signing.
    pub api_key: Option<String>,
}

/// Signs request parameters with the configured scheme.
#[derive(Clone)]
pub enum RequestSigner {
    /// HMAC-SHA256 with an API secret.
    Hmac {
        /// API key.
        api_key: String,
        /// HMAC secret.
        api_secret: String,
    },
    /// EIP-191 personal message signature.
    Wallet(PrivateKeySigner),
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hmac { api_key, .. } => f.debug_struct("Hmac").field("api_key", api_key).finish(),
            Self::Wallet(signer) => f.debug_tuple("Wallet").field(&signer.address()).finish(),
        }
    }
}

impl RequestSigner {
    /// Build a signer from credentials.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, BinanceError> {
        match credentials {
            Credentials::ApiKey {
                api_key,
                api_secret,
            } => {
                if api_key.trim().is_empty() || api_secret.trim().is_empty() {
                    return Err(BinanceError::NotConfigured(
                        "API key and secret must both be set".to_string(),
                    ));
                }
                Ok(Self::Hmac {
                    api_key: api_key.clone(),
                    api_secret: api_secret.clone(),
                })
            }
            Credentials::Wallet { private_key } => {
                let key = private_key.trim().trim_start_matches("0x");
                let signer = PrivateKeySigner::from_str(key)
                    .map_err(|e| BinanceError::Signing(format!("invalid wallet key: {e}")))?;
                Ok(Self::Wallet(signer))
            }
        }
    }

    /// Sign `params`, which must already include `timestamp`.
    pub async fn sign(&self, mut params: BTreeMap<String, String>) -> Result<SignedQuery, BinanceError> {
        match self {
            Self::Hmac {
                api_key,
                api_secret,
            } => {
                let query = canonical_query(&params);
                let signature = hmac_sha256_hex(api_secret, &query)?;
                Ok(SignedQuery {
                    query: format!("{query}&signature={signature}"),
                    api_key: Some(api_key.clone()),
                })
            }
            Self::Wallet(signer) => {
                params.insert("signer".to_string(), signer.address().to_string());
                let query = canonical_query(&params);
                let signature = signer
                    .sign_message(query.as_bytes())
                    .await
                    .map_err(|e| BinanceError::Signing(e.to_string()))?;
                Ok(SignedQuery {
                    query: format!("{query}&signature=0x{}", hex::encode(signature.as_bytes())),
                    api_key: None,
                })
            }
        }
    }
}

/// Lowercase hex HMAC-SHA256 of `message`.
pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String, BinanceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BinanceError::Signing(format!("HMAC init failed: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
