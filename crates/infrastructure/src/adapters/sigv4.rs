//! AWS Signature Version 4 request signing.
//!
//! Signs `http` tasks declared with `auth: AWS_IAM`. Credentials are read
//! from the case's `config`:
//!
//! | field | required |
//! |---|---|
//! | `region` | yes |
//! | `accessKeyId` | yes |
//! | `secretAccessKey` | yes |
//! | `sessionToken` | no |
//! | `service` | no, defaults to `execute-api` |

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tapestry_application::ports::{OutboundRequest, RequestSigner, SigningError};
use tapestry_application::template::encode_component;
use url::Url;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const DEFAULT_SERVICE: &str = "execute-api";

/// Signs requests with AWS SigV4 using credentials from `config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV4Signer;

impl SigV4Signer {
    /// Creates a signer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Signs `request` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is missing or the URL is invalid.
    pub fn sign_at(
        request: &mut OutboundRequest,
        config: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), SigningError> {
        let credentials = Credentials::from_config(config)?;
        let url = Url::parse(&request.url).map_err(|e| SigningError::InvalidUrl {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(SigningError::InvalidUrl {
                    url: request.url.clone(),
                    message: "URL has no host".to_string(),
                });
            }
        };

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        request.headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(token) = credentials.session_token {
            request
                .headers
                .insert("x-amz-security-token".to_string(), token.to_string());
        }

        let mut signed: BTreeMap<String, String> = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        signed.insert("host".to_string(), host);

        let canonical_headers: String = signed
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect();
        let signed_headers = signed.keys().cloned().collect::<Vec<_>>().join(";");
        let path = if url.path().is_empty() { "/" } else { url.path() };

        let canonical_request = format!(
            "{}\n{path}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
            request.method,
            canonical_query(&url),
            hex(&Sha256::digest(request.body_bytes())),
        );

        let scope = format!(
            "{date}/{}/{}/aws4_request",
            credentials.region, credentials.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex(&Sha256::digest(canonical_request.as_bytes()))
        );

        let key = [
            credentials.region,
            credentials.service,
            "aws4_request",
        ]
        .iter()
        .fold(
            hmac_sha256(
                format!("AWS4{}", credentials.secret_access_key).as_bytes(),
                date.as_bytes(),
            ),
            |key, part| hmac_sha256(&key, part.as_bytes()),
        );
        let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes()));

        request.headers.insert(
            "Authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                credentials.access_key_id
            ),
        );
        Ok(())
    }
}

impl RequestSigner for SigV4Signer {
    fn sign(&self, request: &mut OutboundRequest, config: &Value) -> Result<(), SigningError> {
        Self::sign_at(request, config, Utc::now())
    }
}

struct Credentials<'a> {
    region: &'a str,
    service: &'a str,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    fn from_config(config: &'a Value) -> Result<Self, SigningError> {
        let field = |name: &str| config.get(name).and_then(Value::as_str);
        let required = |name: &str| {
            field(name).ok_or_else(|| SigningError::MissingCredential(name.to_string()))
        };
        Ok(Self {
            region: required("region")?,
            service: field("service").unwrap_or(DEFAULT_SERVICE),
            access_key_id: required("accessKeyId")?,
            secret_access_key: required("secretAccessKey")?,
            session_token: field("sessionToken"),
        })
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode_component(&k), encode_component(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// HMAC-SHA256 over `sha2`.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    const BLOCK_SIZE: usize = 64;

    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let hash = Sha256::digest(key);
        key_block[..hash.len()].copy_from_slice(&hash);
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let inner: Vec<u8> = key_block.iter().map(|k| k ^ 0x36).collect();
    let outer: Vec<u8> = key_block.iter().map(|k| k ^ 0x5c).collect();

    let mut hasher = Sha256::new();
    hasher.update(&inner);
    hasher.update(data);
    let inner_hash = hasher.finalize();

    let mut hasher = Sha256::new();
    hasher.update(&outer);
    hasher.update(inner_hash);
    hasher.finalize().to_vec()
}
