// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Google publishes the certificates used to sign its ID tokens as a JSON
//! object, mapping each key id to a PEM-encoded X.509 certificate. The
//! [KeyResolver] downloads that document and extracts the public key named
//! by a token's `kid` header.
//!
//! ## Example
//!
//! ```no_run
//! # use google_cloud_idtoken::{KeyRequest, KeyResolver};
//! # async fn sample() -> anyhow::Result<()> {
//! let resolver = KeyResolver::new();
//! let request = KeyRequest::new("6f7254101f56e41cf35c9926de84a2d552b4c6f1")
//!     .with_certificate_url("https://www.googleapis.com/oauth2/v1/certs");
//! let key = resolver.resolve_public_key(&request).await?;
//! println!("resolved key {}", key.key_id());
//! # Ok(())
//! # }
//! ```

use crate::Result;
use crate::constants::{FETCH_ERROR_MESSAGE, SECURETOKEN_CERTS_URL};
use crate::errors::Error;
use crate::http::{CertificateClient, ReqwestClient, dynamic};
use crate::key_cache::{KeyCache, time_to_live};
use jsonwebtoken::DecodingKey;
use serde_json::{Map, Value};
use std::sync::Arc;
use x509_parser::public_key::PublicKey;

/// The key to resolve, and where to find it.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyRequest {
    key_id: String,
    certificate_url: Option<String>,
}

impl KeyRequest {
    /// Creates a request for the key named `key_id`, from the default
    /// certificate document.
    pub fn new<S: Into<String>>(key_id: S) -> Self {
        Self {
            key_id: key_id.into(),
            certificate_url: None,
        }
    }

    /// Download the certificates from `url`.
    ///
    /// The default is the document used to sign Firebase and Identity
    /// Platform tokens.
    pub fn with_certificate_url<S: Into<String>>(mut self, url: S) -> Self {
        self.certificate_url = Some(url.into());
        self
    }

    /// The key id, as found in the token's `kid` header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The URL of the certificate document.
    pub fn certificate_url(&self) -> &str {
        self.certificate_url
            .as_deref()
            .unwrap_or(SECURETOKEN_CERTS_URL)
    }
}

/// A public key, ready to verify token signatures.
#[derive(Clone, Debug)]
pub struct ResolvedKey {
    key_id: String,
    key: DecodingKey,
}

impl ResolvedKey {
    pub(crate) fn new<S: Into<String>>(key_id: S, key: DecodingKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }

    /// The id of the certificate this key was extracted from.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

/// Downloads certificate documents and extracts public keys.
///
/// By default every call to [resolve_public_key][KeyResolver::resolve_public_key]
/// downloads the certificate document. Use [with_cache][KeyResolver::with_cache]
/// to keep the keys until the document expires.
#[derive(Clone, Debug)]
pub struct KeyResolver {
    client: Arc<dyn dynamic::CertificateClient>,
    cache: Option<KeyCache>,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver {
    /// Creates a resolver using [ReqwestClient] and no cache.
    pub fn new() -> Self {
        Self::with_client(ReqwestClient::new())
    }

    /// Creates a resolver that downloads certificates using `client`.
    pub fn with_client<C>(client: C) -> Self
    where
        C: CertificateClient + Send + Sync + 'static,
    {
        Self::from_dyn(Arc::new(client))
    }

    pub(crate) fn from_dyn(client: Arc<dyn dynamic::CertificateClient>) -> Self {
        Self {
            client,
            cache: None,
        }
    }

    /// Keep the resolved keys for as long as the certificate document allows.
    ///
    /// The lifetime is taken from the `max-age` directive in the response's
    /// `Cache-Control` header, and defaults to one hour.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(KeyCache::new());
        self
    }

    /// Returns the public key in the certificate named by `request`.
    ///
    /// # Errors
    ///
    /// Returns an error where [is_key_fetch][Error::is_key_fetch] is `true`
    /// if the certificate document cannot be downloaded or parsed, and an
    /// error where [is_key_not_found][Error::is_key_not_found] is `true` if
    /// the document does not contain the requested key.
    pub async fn resolve_public_key(&self, request: &KeyRequest) -> Result<ResolvedKey> {
        let key_id = request.key_id();
        let certificate_url = request.certificate_url();
        if let Some(cache) = &self.cache {
            if let Some(key) = cache.get(certificate_url, key_id).await {
                tracing::debug!(key_id, certificate_url, "using cached public key");
                return Ok(key);
            }
        }

        tracing::debug!(key_id, certificate_url, "fetching certificate document");
        let response = self.client.get(certificate_url).await.map_err(Error::io)?;
        let (parts, body) = response.into_parts();
        if !parts.status.is_success() {
            let message = error_message(&body);
            return Err(Error::http_status(parts.status, message));
        }

        let document = serde_json::from_slice::<Map<String, Value>>(&body).map_err(|e| {
            Error::bad_certificate("the response is not a certificate document", e)
        })?;
        // Only the requested entry needs to be a certificate.
        let pem = match document.get(key_id) {
            None => return Err(Error::key_not_found(key_id)),
            Some(Value::String(pem)) => pem,
            Some(_) => {
                return Err(Error::bad_certificate(
                    format!("the certificate for key `{key_id}` is not a string"),
                    "unexpected JSON type",
                ));
            }
        };
        let key = ResolvedKey::new(key_id, parse_certificate(key_id, pem)?);

        if let Some(cache) = &self.cache {
            let ttl = time_to_live(&parts.headers);
            if !ttl.is_zero() {
                cache.insert(certificate_url, key.clone(), ttl).await;
            }
        }
        Ok(key)
    }
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(serde::Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Google APIs report errors as `{"error": {"message": "...", ...}}`.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| FETCH_ERROR_MESSAGE.to_string())
}

/// Extracts the RSA public key in a PEM-encoded X.509 certificate.
fn parse_certificate(key_id: &str, pem: &str) -> Result<DecodingKey> {
    let invalid = |e: String| {
        Error::bad_certificate(format!("cannot parse the certificate for key `{key_id}`"), e)
    };
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| invalid(e.to_string()))?;
    let certificate = pem.parse_x509().map_err(|e| invalid(e.to_string()))?;
    let public_key = certificate.public_key();
    match public_key.parsed() {
        Ok(PublicKey::RSA(_)) => {}
        Ok(_) => {
            return Err(invalid(
                "the certificate does not contain an RSA key".to_string(),
            ));
        }
        Err(e) => return Err(invalid(e.to_string())),
    }
    // For RSA keys the `subjectPublicKey` bit string is the PKCS#1
    // `RSAPublicKey` structure.
    Ok(DecodingKey::from_rsa_der(&public_key.subject_public_key.data))
}
