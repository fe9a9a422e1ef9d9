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

//! Verify Google [OIDC ID tokens].
//!
//! [Verifier] validates an ID token issued by Google for an OAuth2 client.
//! This includes verifying the token's signature against Google's published
//! certificates, and validating its claims: the audience must be the client
//! id, the issuer must be Google, the token must not be expired nor older
//! than one hour, it must name a subject, and its `auth_time` (if any) must
//! not be in the future.
//!
//! ## Example: Verifying an ID token
//!
//! ```
//! # use google_cloud_idtoken::verifier::{Builder, Verifier, VerificationRequest};
//! let verifier = Builder::new().with_key_cache(true).build();
//!
//! async fn sign_in(verifier: &Verifier, token: &str) -> anyhow::Result<()> {
//!     let request = VerificationRequest::new(token, "my-client-id.apps.googleusercontent.com");
//!     let claims = verifier.verify(&request).await?;
//!
//!     println!("Hello: {:?}", claims["email"]);
//! #   Ok(())
//! }
//! ```
//!
//! [OIDC ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens

use crate::Result;
use crate::constants::{
    DEFAULT_CLOCK_SKEW, DEFAULT_MAX_TOKEN_AGE, GOOGLE_ISSUERS, OAUTH2_CERTS_URL,
};
use crate::errors::Error;
use crate::http::{CertificateClient, dynamic};
use crate::key_resolver::{KeyRequest, KeyResolver, ResolvedKey};
use jsonwebtoken::{Algorithm, Validation};
/// Represents a claim value in an ID token.
pub use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Represents the claims in an ID token.
pub type Claims = serde_json::Map<String, Value>;

/// The token to verify, and the audience it must be issued for.
///
/// Both fields are required, verification fails if either is `None`.
#[derive(Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct VerificationRequest {
    /// The ID token, in JWT compact serialization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// The OAuth2 client id. The token's `aud` claim must match this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl VerificationRequest {
    /// Creates a request to verify `id_token` for `client_id`.
    pub fn new<T: Into<String>, C: Into<String>>(id_token: T, client_id: C) -> Self {
        Self::default()
            .set_id_token(id_token)
            .set_client_id(client_id)
    }

    /// Sets the value of [id_token][VerificationRequest::id_token].
    pub fn set_id_token<T: Into<String>>(mut self, v: T) -> Self {
        self.id_token = Some(v.into());
        self
    }

    /// Sets the value of [client_id][VerificationRequest::client_id].
    pub fn set_client_id<T: Into<String>>(mut self, v: T) -> Self {
        self.client_id = Some(v.into());
        self
    }

    // An empty client id is accepted here. No real token has an empty `aud`,
    // so such requests fail the audience check.
    fn required_fields(&self) -> Result<(&str, &str)> {
        let id_token = self
            .id_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::invalid_argument("id_token"))?;
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| Error::invalid_argument("client_id"))?;
        Ok((id_token, client_id))
    }
}

impl std::fmt::Debug for VerificationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationRequest")
            .field("id_token", &self.id_token.as_ref().map(|_| "[censored]"))
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Builder is used construct a [Verifier] of ID tokens.
#[derive(Debug, Default)]
pub struct Builder {
    certificate_url: Option<String>,
    client: Option<Arc<dyn dynamic::CertificateClient>>,
    clock_skew: Option<Duration>,
    max_token_age: Option<Duration>,
    key_cache: bool,
}

impl Builder {
    /// Creates a builder with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// The URL of the document containing the certificates used to sign the
    /// ID tokens.
    ///
    /// If not provided, the Google OAuth2 certificates URL
    /// (`https://www.googleapis.com/oauth2/v1/certs`) is used.
    ///
    /// # Example
    ///
    /// ```
    /// # use google_cloud_idtoken::verifier::Builder;
    /// let verifier = Builder::new()
    ///     .with_certificate_url("https://certs.example.com/v1/certs")
    ///     .build();
    /// ```
    pub fn with_certificate_url<S: Into<String>>(mut self, url: S) -> Self {
        self.certificate_url = Some(url.into());
        self
    }

    /// The HTTP client used to download the certificates.
    ///
    /// If not provided, a [ReqwestClient][crate::http::ReqwestClient] is used.
    pub fn with_http_client<C>(mut self, client: C) -> Self
    where
        C: CertificateClient + Send + Sync + 'static,
    {
        self.client = Some(Arc::new(client));
        self
    }

    /// The acceptable clock skew when verifying the token's timestamps.
    ///
    /// This value is used to account for clock differences between the token
    /// issuer and the verifier. The default value is 5 minutes.
    ///
    /// # Example
    ///
    /// ```
    /// # use google_cloud_idtoken::verifier::Builder;
    /// # use std::time::Duration;
    /// let verifier = Builder::new()
    ///     .with_clock_skew(Duration::from_secs(60))
    ///     .build();
    /// ```
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = Some(clock_skew);
        self
    }

    /// The maximum time since the token was issued (its `iat` claim).
    ///
    /// The default value is one hour.
    pub fn with_max_token_age(mut self, max_token_age: Duration) -> Self {
        self.max_token_age = Some(max_token_age);
        self
    }

    /// Keep the public keys between verifications.
    ///
    /// By default the certificates are downloaded for every verification.
    /// When enabled, the keys are kept for as long as the certificate
    /// document's `Cache-Control` header allows.
    pub fn with_key_cache(mut self, enabled: bool) -> Self {
        self.key_cache = enabled;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_dyn_client(mut self, client: Arc<dyn dynamic::CertificateClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Returns a [Verifier] instance with the configured settings.
    pub fn build(self) -> Verifier {
        let resolver = match self.client {
            Some(client) => KeyResolver::from_dyn(client),
            None => KeyResolver::new(),
        };
        let resolver = if self.key_cache {
            resolver.with_cache()
        } else {
            resolver
        };
        Verifier {
            resolver,
            certificate_url: self
                .certificate_url
                .unwrap_or_else(|| OAUTH2_CERTS_URL.to_string()),
            clock_skew: self.clock_skew.unwrap_or(DEFAULT_CLOCK_SKEW),
            max_token_age: self.max_token_age.unwrap_or(DEFAULT_MAX_TOKEN_AGE),
        }
    }
}

/// Verifier is used to verify Google ID tokens.
///
/// The verifier is cheap to clone, clones share the HTTP client and, if
/// enabled, the key cache.
///
/// # Example
///
/// ```
/// # use google_cloud_idtoken::verifier::{Builder, VerificationRequest};
/// async fn verify_id_token(token: &str) {
///     let verifier = Builder::new().build();
///     let request = VerificationRequest::new(token, "my-client-id.apps.googleusercontent.com");
///
///     let claims = verifier.verify(&request).await.expect("Failed to verify ID token");
///     println!("Verified claims: {:?}", claims);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Verifier {
    resolver: KeyResolver,
    certificate_url: String,
    clock_skew: Duration,
    max_token_age: Duration,
}

impl Default for Verifier {
    fn default() -> Self {
        Builder::new().build()
    }
}

impl Verifier {
    /// Verifies the ID token in `request` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the verification steps fails. Use the
    /// predicates in [Error] to find out which one.
    pub async fn verify(&self, request: &VerificationRequest) -> Result<Claims> {
        let (id_token, client_id) = request.required_fields()?;

        let header = jsonwebtoken::decode_header(id_token).map_err(Error::decode)?;
        let key_id = header
            .kid
            .ok_or_else(|| Error::decode("the `kid` header is missing"))?;

        let now = jsonwebtoken::get_current_timestamp() as i64;
        let key_request = KeyRequest::new(key_id).with_certificate_url(&self.certificate_url);
        let key = self.resolver.resolve_public_key(&key_request).await?;

        let claims = self.verify_signature(id_token, client_id, &key, now)?;
        self.check_token_age(&claims, now)?;
        check_subject(&claims)?;
        check_auth_time(&claims, now)?;
        tracing::debug!(key_id = key.key_id(), "ID token verified");
        Ok(claims)
    }

    fn verify_signature(
        &self,
        id_token: &str,
        client_id: &str,
        key: &ResolvedKey,
        now: i64,
    ) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::RS256);
        // `jsonwebtoken` computes `now - leeway`, a skew past the epoch would underflow.
        validation.leeway = self.clock_skew.as_secs().min(now.max(0) as u64);
        validation.validate_nbf = true;
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let token = jsonwebtoken::decode::<Claims>(id_token, key.decoding_key(), &validation)
            .map_err(from_jwt_error)?;
        Ok(token.claims)
    }

    // `jsonwebtoken` has no equivalent of a maximum token age, so this is
    // checked here, with the same clock skew as the other timestamps.
    fn check_token_age(&self, claims: &Claims, now: i64) -> Result<()> {
        let iat = numeric_claim(claims, "iat").ok_or_else(|| {
            Error::claim_validation("the `iat` claim is missing or is not a number")
        })?;
        let age = now
            .checked_sub(iat)
            .ok_or_else(|| Error::claim_validation("the `iat` claim is out of range"))?;
        let skew = i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX);
        let max_age = i64::try_from(self.max_token_age.as_secs()).unwrap_or(i64::MAX);
        if age.saturating_sub(skew) > max_age {
            return Err(Error::claim_validation(format!(
                "the token was issued {age}s ago, the maximum age is {max_age}s"
            )));
        }
        if age < -skew {
            return Err(Error::claim_validation("the `iat` claim is in the future"));
        }
        Ok(())
    }
}

/// Verifies a Google ID token using a default [Verifier].
///
/// This downloads the Google OAuth2 certificates on every call. Applications
/// verifying many tokens should create a [Verifier] with
/// [with_key_cache][Builder::with_key_cache] instead.
pub async fn verify_google_id_token(request: &VerificationRequest) -> Result<Claims> {
    Verifier::default().verify(request).await
}

fn from_jwt_error(e: jsonwebtoken::errors::Error) -> Error {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidRsaKey(_) => Error::signature(e),
        _ => Error::claim_validation(e),
    }
}

fn numeric_claim(claims: &Claims, name: &str) -> Option<i64> {
    claims
        .get(name)
        .and_then(Value::as_f64)
        .map(|v| v.floor() as i64)
}

// A token without a subject is valid, but there is no user to sign in.
fn check_subject(claims: &Claims) -> Result<()> {
    match claims.get("sub").and_then(Value::as_str) {
        Some(sub) if !sub.is_empty() => Ok(()),
        Some(_) => Err(Error::post_check("sub", "the claim is empty")),
        None => Err(Error::post_check("sub", "the claim is missing")),
    }
}

// Only numeric values are checked, other types are ignored.
fn check_auth_time(claims: &Claims, now: i64) -> Result<()> {
    match claims.get("auth_time").and_then(Value::as_f64) {
        Some(auth_time) if auth_time > now as f64 => Err(Error::post_check(
            "auth_time",
            format!("authentication time {auth_time} is after the current time {now}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        MockClient, OTHER_KEY, SIGNING_KEY, TEST_CLIENT_ID, TEST_KEY_ID, TEST_SUBJECT,
        certificate_document, generate_test_id_token, now, sign_with, valid_claims,
    };
    use bytes::Bytes;
    use httptest::matchers::{all_of, request};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use serde_json::json;
    use serial_test::parallel;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    fn document_response() -> http::Response<Bytes> {
        http::Response::new(Bytes::from(certificate_document().to_string()))
    }

    // A verifier whose transport returns the test certificates.
    fn test_verifier(expected_fetches: usize) -> Verifier {
        let mut client = MockClient::new();
        client
            .expect_get()
            .withf(|url| url.to_string() == OAUTH2_CERTS_URL)
            .times(expected_fetches)
            .returning(|_| Ok(document_response()));
        Builder::new().with_dyn_client(Arc::new(client)).build()
    }

    fn request_for(claims: &Claims) -> VerificationRequest {
        VerificationRequest::new(generate_test_id_token(claims), TEST_CLIENT_ID)
    }

    #[test]
    fn builder_defaults() {
        let verifier = Builder::new().build();
        assert_eq!(verifier.certificate_url, OAUTH2_CERTS_URL);
        assert_eq!(verifier.clock_skew, Duration::from_secs(300));
        assert_eq!(verifier.max_token_age, Duration::from_secs(3600));

        let verifier = Builder::new()
            .with_certificate_url("https://example.com/certs")
            .with_clock_skew(Duration::from_secs(10))
            .with_max_token_age(Duration::from_secs(60))
            .build();
        assert_eq!(verifier.certificate_url, "https://example.com/certs");
        assert_eq!(verifier.clock_skew, Duration::from_secs(10));
        assert_eq!(verifier.max_token_age, Duration::from_secs(60));
    }

    #[test]
    fn request_debug_censors_token() {
        let request = VerificationRequest::new("secret-token-value", TEST_CLIENT_ID);
        let got = format!("{request:?}");
        assert!(!got.contains("secret-token-value"), "{got}");
        assert!(got.contains("[censored]"), "{got}");
        assert!(got.contains(TEST_CLIENT_ID), "{got}");
    }

    #[test]
    fn request_serde() -> TestResult {
        let request: VerificationRequest =
            serde_json::from_value(json!({"idToken": "abc", "clientId": "client"}))?;
        assert_eq!(request, VerificationRequest::new("abc", "client"));

        let request: VerificationRequest = serde_json::from_value(json!({"idToken": "abc"}))?;
        assert_eq!(request.client_id, None);
        assert_eq!(serde_json::to_value(&request)?, json!({"idToken": "abc"}));
        Ok(())
    }

    #[tokio::test]
    async fn verify_success() -> TestResult {
        let verifier = test_verifier(1);
        let claims = verifier.verify(&request_for(&valid_claims())).await?;
        assert_eq!(claims["sub"], TEST_SUBJECT);
        assert_eq!(claims["aud"], TEST_CLIENT_ID);
        assert_eq!(claims["email"], "alice@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn verify_success_short_issuer() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("iss".into(), "accounts.google.com".into());
        let got = verifier.verify(&request_for(&claims)).await?;
        assert_eq!(got["iss"], "accounts.google.com");
        Ok(())
    }

    #[tokio::test]
    async fn verify_returns_all_claims() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("hd".into(), "example.com".into());
        claims.insert("nonce".into(), json!({"nested": [1, 2, 3]}));
        let got = verifier.verify(&request_for(&claims)).await?;
        assert_eq!(got, claims);
        Ok(())
    }

    #[tokio::test]
    async fn verify_is_idempotent() -> TestResult {
        let verifier = test_verifier(2);
        let request = request_for(&valid_claims());
        let first = verifier.verify(&request).await?;
        let second = verifier.verify(&request).await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn verify_with_key_cache() -> TestResult {
        let mut client = MockClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(document_response()));
        let verifier = Builder::new()
            .with_dyn_client(Arc::new(client))
            .with_key_cache(true)
            .build();

        let request = request_for(&valid_claims());
        let first = verifier.verify(&request).await?;
        let second = verifier.clone().verify(&request).await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test_case(VerificationRequest::default(), "id_token"; "empty request")]
    #[test_case(VerificationRequest::default().set_client_id(TEST_CLIENT_ID), "id_token"; "missing token")]
    #[test_case(VerificationRequest::new("", TEST_CLIENT_ID), "id_token"; "empty token")]
    #[test_case(VerificationRequest::default().set_id_token("a.b.c"), "client_id"; "missing client id")]
    #[tokio::test]
    async fn verify_invalid_argument(request: VerificationRequest, field: &str) {
        // No expectations: any request to the transport fails the test.
        let client = MockClient::new();
        let verifier = Builder::new().with_dyn_client(Arc::new(client)).build();
        let err = verifier.verify(&request).await.unwrap_err();
        assert!(err.is_invalid_argument(), "{err:?}");
        assert!(err.to_string().contains(field), "{err}");
    }

    #[tokio::test]
    async fn verify_empty_client_id_fails_audience() -> TestResult {
        let verifier = test_verifier(1);
        let request = VerificationRequest::new(generate_test_id_token(&valid_claims()), "");
        let err = verifier.verify(&request).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        Ok(())
    }

    #[test_case("invalid.token.format"; "bad base64")]
    #[test_case("not-a-jwt"; "no dots")]
    #[test_case("eyJhbGciOiJSUzI1NiJ9.e30.c2ln"; "missing kid")]
    #[tokio::test]
    async fn verify_decode_error(token: &str) {
        let client = MockClient::new();
        let verifier = Builder::new().with_dyn_client(Arc::new(client)).build();
        let err = verifier
            .verify(&VerificationRequest::new(token, TEST_CLIENT_ID))
            .await
            .unwrap_err();
        assert!(err.is_decode(), "{err:?}");
    }

    #[tokio::test]
    async fn verify_key_fetch_error() -> TestResult {
        let mut client = MockClient::new();
        client.expect_get().times(1).returning(|_| {
            let mut response =
                http::Response::new(Bytes::from_static(br#"{"error":{"message":"server down"}}"#));
            *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            Ok(response)
        });
        let verifier = Builder::new().with_dyn_client(Arc::new(client)).build();
        let err = verifier
            .verify(&request_for(&valid_claims()))
            .await
            .unwrap_err();
        assert!(err.is_key_fetch(), "{err:?}");
        assert_eq!(err.to_string(), "server down");
        assert_eq!(err.http_status_code(), Some(500));
        Ok(())
    }

    #[tokio::test]
    async fn verify_key_not_found() -> TestResult {
        let verifier = test_verifier(1);
        let token = sign_with(SIGNING_KEY, Some("rotated-key-id"), &valid_claims());
        let err = verifier
            .verify(&VerificationRequest::new(token, TEST_CLIENT_ID))
            .await
            .unwrap_err();
        assert!(err.is_key_not_found(), "{err:?}");
        assert!(err.to_string().contains("rotated-key-id"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_signature_error() -> TestResult {
        let verifier = test_verifier(1);
        // Signed with a different key, but claiming to use the test key.
        let token = sign_with(OTHER_KEY, Some(TEST_KEY_ID), &valid_claims());
        let err = verifier
            .verify(&VerificationRequest::new(token, TEST_CLIENT_ID))
            .await
            .unwrap_err();
        assert!(err.is_signature(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_tampered_payload() -> TestResult {
        let verifier = test_verifier(1);
        let token = generate_test_id_token(&valid_claims());
        let mut other = valid_claims();
        other.insert("sub".into(), "someone-else".into());
        let other = generate_test_id_token(&other);

        // Splice the payload of one token with the signature of another.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        let err = verifier
            .verify(&VerificationRequest::new(tampered, TEST_CLIENT_ID))
            .await
            .unwrap_err();
        assert!(err.is_signature(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_invalid_audience() -> TestResult {
        let verifier = test_verifier(1);
        let request = VerificationRequest::new(
            generate_test_id_token(&valid_claims()),
            "another-client-id.apps.googleusercontent.com",
        );
        let err = verifier.verify(&request).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        Ok(())
    }

    #[test_case("https://wrong-issuer.com")]
    #[test_case("https://securetoken.google.com/my-project")]
    #[test_case("http://accounts.google.com")]
    #[tokio::test]
    async fn verify_invalid_issuer(issuer: &str) {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("iss".into(), issuer.into());
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
    }

    #[tokio::test]
    async fn verify_expired_token() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        let now = now();
        claims.insert("iat".into(), json!(now - 1800));
        // Expired beyond the 5 minute clock skew.
        claims.insert("exp".into(), json!(now - 600));
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_clock_skew() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        let now = now();
        claims.insert("iat".into(), json!(now - 1800));
        // Expired, but within the 5 minute clock skew.
        claims.insert("exp".into(), json!(now - 60));
        verifier.verify(&request_for(&claims)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_too_old() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        let now = now();
        // Issued 2 hours ago, not expired yet.
        claims.insert("iat".into(), json!(now - 7200));
        claims.insert("exp".into(), json!(now + 3600));
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        assert!(err.to_string().contains("maximum age"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_issued_in_the_future() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("iat".into(), json!(now() + 1200));
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn verify_not_yet_valid() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("nbf".into(), json!(now() + 1200));
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{err:?}");
        Ok(())
    }

    #[test_case("iat")]
    #[test_case("exp")]
    #[test_case("iss")]
    #[test_case("aud")]
    #[tokio::test]
    async fn verify_missing_standard_claim(name: &str) {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.remove(name);
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{name} {err:?}");
    }

    #[test_case(json!(-1e30); "far past")]
    #[test_case(json!(i64::MIN); "minimum integer")]
    #[test_case(json!(1e30); "far future")]
    #[test_case(json!("yesterday"); "not a number")]
    #[tokio::test]
    async fn verify_out_of_range_iat(iat: Value) {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("iat".into(), iat.clone());
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_claim_validation(), "{iat} {err:?}");
    }

    #[tokio::test]
    async fn verify_with_unbounded_durations() -> TestResult {
        let mut client = MockClient::new();
        client
            .expect_get()
            .times(1)
            .returning(|_| Ok(document_response()));
        let verifier = Builder::new()
            .with_dyn_client(Arc::new(client))
            .with_clock_skew(Duration::MAX)
            .with_max_token_age(Duration::MAX)
            .build();

        let mut claims = valid_claims();
        claims.insert("iat".into(), json!(-1_000_000));
        let got = verifier.verify(&request_for(&claims)).await?;
        assert_eq!(got["sub"], TEST_SUBJECT);
        Ok(())
    }

    #[test_case(None; "missing")]
    #[test_case(Some(json!("")); "empty")]
    #[test_case(Some(json!(12345)); "not a string")]
    #[tokio::test]
    async fn verify_invalid_subject(sub: Option<Value>) {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        match sub {
            None => claims.remove("sub"),
            Some(v) => claims.insert("sub".into(), v),
        };
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_post_check(), "{err:?}");
        assert!(err.to_string().contains("`sub`"), "{err}");
    }

    #[tokio::test]
    async fn verify_auth_time_in_the_future() -> TestResult {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        claims.insert("auth_time".into(), json!(now() + 60));
        let err = verifier.verify(&request_for(&claims)).await.unwrap_err();
        assert!(err.is_post_check(), "{err:?}");
        assert!(err.to_string().contains("`auth_time`"), "{err}");
        Ok(())
    }

    #[test_case(None; "missing")]
    #[test_case(Some(json!("in the future")); "not a number")]
    #[tokio::test]
    async fn verify_auth_time_ignored(auth_time: Option<Value>) {
        let verifier = test_verifier(1);
        let mut claims = valid_claims();
        match auth_time {
            None => claims.remove("auth_time"),
            Some(v) => claims.insert("auth_time".into(), v),
        };
        let got = verifier.verify(&request_for(&claims)).await;
        assert!(got.is_ok(), "{got:?}");
    }

    #[test]
    fn post_checks() {
        let now = 1_700_000_000;
        let mut claims = Claims::new();
        assert!(check_subject(&claims).is_err());
        claims.insert("sub".into(), "abc".into());
        assert!(check_subject(&claims).is_ok());

        assert!(check_auth_time(&claims, now).is_ok());
        claims.insert("auth_time".into(), json!(now));
        assert!(check_auth_time(&claims, now).is_ok());
        claims.insert("auth_time".into(), json!(now + 1));
        assert!(check_auth_time(&claims, now).is_err());
        claims.insert("auth_time".into(), json!(now as f64 + 0.5));
        assert!(check_auth_time(&claims, now).is_err());
    }

    #[tokio::test]
    #[parallel]
    async fn verify_over_http() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method("GET"),
                request::path("/oauth2/v1/certs"),
            ])
            .times(1)
            .respond_with(json_encoded(certificate_document())),
        );

        let verifier = Builder::new()
            .with_certificate_url(format!("http://{}/oauth2/v1/certs", server.addr()))
            .build();
        let claims = verifier.verify(&request_for(&valid_claims())).await?;
        assert_eq!(claims["sub"], TEST_SUBJECT);
        Ok(())
    }

    #[tokio::test]
    #[parallel]
    async fn verify_over_http_error() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::path("/oauth2/v1/certs"))
                .times(1)
                .respond_with(status_code(404)),
        );

        let verifier = Builder::new()
            .with_certificate_url(format!("http://{}/oauth2/v1/certs", server.addr()))
            .build();
        let err = verifier
            .verify(&request_for(&valid_claims()))
            .await
            .unwrap_err();
        assert!(err.is_key_fetch(), "{err:?}");
        assert_eq!(err.http_status_code(), Some(404));
        Ok(())
    }
}
