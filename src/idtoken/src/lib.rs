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

//! Google Cloud Client Libraries for Rust - ID Token Verification
//!
//! This crate verifies [OIDC ID tokens] issued by Google. Verification
//! fetches Google's published signing certificates, finds the certificate
//! named by the token's `kid` header, checks the signature and the standard
//! claims (audience, issuer, expiration, token age), and then checks that the
//! token identifies a subject and was not authenticated in the future.
//!
//! ## Example
//!
//! ```no_run
//! # use google_cloud_idtoken::{VerificationRequest, verify_google_id_token};
//! # async fn sample(token: &str) -> anyhow::Result<()> {
//! let request = VerificationRequest::new(token, "my-client-id.apps.googleusercontent.com");
//! let claims = verify_google_id_token(&request).await?;
//! println!("Hello: {:?}", claims["sub"]);
//! # Ok(())
//! # }
//! ```
//!
//! Applications verifying many tokens should create a single [Verifier] and
//! share it. The verifier can optionally cache the public keys, see
//! [verifier::Builder::with_key_cache].
//!
//! [OIDC ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens

pub mod errors;

/// The transport used to download certificate documents.
pub mod http;

/// Resolve the public key named by an ID token.
pub mod key_resolver;

pub mod verifier;

pub(crate) mod constants;
pub(crate) mod key_cache;

pub use key_resolver::{KeyRequest, KeyResolver, ResolvedKey};
pub use verifier::{Claims, VerificationRequest, Verifier, verify_google_id_token};

/// A `Result` alias where the `Err` case is `google_cloud_idtoken::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
