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

//! Errors returned while verifying ID tokens.
//!
//! Any error means the token is not verified. Applications must not use any
//! of the token's claims when verification fails.

use http::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for ID token verification.
///
/// The error is opaque, use the `is_*()` predicates to find out what step of
/// the verification failed.
///
/// # Example
///
/// ```
/// # use google_cloud_idtoken::{VerificationRequest, Verifier};
/// async fn check(verifier: &Verifier, request: &VerificationRequest) {
///     match verifier.verify(request).await {
///         Ok(claims) => println!("welcome {:?}", claims["sub"]),
///         Err(e) if e.is_transient() => println!("try again later: {e}"),
///         Err(e) => println!("rejected: {e}"),
///     }
/// }
/// ```
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// A required field in the verification request is missing.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.0, ErrorKind::InvalidArgument(_))
    }

    /// The token header could not be decoded, or it does not name a key.
    pub fn is_decode(&self) -> bool {
        matches!(self.0, ErrorKind::Decode(_))
    }

    /// A problem fetching or parsing the certificate document.
    pub fn is_key_fetch(&self) -> bool {
        matches!(
            self.0,
            ErrorKind::KeyFetch { .. } | ErrorKind::Certificate { .. }
        )
    }

    /// The certificate document does not contain the key named by the token.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self.0, ErrorKind::KeyNotFound(_))
    }

    /// The token signature could not be verified with the resolved key.
    pub fn is_signature(&self) -> bool {
        matches!(self.0, ErrorKind::Signature(_))
    }

    /// One of the standard claims (audience, issuer, expiration, token age)
    /// is invalid.
    pub fn is_claim_validation(&self) -> bool {
        matches!(self.0, ErrorKind::ClaimValidation(_))
    }

    /// The token is correctly signed, but it is unusable to identify a user.
    pub fn is_post_check(&self) -> bool {
        matches!(self.0, ErrorKind::PostCheck { .. })
    }

    /// The HTTP status code returned by the certificate endpoint, if any.
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.0 {
            ErrorKind::KeyFetch { status, .. } => status.map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if repeating the whole verification may succeed.
    ///
    /// The library never retries. Applications may use this to decide if
    /// they want to.
    pub fn is_transient(&self) -> bool {
        match &self.0 {
            ErrorKind::KeyFetch {
                status: Some(status),
                ..
            } => is_retryable(*status),
            ErrorKind::KeyFetch {
                status: None,
                source,
                ..
            } => source.is_some(),
            _ => false,
        }
    }

    pub(crate) fn invalid_argument(field: &'static str) -> Error {
        Error(ErrorKind::InvalidArgument(field))
    }

    pub(crate) fn decode<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Decode(source.into()))
    }

    /// The certificate endpoint could not be reached, or its response could
    /// not be read.
    pub(crate) fn io<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::KeyFetch {
            status: None,
            message: "cannot send request or read the response".to_string(),
            source: Some(source.into()),
        })
    }

    /// The certificate endpoint returned an error status.
    pub(crate) fn http_status<S: Into<String>>(status: StatusCode, message: S) -> Error {
        Error(ErrorKind::KeyFetch {
            status: Some(status),
            message: message.into(),
            source: None,
        })
    }

    /// The certificate endpoint returned something other than a certificate
    /// document, or the certificate is unusable.
    pub(crate) fn bad_certificate<S, T>(message: S, source: T) -> Error
    where
        S: Into<String>,
        T: Into<BoxError>,
    {
        Error(ErrorKind::Certificate {
            message: message.into(),
            source: source.into(),
        })
    }

    pub(crate) fn key_not_found<S: Into<String>>(key_id: S) -> Error {
        Error(ErrorKind::KeyNotFound(key_id.into()))
    }

    pub(crate) fn signature<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Signature(source.into()))
    }

    pub(crate) fn claim_validation<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::ClaimValidation(source.into()))
    }

    pub(crate) fn post_check<S: Into<String>>(claim: &'static str, message: S) -> Error {
        Error(ErrorKind::PostCheck {
            claim,
            message: message.into(),
        })
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("missing required argument `{0}`")]
    InvalidArgument(&'static str),
    #[error("cannot decode the ID token: {0}")]
    Decode(#[source] BoxError),
    #[error("{message}")]
    KeyFetch {
        status: Option<StatusCode>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    #[error("{message}")]
    Certificate {
        message: String,
        #[source]
        source: BoxError,
    },
    #[error("public key `{0}` not found")]
    KeyNotFound(String),
    #[error("the ID token signature is invalid: {0}")]
    Signature(#[source] BoxError),
    #[error("the ID token claims are invalid: {0}")]
    ClaimValidation(#[source] BoxError),
    #[error("unexpected `{claim}` claim value: {message}")]
    PostCheck {
        claim: &'static str,
        message: String,
    },
}

pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}
