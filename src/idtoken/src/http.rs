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

pub use crate::errors::BoxError;
use bytes::Bytes;
use std::future::Future;

/// A trait for HTTP clients that can download certificate documents.
///
/// The [KeyResolver][crate::KeyResolver] issues a single `GET` request per
/// certificate document. Implement this trait to route those requests through
/// your own HTTP stack, or to return canned responses in tests.
///
/// Implementations return the response for any status code. Only failures to
/// send the request or to read the response are errors.
pub trait CertificateClient: std::fmt::Debug {
    /// Sends a `GET` request to `url` and returns the full response.
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<http::Response<Bytes>, BoxError>> + Send;
}

/// A module containing the dynamically-typed, dyn-compatible version of the
/// `CertificateClient` trait. This is an internal implementation detail.
pub(crate) mod dynamic {
    use super::BoxError;
    use bytes::Bytes;

    /// A dyn-compatible, crate-private version of `CertificateClient`.
    #[async_trait::async_trait]
    pub trait CertificateClient: Send + Sync + std::fmt::Debug {
        async fn get(&self, url: &str) -> Result<http::Response<Bytes>, BoxError>;
    }

    /// The public `CertificateClient` implements the dyn-compatible `CertificateClient`.
    #[async_trait::async_trait]
    impl<T> CertificateClient for T
    where
        T: super::CertificateClient + Send + Sync,
    {
        async fn get(&self, url: &str) -> Result<http::Response<Bytes>, BoxError> {
            T::get(self, url).await
        }
    }
}

/// The default [CertificateClient], based on [reqwest].
#[derive(Clone, Debug, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new client with the default `reqwest` configuration.
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<reqwest::Client> for ReqwestClient {
    /// Use a pre-configured client, for example, one with a timeout.
    fn from(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl CertificateClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<http::Response<Bytes>, BoxError> {
        let response = self.inner.get(url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut result = http::Response::new(body);
        *result.status_mut() = status;
        *result.headers_mut() = headers;
        Ok(result)
    }
}
