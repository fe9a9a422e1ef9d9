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

use std::time::Duration;

/// The x509 certificates used to sign Firebase and Identity Platform tokens.
pub(crate) const SECURETOKEN_CERTS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// The x509 certificates used to sign Google OAuth2 ID tokens.
pub(crate) const OAUTH2_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

/// The issuers Google uses in the `iss` claim of its ID tokens.
pub(crate) const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

pub(crate) const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);
pub(crate) const DEFAULT_MAX_TOKEN_AGE: Duration = Duration::from_secs(60 * 60);

// Used when the certificate response does not say how long it can be cached.
pub(crate) const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

pub(crate) const FETCH_ERROR_MESSAGE: &str = "failed to fetch the public key";
