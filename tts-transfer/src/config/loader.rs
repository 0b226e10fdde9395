/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_config::BehaviorVersion;

use crate::config::Builder;
use crate::error::Error;
use crate::types::{KeyNaming, PollSettings};
use crate::Config;

/// Environment variable consulted for the grant endpoint when none is set explicitly
pub(crate) const GRANT_ENDPOINT_ENV: &str = "TTS_TRANSFER_GRANT_ENDPOINT";

/// Load [`Config`] from the environment.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
}

impl ConfigLoader {
    /// The grant API endpoint that issues pre-signed upload URLs.
    ///
    /// Falls back to the `TTS_TRANSFER_GRANT_ENDPOINT` environment variable when not set.
    pub fn grant_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.builder = self.builder.grant_endpoint(endpoint);
        self
    }

    /// Maximum number of existence checks and the delay between them.
    ///
    /// Default is 15 checks, 3 seconds apart.
    pub fn poll_settings(mut self, settings: PollSettings) -> Self {
        self.builder = self.builder.poll_settings(settings);
        self
    }

    /// How source file names map onto derived object keys.
    pub fn naming(mut self, naming: KeyNaming) -> Self {
        self.builder = self.builder.naming(naming);
        self
    }

    /// `Content-Type` sent with the upload.
    ///
    /// Default is `text/plain`.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Load the default configuration
    ///
    /// If fields have been overridden during builder construction, the override values will be
    /// used. Otherwise, the default values for each field will be provided. The shared AWS
    /// configuration (endpoint overrides, HTTP settings) is loaded from the environment without
    /// credentials since existence checks are anonymous.
    pub async fn load(self) -> Result<Config, Error> {
        let mut builder = self.builder;
        if builder.get_grant_endpoint().is_none() {
            builder = builder.set_grant_endpoint(std::env::var(GRANT_ENDPOINT_ENV).ok());
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .load()
            .await;

        builder.sdk_config(sdk_config).build()
    }
}
