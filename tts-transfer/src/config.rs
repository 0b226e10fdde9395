/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use aws_smithy_async::rt::sleep::{default_async_sleep, SharedAsyncSleep};
use reqwest::Url;

use crate::error::{self, Error, ErrorKind};
use crate::transport::{HttpTransport, SharedTransport, Transport};
use crate::types::{KeyNaming, PollSettings};

pub(crate) mod loader;

/// Default `Content-Type` of the uploaded file
pub(crate) const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct Config {
    grant_endpoint: Url,
    poll_settings: PollSettings,
    naming: KeyNaming,
    content_type: String,
    sleep_impl: SharedAsyncSleep,
    transport: SharedTransport,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The grant API endpoint that issues pre-signed upload URLs
    pub fn grant_endpoint(&self) -> &Url {
        &self.grant_endpoint
    }

    /// Bounds of the existence-check loop
    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll_settings
    }

    /// How source file names map onto derived object keys
    pub fn naming(&self) -> &KeyNaming {
        &self.naming
    }

    /// `Content-Type` sent with the upload
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The sleep implementation used between existence checks
    pub fn sleep_impl(&self) -> &SharedAsyncSleep {
        &self.sleep_impl
    }

    /// The transport carrying out network calls
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    grant_endpoint: Option<String>,
    poll_settings: PollSettings,
    naming: KeyNaming,
    content_type: Option<String>,
    sleep_impl: Option<SharedAsyncSleep>,
    transport: Option<SharedTransport>,
    http_client: Option<reqwest::Client>,
    s3_client: Option<aws_sdk_s3::Client>,
    sdk_config: Option<aws_config::SdkConfig>,
}

impl Builder {
    /// The grant API endpoint, e.g. `https://abc123.execute-api.eu-west-1.amazonaws.com/prod`.
    /// Required.
    pub fn grant_endpoint(self, endpoint: impl Into<String>) -> Self {
        self.set_grant_endpoint(Some(endpoint.into()))
    }

    /// The grant API endpoint.
    pub fn set_grant_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.grant_endpoint = endpoint;
        self
    }

    /// The grant API endpoint.
    pub fn get_grant_endpoint(&self) -> Option<&str> {
        self.grant_endpoint.as_deref()
    }

    /// Maximum number of existence checks and the delay between them.
    ///
    /// Default is 15 checks, 3 seconds apart.
    pub fn poll_settings(mut self, settings: PollSettings) -> Self {
        self.poll_settings = settings;
        self
    }

    /// How source file names map onto derived object keys.
    ///
    /// Default accepts `.txt` files and waits for `audio/<stem>.mp3`.
    pub fn naming(mut self, naming: KeyNaming) -> Self {
        self.naming = naming;
        self
    }

    /// `Content-Type` sent with the upload. Must match what the URL was signed for.
    ///
    /// Default is `text/plain`.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sleep implementation used between existence checks.
    ///
    /// Default is the tokio based sleep.
    pub fn sleep_impl(mut self, sleep_impl: SharedAsyncSleep) -> Self {
        self.sleep_impl = Some(sleep_impl);
        self
    }

    /// Replace the transport entirely.
    ///
    /// When set, [`http_client`](Self::http_client) and [`s3_client`](Self::s3_client) are
    /// ignored.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set an explicit HTTP client for the grant and upload calls.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set an explicit S3 client to use for existence checks.
    ///
    /// NOTE: the client's region is used for every check instead of the granted region.
    pub fn s3_client(mut self, client: aws_sdk_s3::Client) -> Self {
        self.s3_client = Some(client);
        self
    }

    /// Base AWS configuration the per-region S3 clients are derived from.
    pub(crate) fn sdk_config(mut self, sdk_config: aws_config::SdkConfig) -> Self {
        self.sdk_config = Some(sdk_config);
        self
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Result<Config, Error> {
        let endpoint = self
            .grant_endpoint
            .ok_or_else(|| error::invalid_input("grant endpoint is required"))?;
        let grant_endpoint = Url::parse(&endpoint).map_err(error::invalid_input)?;
        if !matches!(grant_endpoint.scheme(), "http" | "https") {
            return Err(error::invalid_input(format!(
                "grant endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        if self.poll_settings.max_attempts() == 0 {
            return Err(error::invalid_input("max attempts must be at least 1"));
        }
        if self.naming.source_extension().is_empty() {
            return Err(error::invalid_input("source extension must not be empty"));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http = match self.http_client {
                    Some(http) => http,
                    None => reqwest::Client::builder()
                        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                        .build()
                        .map_err(error::from_kind(ErrorKind::RuntimeError))?,
                };
                let transport = match self.sdk_config {
                    Some(sdk_config) => HttpTransport::with_sdk_config(http, sdk_config),
                    None => HttpTransport::new(http),
                };
                let transport = match self.s3_client {
                    Some(client) => transport.with_s3_client(client),
                    None => transport,
                };
                Arc::new(transport)
            }
        };

        let sleep_impl = match self.sleep_impl {
            Some(sleep_impl) => sleep_impl,
            None => default_async_sleep()
                .ok_or("no default sleep implementation available")
                .map_err(error::from_kind(ErrorKind::RuntimeError))?,
        };

        Ok(Config {
            grant_endpoint,
            poll_settings: self.poll_settings,
            naming: self.naming,
            content_type: self
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
            sleep_impl,
            transport,
        })
    }
}
