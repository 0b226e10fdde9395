/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Region;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::error::{self, Error};
use crate::types::{PollTarget, UploadGrant, UploadRequest};

/// The network calls a transfer is made of.
///
/// [`HttpTransport`] is used unless a different implementation is configured with
/// [`Builder::transport`](crate::config::Builder::transport).
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Ask the grant API at `endpoint` for a pre-signed upload target for `file_name`.
    async fn request_grant(&self, endpoint: &Url, file_name: &str) -> Result<UploadGrant, Error>;

    /// Write the full content of `request` to the pre-signed URL of `grant`.
    async fn upload(
        &self,
        grant: &UploadGrant,
        request: &UploadRequest,
        content_type: &str,
    ) -> Result<(), Error>;

    /// Metadata-only probe for the derived object.
    ///
    /// `Ok(false)` means the object does not exist (yet). Errors are advisory; the poll loop
    /// treats them the same as a missing object.
    async fn object_exists(&self, target: &PollTarget) -> Result<bool, Error>;
}

/// Reference counted [`Transport`]
pub type SharedTransport = Arc<dyn Transport>;

/// Default [`Transport`]: `reqwest` for the grant API and the pre-signed write, Amazon S3
/// `HeadObject` for existence checks.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    s3: S3Clients,
}

#[derive(Debug, Clone)]
enum S3Clients {
    /// Use the given client for every check regardless of the granted region
    Explicit(aws_sdk_s3::Client),

    /// Build an anonymous client per region from a shared base configuration
    PerRegion {
        base: Arc<OnceCell<SdkConfig>>,
        clients: Arc<Mutex<HashMap<String, aws_sdk_s3::Client>>>,
    },
}

/// Characters left unescaped in a query value, matching JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Error body returned by the grant API when it rejects a request
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

impl HttpTransport {
    /// Create a new transport using the given HTTP client for the grant and upload calls.
    ///
    /// Existence checks use anonymous (unsigned) S3 clients, one per granted region, with SDK
    /// retries disabled.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            s3: S3Clients::PerRegion {
                base: Arc::new(OnceCell::new()),
                clients: Default::default(),
            },
        }
    }

    /// Create a new transport that derives its per-region S3 clients from `base`.
    pub fn with_sdk_config(http: reqwest::Client, base: SdkConfig) -> Self {
        Self {
            http,
            s3: S3Clients::PerRegion {
                base: Arc::new(OnceCell::new_with(Some(base))),
                clients: Default::default(),
            },
        }
    }

    /// Use an explicit S3 client for existence checks.
    ///
    /// NOTE: the client's own region is used; the region from the grant is ignored.
    pub fn with_s3_client(mut self, client: aws_sdk_s3::Client) -> Self {
        self.s3 = S3Clients::Explicit(client);
        self
    }

    async fn s3_client(&self, region: &str) -> aws_sdk_s3::Client {
        match &self.s3 {
            S3Clients::Explicit(client) => client.clone(),
            S3Clients::PerRegion { base, clients } => {
                let base = base
                    .get_or_init(|| async {
                        aws_config::defaults(BehaviorVersion::latest())
                            .no_credentials()
                            .load()
                            .await
                    })
                    .await;
                let mut clients = clients.lock().unwrap_or_else(|e| e.into_inner());
                clients
                    .entry(region.to_owned())
                    .or_insert_with(|| {
                        tracing::debug!("creating anonymous S3 client for region {region}");
                        let conf = aws_sdk_s3::config::Builder::from(base)
                            .region(Region::new(region.to_owned()))
                            .retry_config(RetryConfig::disabled())
                            .build();
                        aws_sdk_s3::Client::from_conf(conf)
                    })
                    .clone()
            }
        }
    }
}

/// Append `filename=<name>` to the endpoint, percent-encoding the name.
///
/// Spaces become `%20`, not the `+` of form encoding.
fn grant_url(endpoint: &Url, file_name: &str) -> Url {
    let filename = format!("filename={}", utf8_percent_encode(file_name, URI_COMPONENT));
    let query = match endpoint.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{filename}"),
        _ => filename,
    };
    let mut url = endpoint.clone();
    url.set_query(Some(&query));
    url
}

/// Describe a non-success response as `<status> - <detail>`.
fn status_detail(status: StatusCode, body: &str) -> String {
    let detail = match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error,
        Err(_) if body.trim().is_empty() => status.canonical_reason().unwrap_or_default().to_owned(),
        Err(_) => body.trim().to_owned(),
    };
    format!("{} - {}", status.as_u16(), detail)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request_grant(&self, endpoint: &Url, file_name: &str) -> Result<UploadGrant, Error> {
        let resp = self
            .http
            .get(grant_url(endpoint, file_name))
            .send()
            .instrument(tracing::debug_span!("send-grant-request"))
            .await
            .map_err(error::grant_failed)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(error::grant_failed)?;
        if !status.is_success() {
            return Err(error::grant_failed(status_detail(
                status,
                &String::from_utf8_lossy(&body),
            )));
        }

        UploadGrant::from_json_slice(&body)
    }

    async fn upload(
        &self,
        grant: &UploadGrant,
        request: &UploadRequest,
        content_type: &str,
    ) -> Result<(), Error> {
        let resp = self
            .http
            .put(grant.upload_url())
            .header(CONTENT_TYPE, content_type)
            .body(request.content().clone())
            .send()
            .instrument(tracing::debug_span!(
                "send-presigned-put",
                content_length = request.content_length()
            ))
            .await
            .map_err(error::upload_failed)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(error::upload_failed(format!(
                "{} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn object_exists(&self, target: &PollTarget) -> Result<bool, Error> {
        let client = self.s3_client(target.region()).await;
        let resp = client
            .head_object()
            .bucket(target.bucket())
            .key(target.derived_key())
            .send()
            .instrument(tracing::debug_span!("send-head-object"))
            .await;

        match resp {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(error::discovery_failed(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{grant_url, status_detail, HttpTransport, S3Clients, Transport};
    use crate::error::ErrorKind;
    use crate::types::PollTarget;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
    use aws_sdk_s3::types::error::NotFound;
    use aws_smithy_mocks_experimental::{mock, mock_client, RuleMode};
    use aws_smithy_runtime_api::client::http::{
        HttpClient, HttpConnector, HttpConnectorFuture, HttpConnectorSettings,
        SharedHttpConnector,
    };
    use aws_smithy_runtime_api::client::orchestrator::{HttpRequest, HttpResponse};
    use aws_smithy_runtime_api::client::runtime_components::RuntimeComponents;
    use aws_smithy_runtime_api::http::StatusCode;
    use bytes::Bytes;
    use aws_smithy_types::body::SdkBody;
    use reqwest::{StatusCode as HttpStatus, Url};
    use std::sync::{Arc, Mutex};

    /// Method, URI and `authorization` header of a request sent to S3
    type Recorded = (String, String, Option<String>);

    /// Answers every request with an empty 200 and records it
    #[derive(Debug, Clone, Default)]
    struct RecordingHttpClient {
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    impl HttpConnector for RecordingHttpClient {
        fn call(&self, request: HttpRequest) -> HttpConnectorFuture {
            self.requests.lock().unwrap().push((
                request.method().to_owned(),
                request.uri().to_owned(),
                request.headers().get("authorization").map(str::to_owned),
            ));
            HttpConnectorFuture::ready(Ok(HttpResponse::new(
                StatusCode::try_from(200).unwrap(),
                SdkBody::empty(),
            )))
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn http_connector(
            &self,
            _settings: &HttpConnectorSettings,
            _components: &RuntimeComponents,
        ) -> SharedHttpConnector {
            SharedHttpConnector::new(self.clone())
        }
    }

    fn target() -> PollTarget {
        PollTarget::new("test-bucket", "eu-west-1", "audio/notes.mp3")
    }

    #[tokio::test]
    async fn test_object_exists() {
        let head = mock!(aws_sdk_s3::Client::head_object)
            .match_requests(|r| {
                r.bucket() == Some("test-bucket") && r.key() == Some("audio/notes.mp3")
            })
            .then_output(|| HeadObjectOutput::builder().content_length(4096).build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&head]);
        let transport = HttpTransport::new(reqwest::Client::new()).with_s3_client(client);

        assert!(transport.object_exists(&target()).await.unwrap());
        assert_eq!(1, head.num_calls());
    }

    #[tokio::test]
    async fn test_object_not_found() {
        let head = mock!(aws_sdk_s3::Client::head_object)
            .then_error(|| HeadObjectError::NotFound(NotFound::builder().build()));
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&head]);
        let transport = HttpTransport::new(reqwest::Client::new()).with_s3_client(client);

        assert!(!transport.object_exists(&target()).await.unwrap());
    }

    #[tokio::test]
    async fn test_object_check_failure() {
        let head = mock!(aws_sdk_s3::Client::head_object).then_http_response(|| {
            HttpResponse::new(StatusCode::try_from(403).unwrap(), Bytes::new().into())
        });
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&head]);
        let transport = HttpTransport::new(reqwest::Client::new()).with_s3_client(client);

        let err = transport.object_exists(&target()).await.unwrap_err();
        assert_eq!(&ErrorKind::ObjectNotDiscoverable, err.kind());
    }

    #[tokio::test]
    async fn test_object_exists_per_region_unsigned() {
        let http = RecordingHttpClient::default();
        let base = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .region("us-east-1")
            .http_client(http.clone())
            .load()
            .await;
        let transport = HttpTransport::with_sdk_config(reqwest::Client::new(), base);

        let targets = [
            PollTarget::new("tts-input", "eu-west-1", "audio/my notes.mp3"),
            PollTarget::new("tts-output", "us-west-2", "audio/notes.mp3"),
            PollTarget::new("tts-input", "eu-west-1", "audio/notes.mp3"),
        ];
        for target in &targets {
            assert!(transport.object_exists(target).await.unwrap());
        }

        let requests = http.requests.lock().unwrap().clone();
        assert_eq!(
            vec![
                (
                    "HEAD".to_owned(),
                    "https://tts-input.s3.eu-west-1.amazonaws.com/audio/my%20notes.mp3".to_owned(),
                    None
                ),
                (
                    "HEAD".to_owned(),
                    "https://tts-output.s3.us-west-2.amazonaws.com/audio/notes.mp3".to_owned(),
                    None
                ),
                (
                    "HEAD".to_owned(),
                    "https://tts-input.s3.eu-west-1.amazonaws.com/audio/notes.mp3".to_owned(),
                    None
                ),
            ],
            requests
        );

        match &transport.s3 {
            S3Clients::PerRegion { clients, .. } => {
                let clients = clients.lock().unwrap();
                let mut regions: Vec<_> = clients.keys().cloned().collect();
                regions.sort();
                assert_eq!(vec!["eu-west-1", "us-west-2"], regions);
            }
            S3Clients::Explicit(_) => panic!("expected per-region clients"),
        }
    }

    #[test]
    fn test_grant_url_percent_encodes_file_name() {
        let endpoint =
            Url::parse("https://abc123.execute-api.eu-west-1.amazonaws.com/prod").unwrap();
        assert_eq!(
            "filename=my%20notes%2Bv2.txt",
            grant_url(&endpoint, "my notes+v2.txt").query().unwrap()
        );
        assert_eq!(
            "filename=my%20(draft)%20%C3%A9t%C3%A9.txt",
            grant_url(&endpoint, "my (draft) été.txt").query().unwrap()
        );

        let endpoint = Url::parse("https://example.com/prod?stage=beta").unwrap();
        assert_eq!(
            "stage=beta&filename=notes.txt",
            grant_url(&endpoint, "notes.txt").query().unwrap()
        );
    }

    #[test]
    fn test_status_detail() {
        assert_eq!(
            "400 - Only .txt files are supported",
            status_detail(
                HttpStatus::BAD_REQUEST,
                r#"{"error": "Only .txt files are supported"}"#
            )
        );
        assert_eq!(
            "502 - upstream unavailable",
            status_detail(HttpStatus::BAD_GATEWAY, "upstream unavailable\n")
        );
        assert_eq!(
            "403 - Forbidden",
            status_detail(HttpStatus::FORBIDDEN, "")
        );
    }
}
