/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use core::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

use crate::error::{self, Error};

/// Characters escaped in a single path segment of an object URL.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'+')
    .add(b'/');

/// A user selected file to transfer.
///
/// Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    file_name: String,
    content: Bytes,
}

impl UploadRequest {
    /// Create a new request from a file name and its full content
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, taking the file name from the last component of `path`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                error::invalid_input(format!("{} does not name a file", path.display()))
            })?
            .to_owned();
        let content = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, content))
    }

    /// The name of the selected file, e.g. `notes.txt`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The full content of the selected file
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Size of the content in bytes
    pub fn content_length(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Permission to write a single object, issued by the grant API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadGrant {
    upload_url: String,
    bucket: String,
    region: String,
}

/// Wire shape of a grant response. Every field is optional so missing ones can be reported
/// together instead of failing on the first.
#[derive(Debug, Deserialize)]
struct GrantResponse {
    #[serde(rename = "uploadURL")]
    upload_url: Option<String>,
    bucket: Option<String>,
    region: Option<String>,
}

impl UploadGrant {
    /// Create a new grant
    pub fn new(
        upload_url: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            upload_url: upload_url.into(),
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    /// Parse the JSON body returned by the grant API.
    ///
    /// Fails with [`ErrorKind::GrantFailed`](crate::error::ErrorKind::GrantFailed) when the body
    /// is not JSON or when any of `uploadURL`, `bucket` or `region` is absent, null or empty.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, Error> {
        let resp: GrantResponse = serde_json::from_slice(body).map_err(error::grant_failed)?;

        let present = |field: Option<String>| field.filter(|value| !value.is_empty());
        let (upload_url, bucket, region) = (
            present(resp.upload_url),
            present(resp.bucket),
            present(resp.region),
        );

        match (upload_url, bucket, region) {
            (Some(upload_url), Some(bucket), Some(region)) => Ok(Self {
                upload_url,
                bucket,
                region,
            }),
            (upload_url, bucket, region) => {
                let missing: Vec<&str> = [
                    ("uploadURL", upload_url.is_none()),
                    ("bucket", bucket.is_none()),
                    ("region", region.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(error::grant_failed(format!(
                    "invalid response from API - missing required fields: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// The pre-signed URL to `PUT` the file content to
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// The bucket the derived object will appear in
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The region of [`bucket`](Self::bucket)
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// The derived object to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    bucket: String,
    region: String,
    derived_key: String,
}

impl PollTarget {
    /// Create a new poll target
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        derived_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            derived_key: derived_key.into(),
        }
    }

    /// Bucket containing the derived object
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Region of the bucket
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Key of the derived object, e.g. `audio/notes.mp3`
    pub fn derived_key(&self) -> &str {
        &self.derived_key
    }

    /// Virtual-hosted style URL of the derived object.
    ///
    /// Each `/` separated segment of the key is percent-encoded.
    pub fn object_url(&self) -> String {
        let path: Vec<String> = self
            .derived_key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
            .collect();
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket,
            self.region,
            path.join("/")
        )
    }
}

/// How a source file name maps onto the key of its derived object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNaming {
    source_extension: String,
    target_extension: String,
    key_prefix: String,
}

impl Default for KeyNaming {
    fn default() -> Self {
        Self {
            source_extension: ".txt".to_owned(),
            target_extension: ".mp3".to_owned(),
            key_prefix: "audio/".to_owned(),
        }
    }
}

impl KeyNaming {
    /// Create a new naming convention
    pub fn new(
        source_extension: impl Into<String>,
        target_extension: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_extension: source_extension.into(),
            target_extension: target_extension.into(),
            key_prefix: key_prefix.into(),
        }
    }

    /// Extension accepted for uploads, including the leading dot
    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    /// Extension of the derived object, including the leading dot
    pub fn target_extension(&self) -> &str {
        &self.target_extension
    }

    /// Namespace segment the derived object is stored under
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Validate `file_name` and compute the key of its derived object.
    ///
    /// The trailing source extension is replaced by the target extension and the result is
    /// prefixed with the key prefix: `notes.txt` becomes `audio/notes.mp3`.
    pub fn derive_key(&self, file_name: &str) -> Result<String, Error> {
        if file_name.is_empty() {
            return Err(error::invalid_input(format!(
                "please select a {} file to upload",
                self.source_extension
            )));
        }
        if file_name.contains(['/', '\\']) {
            return Err(error::invalid_input(format!(
                "file name must not contain a path separator: {file_name}"
            )));
        }
        let stem = file_name
            .strip_suffix(self.source_extension.as_str())
            .ok_or_else(|| {
                error::invalid_input(format!(
                    "please select a {} file only: {file_name}",
                    self.source_extension
                ))
            })?;
        if stem.is_empty() {
            return Err(error::invalid_input(format!(
                "file name has no stem: {file_name}"
            )));
        }
        Ok(format!(
            "{}{}{}",
            self.key_prefix, stem, self.target_extension
        ))
    }
}

/// Bounds of the existence-check loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    max_attempts: u32,
    interval: Duration,
}

impl Default for PollSettings {
    /// 15 checks, 3 seconds apart
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_secs(3),
        }
    }
}

impl PollSettings {
    /// Create new poll settings
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// 10 checks, 3 seconds apart
    pub fn quick() -> Self {
        Self::new(10, Duration::from_secs(3))
    }

    /// Maximum number of existence checks
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between two consecutive existence checks
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Status of a single transfer workflow as presented to the user.
///
/// See [`advance`](crate::state::advance) for the legal transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum WorkflowStatus {
    /// Nothing submitted yet
    #[default]
    Idle,

    /// Waiting on the grant API for a pre-signed URL
    RequestingGrant,

    /// Writing the file content to object storage
    Uploading,

    /// Existence check `attempt` of `max` is in flight
    Polling {
        /// 1-based attempt number
        attempt: u32,
        /// Maximum number of attempts
        max: u32,
    },

    /// The derived object exists at `url`
    Ready {
        /// URL of the derived object
        url: String,
    },

    /// Every existence check came back empty
    TimedOut {
        /// Key the derived object was expected under
        expected_key: String,
    },

    /// The workflow stopped on an error
    Failed {
        /// Human readable description of the failure
        message: String,
    },
}

impl WorkflowStatus {
    /// Whether this status ends the workflow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Ready { .. }
                | WorkflowStatus::TimedOut { .. }
                | WorkflowStatus::Failed { .. }
        )
    }

    #[cfg(test)]
    pub(crate) fn rank(&self) -> u8 {
        match self {
            WorkflowStatus::Idle => 0,
            WorkflowStatus::RequestingGrant => 1,
            WorkflowStatus::Uploading => 2,
            WorkflowStatus::Polling { .. } => 3,
            WorkflowStatus::Ready { .. }
            | WorkflowStatus::TimedOut { .. }
            | WorkflowStatus::Failed { .. } => 4,
        }
    }
}

impl From<&Error> for WorkflowStatus {
    fn from(err: &Error) -> Self {
        match err.kind() {
            crate::error::ErrorKind::TimedOut(timeout) => WorkflowStatus::TimedOut {
                expected_key: timeout.expected_key().to_owned(),
            },
            _ => WorkflowStatus::Failed {
                message: err.message(),
            },
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Idle => write!(f, "Please select a file to upload."),
            WorkflowStatus::RequestingGrant => write!(f, "Requesting upload URL..."),
            WorkflowStatus::Uploading => write!(f, "Uploading file to S3..."),
            WorkflowStatus::Polling { attempt, max } => write!(
                f,
                "File uploaded successfully! Checking for audio... ({attempt}/{max})"
            ),
            WorkflowStatus::Ready { url } => {
                write!(f, "Audio file is ready! Listen to your audio file: {url}")
            }
            WorkflowStatus::TimedOut { expected_key } => write!(
                f,
                "Audio generation is taking longer than expected. \
                 This might happen with larger files. Please check back in a few minutes. \
                 Expected audio location: {expected_key}"
            ),
            WorkflowStatus::Failed { message } => write!(f, "Error occurred: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_derive_key() {
        let naming = KeyNaming::default();
        assert_eq!("audio/notes.mp3", naming.derive_key("notes.txt").unwrap());
        assert_eq!(
            "audio/my notes.mp3",
            naming.derive_key("my notes.txt").unwrap()
        );
    }

    #[test]
    fn test_derive_key_only_replaces_trailing_extension() {
        let naming = KeyNaming::default();
        assert_eq!(
            "audio/a.txt.b.mp3",
            naming.derive_key("a.txt.b.txt").unwrap()
        );
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let naming = KeyNaming::default();
        for name in ["x.txt", "chapter-1.txt", "ünïcode.txt", "..txt"] {
            assert_eq!(
                naming.derive_key(name).unwrap(),
                naming.derive_key(name).unwrap()
            );
            let stem = name.strip_suffix(".txt").unwrap();
            assert_eq!(format!("audio/{stem}.mp3"), naming.derive_key(name).unwrap());
        }
    }

    #[test]
    fn test_derive_key_rejects_invalid_names() {
        let naming = KeyNaming::default();
        for name in ["", "notes.pdf", "notes.TXT", "notes.txt.bak", ".txt", "dir/notes.txt"] {
            let err = naming.derive_key(name).unwrap_err();
            assert_eq!(&ErrorKind::InputInvalid, err.kind(), "{name}");
        }
    }

    #[test]
    fn test_custom_naming() {
        let naming = KeyNaming::new(".md", ".ogg", "speech/");
        assert_eq!("speech/readme.ogg", naming.derive_key("readme.md").unwrap());
    }

    #[test]
    fn test_grant_from_json() {
        let grant = UploadGrant::from_json_slice(
            br#"{"uploadURL": "https://b.s3.amazonaws.com/notes.txt?X-Amz-Signature=abc", "bucket": "b", "region": "r"}"#,
        )
        .unwrap();
        assert_eq!("b", grant.bucket());
        assert_eq!("r", grant.region());
        assert!(grant.upload_url().ends_with("X-Amz-Signature=abc"));
    }

    #[test]
    fn test_grant_missing_fields() {
        let err = UploadGrant::from_json_slice(br#"{"uploadURL": "", "bucket": "b"}"#).unwrap_err();
        assert_eq!(&ErrorKind::GrantFailed, err.kind());
        let message = err.message();
        assert!(message.contains("uploadURL, region"), "{message}");
    }

    #[test]
    fn test_grant_null_field() {
        let err = UploadGrant::from_json_slice(
            br#"{"uploadURL": "https://u", "bucket": null, "region": "r"}"#,
        )
        .unwrap_err();
        assert!(err.message().ends_with("missing required fields: bucket"));
    }

    #[test]
    fn test_grant_not_json() {
        let err = UploadGrant::from_json_slice(b"<html>oops</html>").unwrap_err();
        assert_eq!(&ErrorKind::GrantFailed, err.kind());
    }

    #[test]
    fn test_object_url() {
        let target = PollTarget::new("b", "r", "audio/notes.mp3");
        assert_eq!(
            "https://b.s3.r.amazonaws.com/audio/notes.mp3",
            target.object_url()
        );

        let target = PollTarget::new("b", "eu-west-1", "audio/my notes#1.mp3");
        assert_eq!(
            "https://b.s3.eu-west-1.amazonaws.com/audio/my%20notes%231.mp3",
            target.object_url()
        );
    }

    #[test]
    fn test_status_from_error() {
        let status = WorkflowStatus::from(&crate::error::timed_out("audio/notes.mp3", 3));
        assert_eq!(
            WorkflowStatus::TimedOut {
                expected_key: "audio/notes.mp3".to_owned()
            },
            status
        );

        let status = WorkflowStatus::from(&crate::error::upload_failed("403 - Forbidden"));
        assert_eq!(
            WorkflowStatus::Failed {
                message: "upload failed: 403 - Forbidden".to_owned()
            },
            status
        );
    }

    #[test]
    fn test_status_display() {
        let status = WorkflowStatus::Polling { attempt: 2, max: 15 };
        assert_eq!(
            "File uploaded successfully! Checking for audio... (2/15)",
            status.to_string()
        );
        let status = WorkflowStatus::TimedOut {
            expected_key: "audio/notes.mp3".to_owned(),
        };
        assert!(status.to_string().ends_with("Expected audio location: audio/notes.mp3"));
    }

    #[tokio::test]
    async fn test_request_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello world").unwrap();

        let request = UploadRequest::from_path(&path).await.unwrap();
        assert_eq!("notes.txt", request.file_name());
        assert_eq!(11, request.content_length());
    }

    #[tokio::test]
    async fn test_request_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadRequest::from_path(dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
    }
}
