/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tts_transfer::error::{Error, ErrorKind};
use tts_transfer::transport::Transport;
use tts_transfer::types::{PollTarget, UploadGrant, UploadRequest};
use tts_transfer::Url;

/// A call recorded by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Grant {
        endpoint: String,
        file_name: String,
    },
    Upload {
        url: String,
        content_type: String,
        body: Vec<u8>,
    },
    Check {
        bucket: String,
        region: String,
        key: String,
    },
}

/// Reply of the grant API
#[derive(Debug, Clone)]
pub enum GrantReply {
    /// 200 with the given JSON body
    Json(String),
    /// Non-success status with a message
    Status(u16, String),
}

/// Reply of the pre-signed write
#[derive(Debug, Clone)]
pub enum UploadReply {
    Ok,
    Status(u16),
}

/// Outcome of a single existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckReply {
    Present,
    Missing,
    NetworkError,
}

/// A [`Transport`] that replays scripted replies and records every call made to it.
///
/// Existence checks consume `checks` in order; once exhausted every further check is
/// [`CheckReply::Missing`].
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    grant: GrantReply,
    upload: UploadReply,
    checks: Arc<Mutex<VecDeque<CheckReply>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

pub fn grant_json(upload_url: &str, bucket: &str, region: &str) -> String {
    format!(r#"{{"uploadURL": "{upload_url}", "bucket": "{bucket}", "region": "{region}"}}"#)
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            grant: GrantReply::Json(grant_json(
                "https://b.s3.r.amazonaws.com/notes/files/notes.txt?X-Amz-Signature=sig",
                "b",
                "r",
            )),
            upload: UploadReply::Ok,
            checks: Default::default(),
            calls: Default::default(),
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, reply: GrantReply) -> Self {
        self.grant = reply;
        self
    }

    pub fn upload(mut self, reply: UploadReply) -> Self {
        self.upload = reply;
        self
    }

    pub fn checks(self, replies: impl IntoIterator<Item = CheckReply>) -> Self {
        self.checks.lock().unwrap().extend(replies);
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .count()
    }

    pub fn check_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Check { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request_grant(&self, endpoint: &Url, file_name: &str) -> Result<UploadGrant, Error> {
        self.record(Call::Grant {
            endpoint: endpoint.to_string(),
            file_name: file_name.to_owned(),
        });
        match &self.grant {
            GrantReply::Json(body) => UploadGrant::from_json_slice(body.as_bytes()),
            GrantReply::Status(status, message) => Err(Error::new(
                ErrorKind::GrantFailed,
                format!("{status} - {message}"),
            )),
        }
    }

    async fn upload(
        &self,
        grant: &UploadGrant,
        request: &UploadRequest,
        content_type: &str,
    ) -> Result<(), Error> {
        self.record(Call::Upload {
            url: grant.upload_url().to_owned(),
            content_type: content_type.to_owned(),
            body: request.content().to_vec(),
        });
        match self.upload {
            UploadReply::Ok => Ok(()),
            UploadReply::Status(status) => Err(Error::new(
                ErrorKind::UploadFailed,
                format!("{status} - rejected"),
            )),
        }
    }

    async fn object_exists(&self, target: &PollTarget) -> Result<bool, Error> {
        self.record(Call::Check {
            bucket: target.bucket().to_owned(),
            region: target.region().to_owned(),
            key: target.derived_key().to_owned(),
        });
        let reply = self
            .checks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CheckReply::Missing);
        match reply {
            CheckReply::Present => Ok(true),
            CheckReply::Missing => Ok(false),
            CheckReply::NetworkError => Err(Error::new(
                ErrorKind::ObjectNotDiscoverable,
                "connection reset by peer",
            )),
        }
    }
}
