/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use bytes::Bytes;

use crate::types::UploadRequest;

use super::{TransferHandle, TransferInputBuilder};

/// Fluent builder for constructing a single transfer
#[derive(Debug)]
pub struct TransferFluentBuilder {
    handle: Arc<crate::client::Handle>,
    inner: TransferInputBuilder,
}

impl TransferFluentBuilder {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        Self {
            handle,
            inner: ::std::default::Default::default(),
        }
    }

    /// Validate the selected file and start the transfer in the background.
    ///
    /// Fails with [`ErrorKind::InputInvalid`](crate::error::ErrorKind::InputInvalid) when no
    /// file was selected or its extension is not accepted; nothing is sent in that case.
    #[tracing::instrument(skip_all, level = "debug", name = "initiate-transfer", fields(
        file_name = self.inner.file_name.as_deref().unwrap_or_default(),
    ))]
    pub fn initiate(self) -> Result<TransferHandle, crate::error::Error> {
        let input = self.inner.build()?;
        crate::operation::transfer::Transfer::orchestrate(self.handle, input)
    }

    /// Name of the selected file, e.g. `notes.txt`.
    /// Required.
    pub fn file_name(mut self, input: impl Into<String>) -> Self {
        self.inner = self.inner.file_name(input);
        self
    }

    /// Name of the selected file.
    pub fn set_file_name(mut self, input: Option<String>) -> Self {
        self.inner = self.inner.set_file_name(input);
        self
    }

    /// Name of the selected file.
    pub fn get_file_name(&self) -> &Option<String> {
        self.inner.get_file_name()
    }

    /// Full content of the selected file.
    /// Required.
    pub fn content(mut self, input: impl Into<Bytes>) -> Self {
        self.inner = self.inner.content(input);
        self
    }

    /// Full content of the selected file.
    pub fn set_content(mut self, input: Option<Bytes>) -> Self {
        self.inner = self.inner.set_content(input);
        self
    }

    /// Full content of the selected file.
    pub fn get_content(&self) -> &Option<Bytes> {
        self.inner.get_content()
    }

    /// Set file name and content from an already constructed request
    pub fn request(mut self, request: UploadRequest) -> Self {
        self.inner = self.inner.request(request);
        self
    }
}

impl crate::operation::transfer::input::TransferInputBuilder {
    /// Initiate a transfer with this input using the given client.
    pub fn send_with(
        self,
        client: &crate::Client,
    ) -> Result<TransferHandle, crate::error::Error> {
        let mut fluent_builder = client.transfer();
        fluent_builder.inner = self;
        fluent_builder.initiate()
    }
}
