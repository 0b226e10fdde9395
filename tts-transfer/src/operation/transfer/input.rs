/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_smithy_types::error::operation::BuildError;
use bytes::Bytes;

use crate::types::UploadRequest;

/// Input type for a single transfer
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferInput {
    /// The selected file
    pub request: UploadRequest,
}

impl TransferInput {
    /// Creates a new builder-style object to manufacture [`TransferInput`](crate::operation::transfer::TransferInput).
    pub fn builder() -> TransferInputBuilder {
        TransferInputBuilder::default()
    }

    /// The selected file
    pub fn request(&self) -> &UploadRequest {
        &self.request
    }
}

/// A builder for [`TransferInput`](crate::operation::transfer::TransferInput).
#[non_exhaustive]
#[derive(Clone, Default, Debug)]
pub struct TransferInputBuilder {
    pub(crate) file_name: Option<String>,
    pub(crate) content: Option<Bytes>,
}

impl TransferInputBuilder {
    /// Name of the selected file, e.g. `notes.txt`.
    /// Required.
    pub fn file_name(self, input: impl Into<String>) -> Self {
        self.set_file_name(Some(input.into()))
    }

    /// Name of the selected file.
    pub fn set_file_name(mut self, input: Option<String>) -> Self {
        self.file_name = input;
        self
    }

    /// Name of the selected file.
    pub fn get_file_name(&self) -> &Option<String> {
        &self.file_name
    }

    /// Full content of the selected file.
    /// Required.
    pub fn content(self, input: impl Into<Bytes>) -> Self {
        self.set_content(Some(input.into()))
    }

    /// Full content of the selected file.
    pub fn set_content(mut self, input: Option<Bytes>) -> Self {
        self.content = input;
        self
    }

    /// Full content of the selected file.
    pub fn get_content(&self) -> &Option<Bytes> {
        &self.content
    }

    /// Set file name and content from an already constructed request
    pub fn request(self, request: UploadRequest) -> Self {
        self.file_name(request.file_name())
            .content(request.content().clone())
    }

    /// Consumes the builder and constructs a [`TransferInput`](crate::operation::transfer::TransferInput).
    ///
    /// Fails when no file was selected.
    pub fn build(self) -> Result<TransferInput, BuildError> {
        let file_name = self
            .file_name
            .ok_or_else(|| BuildError::missing_field("file_name", "no file was selected"))?;
        let content = self
            .content
            .ok_or_else(|| BuildError::missing_field("content", "no file was selected"))?;
        Ok(TransferInput {
            request: UploadRequest::new(file_name, content),
        })
    }
}
