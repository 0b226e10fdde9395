/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::types::PollTarget;

/// Output type for a completed transfer
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutput {
    /// URL of the derived object
    pub url: String,

    /// Where the derived object lives
    pub target: PollTarget,

    /// Number of existence checks it took to find the derived object
    pub attempts: u32,
}

impl TransferOutput {
    pub(crate) fn new(target: PollTarget, attempts: u32) -> Self {
        Self {
            url: target.object_url(),
            target,
            attempts,
        }
    }

    /// URL of the derived object
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Key of the derived object
    pub fn key(&self) -> &str {
        self.target.derived_key()
    }

    /// Bucket of the derived object
    pub fn bucket(&self) -> &str {
        self.target.bucket()
    }

    /// Region of the derived object's bucket
    pub fn region(&self) -> &str {
        self.target.region()
    }

    /// Number of existence checks it took to find the derived object
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
