/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::state::{advance, Event};
use crate::transport::Transport;
use crate::types::{UploadRequest, WorkflowStatus};

/// Internal context used to drive a single Transfer operation
#[derive(Debug, Clone)]
pub(crate) struct TransferContext {
    /// reference to client handle used to do actual work
    pub(crate) handle: Arc<crate::client::Handle>,
    /// the submitted file
    pub(crate) request: Arc<UploadRequest>,
    /// key of the derived object, computed when the request was validated
    pub(crate) derived_key: String,
    /// publishes every status change
    pub(crate) status: Arc<watch::Sender<WorkflowStatus>>,
    /// signalled by `TransferHandle::abort`
    pub(crate) cancel: CancellationToken,
}

impl TransferContext {
    /// The transport to use for network calls
    pub(crate) fn transport(&self) -> &dyn Transport {
        self.handle.config.transport()
    }

    /// Apply `event` to the current status and publish the result.
    ///
    /// Returns false if the transition was rejected.
    pub(crate) fn emit(&self, event: Event) -> bool {
        self.status.send_if_modified(|current| {
            let next = advance(current, &event);
            if &next == current {
                tracing::warn!("rejected status transition from {current:?} on {event:?}");
                return false;
            }
            tracing::debug!("status: {next}");
            *current = next;
            true
        })
    }

    /// The current status
    pub(crate) fn current_status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Run `fut` unless the transfer is aborted first.
    pub(crate) async fn cancellable<F, T>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("received cancellation signal, exiting");
                Err(error::operation_cancelled())
            }
            result = fut => result,
        }
    }
}
