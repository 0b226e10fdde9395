/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::operation::transfer::TransferOutput;
use crate::state::{advance, Event};
use crate::types::WorkflowStatus;

/// Response type for a single transfer.
///
/// # Cancellation
///
/// A transfer runs to completion or timeout by default. Call [`Self::abort`] to stop it at
/// its next suspension point (a network call or the delay between existence checks); the
/// status then ends in [`WorkflowStatus::Failed`].
///
/// Dropping the handle detaches the transfer. It keeps running in the background but its
/// result can no longer be observed.
///
/// If the task driving the transfer panics, [`Self::join`] and [`Self::abort`] publish
/// [`WorkflowStatus::Failed`] before returning the error.
#[derive(Debug)]
#[non_exhaustive]
pub struct TransferHandle {
    /// The task driving the transfer
    task: JoinHandle<Result<TransferOutput, crate::error::Error>>,
    /// Receives every status change
    status: watch::Receiver<WorkflowStatus>,
    /// Publishes the terminal status when the task itself failed
    status_tx: Arc<watch::Sender<WorkflowStatus>>,
    cancel: CancellationToken,
}

impl TransferHandle {
    pub(crate) fn new(
        task: JoinHandle<Result<TransferOutput, crate::error::Error>>,
        status: watch::Receiver<WorkflowStatus>,
        status_tx: Arc<watch::Sender<WorkflowStatus>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            status,
            status_tx,
            cancel,
        }
    }

    /// Turn a failed join into an error and move the status to `Failed`.
    fn task_failed(&self, join_err: JoinError) -> Error {
        let err = Error::from(join_err);
        tracing::error!("transfer task failed: {}", err.message());
        let event = Event::Failed {
            message: err.message(),
        };
        self.status_tx.send_if_modified(|current| {
            let next = advance(current, &event);
            let changed = &next != current;
            *current = next;
            changed
        });
        err
    }

    /// The current status of the transfer
    pub fn status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes, e.g. to drive a UI.
    ///
    /// The receiver sees the latest status; intermediate statuses may be skipped by slow
    /// consumers.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status.clone()
    }

    /// Consume the handle and wait for the transfer to reach a terminal status
    ///
    /// Returns the derived object for [`WorkflowStatus::Ready`]. A transfer that ended in
    /// [`WorkflowStatus::TimedOut`] returns an error of kind
    /// [`ErrorKind::TimedOut`](crate::error::ErrorKind::TimedOut).
    #[tracing::instrument(skip_all, level = "debug", name = "join-transfer")]
    pub async fn join(mut self) -> Result<TransferOutput, crate::error::Error> {
        match (&mut self.task).await {
            Ok(result) => result,
            Err(join_err) => Err(self.task_failed(join_err)),
        }
    }

    /// Abort the transfer and wait for it to stop.
    ///
    /// Returns the terminal status. A transfer that already finished keeps its status.
    #[tracing::instrument(skip_all, level = "debug", name = "abort-transfer")]
    pub async fn abort(mut self) -> Result<WorkflowStatus, crate::error::Error> {
        self.cancel.cancel();
        if let Err(join_err) = (&mut self.task).await {
            return Err(self.task_failed(join_err));
        }
        let status = self.status.borrow().clone();
        Ok(status)
    }
}
