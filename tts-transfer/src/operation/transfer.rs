/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Operation builders
pub mod builders;
mod input;
mod output;

mod context;
mod handle;
mod poll;

use crate::error;
use crate::state::Event;
use crate::types::{PollTarget, UploadGrant, WorkflowStatus};
use context::TransferContext;
pub use handle::TransferHandle;
/// Request type for transfers
pub use input::{TransferInput, TransferInputBuilder};
/// Response type for transfers
pub use output::TransferOutput;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use std::sync::Arc;

/// Operation struct for the upload-then-poll transfer
#[derive(Clone, Default, Debug)]
pub(crate) struct Transfer;

impl Transfer {
    /// Validate the input and spawn the task driving a single `Transfer` operation
    ///
    /// NOTE: must be called from within a tokio runtime.
    pub(crate) fn orchestrate(
        handle: Arc<crate::client::Handle>,
        input: TransferInput,
    ) -> Result<TransferHandle, error::Error> {
        let derived_key = handle
            .config
            .naming()
            .derive_key(input.request.file_name())?;

        let (status_tx, status_rx) = watch::channel(WorkflowStatus::Idle);
        let cancel = CancellationToken::new();
        let span = tracing::debug_span!(
            "transfer",
            file_name = input.request.file_name(),
            derived_key = derived_key.as_str()
        );
        let status_tx = Arc::new(status_tx);
        let ctx = TransferContext {
            handle,
            request: Arc::new(input.request),
            derived_key,
            status: status_tx.clone(),
            cancel: cancel.clone(),
        };

        let task = tokio::spawn(run(ctx).instrument(span));
        Ok(TransferHandle::new(task, status_rx, status_tx, cancel))
    }
}

/// Drive the transfer to a terminal status
async fn run(ctx: TransferContext) -> Result<TransferOutput, error::Error> {
    ctx.emit(Event::Submitted);
    let result = try_transfer(&ctx).await;

    if let Err(err) = &result {
        if !ctx.current_status().is_terminal() {
            tracing::error!("transfer failed: {}", err.message());
            ctx.emit(Event::Failed {
                message: err.message(),
            });
        }
    }
    result
}

async fn try_transfer(ctx: &TransferContext) -> Result<TransferOutput, error::Error> {
    let grant = request_grant(ctx).await?;
    ctx.emit(Event::GrantIssued);

    upload(ctx, &grant).await?;
    tracing::debug!(
        "file uploaded, waiting for {} in bucket {}",
        ctx.derived_key,
        grant.bucket()
    );

    let target = PollTarget::new(grant.bucket(), grant.region(), ctx.derived_key.clone());
    poll::poll_until_present(ctx, target).await
}

async fn request_grant(ctx: &TransferContext) -> Result<UploadGrant, error::Error> {
    let endpoint = ctx.handle.config.grant_endpoint();
    let grant = ctx
        .cancellable(
            ctx.transport()
                .request_grant(endpoint, ctx.request.file_name())
                .instrument(tracing::debug_span!("request-grant")),
        )
        .await?;
    tracing::trace!(
        "upload granted for bucket {} in region {}",
        grant.bucket(),
        grant.region()
    );
    Ok(grant)
}

async fn upload(ctx: &TransferContext, grant: &UploadGrant) -> Result<(), error::Error> {
    let content_type = ctx.handle.config.content_type();
    ctx.cancellable(
        ctx.transport()
            .upload(grant, &ctx.request, content_type)
            .instrument(tracing::debug_span!(
                "upload",
                content_length = ctx.request.content_length()
            )),
    )
    .await
}

#[cfg(test)]
mod test {
    use crate::error::{Error, ErrorKind};
    use crate::transport::Transport;
    use crate::types::{PollSettings, PollTarget, UploadGrant, UploadRequest, WorkflowStatus};
    use async_trait::async_trait;
    use aws_smithy_async::rt::sleep::SharedAsyncSleep;
    use aws_smithy_async::test_util::instant_time_and_sleep;
    use reqwest::Url;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::sync::Notify;

    /// Grants and uploads succeed; the object appears on check `found_on`.
    #[derive(Debug)]
    struct FoundOn {
        found_on: u32,
        checks: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Transport for FoundOn {
        async fn request_grant(&self, _: &Url, _: &str) -> Result<UploadGrant, Error> {
            Ok(UploadGrant::new("https://upload.example.com/notes.txt", "b", "r"))
        }

        async fn upload(&self, _: &UploadGrant, _: &UploadRequest, _: &str) -> Result<(), Error> {
            Ok(())
        }

        async fn object_exists(&self, _: &PollTarget) -> Result<bool, Error> {
            let attempt = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(attempt >= self.found_on)
        }
    }

    /// Grant requests never complete until notified
    #[derive(Debug)]
    struct StalledGrant(Arc<Notify>);

    #[async_trait]
    impl Transport for StalledGrant {
        async fn request_grant(&self, _: &Url, _: &str) -> Result<UploadGrant, Error> {
            self.0.notify_one();
            std::future::pending().await
        }

        async fn upload(&self, _: &UploadGrant, _: &UploadRequest, _: &str) -> Result<(), Error> {
            unreachable!("upload must not start")
        }

        async fn object_exists(&self, _: &PollTarget) -> Result<bool, Error> {
            unreachable!("polling must not start")
        }
    }

    /// Grants and uploads succeed; every existence check panics
    #[derive(Debug)]
    struct PanicOnCheck;

    #[async_trait]
    impl Transport for PanicOnCheck {
        async fn request_grant(&self, _: &Url, _: &str) -> Result<UploadGrant, Error> {
            Ok(UploadGrant::new("https://upload.example.com/notes.txt", "b", "r"))
        }

        async fn upload(&self, _: &UploadGrant, _: &UploadRequest, _: &str) -> Result<(), Error> {
            Ok(())
        }

        async fn object_exists(&self, _: &PollTarget) -> Result<bool, Error> {
            panic!("existence check exploded")
        }
    }

    fn client(transport: impl Transport + 'static, max_attempts: u32) -> crate::Client {
        let (_time, sleep) = instant_time_and_sleep(UNIX_EPOCH);
        let config = crate::Config::builder()
            .grant_endpoint("https://grant.example.com/prod")
            .poll_settings(PollSettings::new(max_attempts, Duration::from_secs(3)))
            .sleep_impl(SharedAsyncSleep::new(sleep))
            .transport(transport)
            .build()
            .unwrap();
        crate::Client::new(config)
    }

    #[tokio::test]
    async fn test_ready_on_second_check() {
        let checks = Arc::new(AtomicU32::new(0));
        let tm = client(
            FoundOn {
                found_on: 2,
                checks: checks.clone(),
            },
            3,
        );

        let handle = tm
            .transfer()
            .file_name("notes.txt")
            .content("hello")
            .initiate()
            .unwrap();
        let status = handle.subscribe();
        let output = handle.join().await.unwrap();

        assert_eq!("https://b.s3.r.amazonaws.com/audio/notes.mp3", output.url());
        assert_eq!(2, output.attempts());
        assert_eq!(2, checks.load(Ordering::SeqCst));
        assert_eq!(
            WorkflowStatus::Ready {
                url: "https://b.s3.r.amazonaws.com/audio/notes.mp3".to_owned()
            },
            *status.borrow()
        );
    }

    #[tokio::test]
    async fn test_invalid_extension_rejected_before_spawn() {
        let checks = Arc::new(AtomicU32::new(0));
        let tm = client(
            FoundOn {
                found_on: 1,
                checks: checks.clone(),
            },
            3,
        );

        let err = tm
            .transfer()
            .file_name("notes.pdf")
            .content("hello")
            .initiate()
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        let err = tm.transfer().initiate().unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
        assert_eq!(0, checks.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abort_while_requesting_grant() {
        let started = Arc::new(Notify::new());
        let tm = client(StalledGrant(started.clone()), 3);

        let handle = tm
            .transfer()
            .file_name("notes.txt")
            .content("hello")
            .initiate()
            .unwrap();
        started.notified().await;
        assert_eq!(WorkflowStatus::RequestingGrant, handle.status());

        let status = handle.abort().await.unwrap();
        assert_eq!(
            WorkflowStatus::Failed {
                message: "operation cancelled: transfer aborted by caller".to_owned()
            },
            status
        );
    }

    #[tokio::test]
    async fn test_panicking_transport_ends_in_failed() {
        let tm = client(PanicOnCheck, 3);

        let handle = tm
            .transfer()
            .file_name("notes.txt")
            .content("hello")
            .initiate()
            .unwrap();
        let status = handle.subscribe();
        let err = handle.join().await.unwrap_err();

        assert_eq!(&ErrorKind::RuntimeError, err.kind());
        let status = status.borrow().clone();
        assert!(status.is_terminal(), "{status:?}");
        match status {
            WorkflowStatus::Failed { message } => {
                assert!(message.starts_with("runtime error"), "{message}")
            }
            other => panic!("expected failed status, got {other:?}"),
        }
    }
}
