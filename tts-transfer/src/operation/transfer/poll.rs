/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_s3::error::DisplayErrorContext;
use aws_smithy_async::rt::sleep::AsyncSleep;
use tracing::Instrument;

use super::context::TransferContext;
use super::TransferOutput;
use crate::error::{self, Error};
use crate::state::Event;
use crate::types::PollTarget;

/// Check for the derived object until it shows up or the attempts run out.
///
/// Checks run strictly one after another with the configured interval between them. A failed
/// check counts as "not there yet" and never ends the loop early; only cancellation does.
pub(super) async fn poll_until_present(
    ctx: &TransferContext,
    target: PollTarget,
) -> Result<TransferOutput, Error> {
    let settings = *ctx.handle.config.poll_settings();
    let sleep_impl = ctx.handle.config.sleep_impl().clone();
    let max = settings.max_attempts();

    for attempt in 1..=max {
        ctx.emit(Event::CheckStarted { attempt, max });

        let check = ctx
            .transport()
            .object_exists(&target)
            .instrument(tracing::debug_span!("existence-check", attempt, max));
        let present = match ctx.cancellable(async { Ok(check.await) }).await? {
            Ok(present) => present,
            Err(err) => {
                tracing::debug!(
                    "existence check {attempt}/{max} for {} failed, treating as not present: {}",
                    target.derived_key(),
                    DisplayErrorContext(&err)
                );
                false
            }
        };

        if present {
            let output = TransferOutput::new(target, attempt);
            tracing::debug!("derived object found after {attempt} checks: {}", output.url());
            ctx.emit(Event::ObjectFound {
                url: output.url().to_owned(),
            });
            return Ok(output);
        }

        if attempt < max {
            tracing::trace!("derived object not present yet, next check in {:?}", settings.interval());
            ctx.cancellable(async {
                sleep_impl.sleep(settings.interval()).await;
                Ok(())
            })
            .await?;
        }
    }

    tracing::debug!("gave up on {} after {max} checks", target.derived_key());
    ctx.emit(Event::ChecksExhausted {
        expected_key: target.derived_key().to_owned(),
    });
    Err(error::timed_out(target.derived_key(), max))
}
