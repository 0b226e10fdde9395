/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::types::WorkflowStatus;

/// Something that happened while driving a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// A file was submitted
    Submitted,

    /// The grant API returned a usable upload target
    GrantIssued,

    /// Existence check `attempt` of `max` is about to be sent
    CheckStarted {
        /// 1-based attempt number
        attempt: u32,
        /// Maximum number of attempts
        max: u32,
    },

    /// The derived object exists
    ObjectFound {
        /// URL of the derived object
        url: String,
    },

    /// Every existence check came back empty
    ChecksExhausted {
        /// Key the derived object was expected under
        expected_key: String,
    },

    /// The workflow stopped on an error
    Failed {
        /// Human readable description of the failure
        message: String,
    },
}

/// Compute the status that follows `current` once `event` happened.
///
/// Transitions only ever move forward. An event that is not legal in the current status
/// leaves it unchanged, so callers can detect a rejected transition by comparing the result
/// with `current`.
pub fn advance(current: &WorkflowStatus, event: &Event) -> WorkflowStatus {
    use WorkflowStatus as S;

    match (current, event) {
        (S::Idle, Event::Submitted) => S::RequestingGrant,
        (S::RequestingGrant, Event::GrantIssued) => S::Uploading,
        (S::Uploading, Event::CheckStarted { attempt, max }) => S::Polling {
            attempt: *attempt,
            max: *max,
        },
        (
            S::Polling {
                attempt: previous, ..
            },
            Event::CheckStarted { attempt, max },
        ) if attempt > previous => S::Polling {
            attempt: *attempt,
            max: *max,
        },
        (S::Polling { .. }, Event::ObjectFound { url }) => S::Ready { url: url.clone() },
        (S::Polling { .. }, Event::ChecksExhausted { expected_key }) => S::TimedOut {
            expected_key: expected_key.clone(),
        },
        (status, Event::Failed { message }) if !status.is_terminal() => S::Failed {
            message: message.clone(),
        },
        (status, _) => status.clone(),
    }
}
