/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of transfer errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation input validation issues (missing file, wrong extension, bad configuration)
    InputInvalid,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (e.g. task failure)
    RuntimeError,

    /// The upload grant could not be obtained or the response was malformed
    GrantFailed,

    /// The direct write to object storage was rejected
    UploadFailed,

    /// A single existence check for the derived object failed
    ObjectNotDiscoverable,

    /// Polling exhausted every attempt without the derived object appearing
    TimedOut(PollTimeout),

    /// The transfer was cancelled because the caller explicitly called `.abort` on the handle.
    OperationCancelled,
}

/// Stores information about an exhausted poll
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollTimeout {
    expected_key: String,
    attempts: u32,
}

impl PollTimeout {
    /// The key the derived object was expected under
    pub fn expected_key(&self) -> &str {
        &self.expected_key
    }

    /// Number of existence checks performed before giving up
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Error {
    /// Creates a new transfer [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Render this error and its whole source chain as a single human readable line.
    ///
    /// Unlike `DisplayErrorContext` this never includes `Debug` output and is suitable for
    /// presenting to an end user.
    pub fn message(&self) -> String {
        let mut message = self.to_string();
        let mut next = std::error::Error::source(self);
        while let Some(err) = next {
            message.push_str(": ");
            message.push_str(&err.to_string());
            next = err.source();
        }
        message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
            ErrorKind::GrantFailed => write!(f, "failed to get presigned URL"),
            ErrorKind::UploadFailed => write!(f, "upload failed"),
            ErrorKind::ObjectNotDiscoverable => write!(f, "existence check failed"),
            ErrorKind::TimedOut(timeout) => write!(
                f,
                "derived object not found after {} checks",
                timeout.attempts
            ),
            ErrorKind::OperationCancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for Error {
    fn from(value: aws_smithy_types::error::operation::BuildError) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn grant_failed<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::GrantFailed, err)
}

pub(crate) fn upload_failed<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::UploadFailed, err)
}

pub(crate) fn discovery_failed<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::ObjectNotDiscoverable, err)
}

pub(crate) fn timed_out(expected_key: impl Into<String>, attempts: u32) -> Error {
    let expected_key = expected_key.into();
    let message = format!("expected audio location: {expected_key}");
    Error::new(
        ErrorKind::TimedOut(PollTimeout {
            expected_key,
            attempts,
        }),
        message,
    )
}

pub(crate) fn from_kind<E>(kind: ErrorKind) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    |err| Error::new(kind, err)
}

static CANCELLATION_ERROR: &str = "transfer aborted by caller";

pub(crate) fn operation_cancelled() -> Error {
    Error::new(ErrorKind::OperationCancelled, CANCELLATION_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_includes_source_chain() {
        let err = grant_failed("403 - Only .txt files are supported");
        assert_eq!(
            "failed to get presigned URL: 403 - Only .txt files are supported",
            err.message()
        );
    }

    #[test]
    fn test_timed_out_carries_expected_key() {
        let err = timed_out("audio/notes.mp3", 15);
        match err.kind() {
            ErrorKind::TimedOut(timeout) => {
                assert_eq!("audio/notes.mp3", timeout.expected_key());
                assert_eq!(15, timeout.attempts());
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(err.message().contains("audio/notes.mp3"));
    }

    #[test]
    fn test_from_kind() {
        let err = from_kind::<&str>(ErrorKind::RuntimeError)("boom");
        assert_eq!(&ErrorKind::RuntimeError, err.kind());
    }
}
