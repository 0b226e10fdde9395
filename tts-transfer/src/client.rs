/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::Config;
use std::sync::Arc;

/// Client for uploading text files and waiting for their synthesized audio.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. config, transport, sleep implementation
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: crate::Config,
}

impl Client {
    /// Creates a new client from a config.
    pub fn new(config: Config) -> Client {
        let handle = Arc::new(Handle { config });
        Client { handle }
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Upload a single text file and wait for its derived audio object.
    ///
    /// Constructs a fluent builder for the
    /// [`Transfer`](crate::operation::transfer::builders::TransferFluentBuilder) operation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::error::Error;
    /// use std::path::Path;
    /// use tts_transfer::types::UploadRequest;
    ///
    /// async fn speak(
    ///     client: &tts_transfer::Client,
    ///     path: impl AsRef<Path>
    /// ) -> Result<(), Box<dyn Error>> {
    ///     let request = UploadRequest::from_path(path).await?;
    ///     let handle = client.transfer()
    ///         .request(request)
    ///         .initiate()?;
    ///
    ///     // initiate() will return before the transfer is complete.
    ///     // Call the `join()` method on the returned handle to drive the transfer to completion.
    ///     // The handle can also be used to watch status changes or to abort the transfer.
    ///     let output = handle.join().await?;
    ///     println!("listen at {}", output.url());
    ///     Ok(())
    /// }
    /// ```
    pub fn transfer(&self) -> crate::operation::transfer::builders::TransferFluentBuilder {
        crate::operation::transfer::builders::TransferFluentBuilder::new(self.handle.clone())
    }
}
