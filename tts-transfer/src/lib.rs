/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Upload a text file through a pre-signed Amazon S3 URL and wait for the synthesized audio.
//!
//! A transfer is three steps:
//!
//! 1. request a pre-signed upload URL from a grant API,
//! 2. `PUT` the file content directly to S3 using that URL,
//! 3. poll S3 with `HeadObject` until the derived object (`audio/<name>.mp3` for
//!    `<name>.txt`) appears, up to a fixed number of attempts.
//!
//! Every step is reflected in a [`WorkflowStatus`](crate::types::WorkflowStatus) that can be
//! observed while the transfer runs.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> Result<(), tts_transfer::error::Error> {
//! let config = tts_transfer::from_env()
//!     .grant_endpoint("https://abc123.execute-api.eu-west-1.amazonaws.com/prod")
//!     .load()
//!     .await?;
//! let client = tts_transfer::Client::new(config);
//!
//! let handle = client
//!     .transfer()
//!     .file_name("notes.txt")
//!     .content("Hello from the transfer client")
//!     .initiate()?;
//!
//! let mut status = handle.subscribe();
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         println!("{}", *status.borrow_and_update());
//!     }
//! });
//!
//! let output = handle.join().await?;
//! println!("audio ready at {}", output.url());
//! # Ok(())
//! # }
//! ```

/// Error types emitted by `tts-transfer`
pub mod error;

/// Common types used by `tts-transfer`
pub mod types;

/// Status transitions of a transfer
pub mod state;

/// Network calls a transfer is made of
pub mod transport;

/// Transfer client
pub mod client;

/// Transfer operations
pub mod operation;

/// Transfer client configuration
pub mod config;

pub use self::client::Client;
use self::config::loader::ConfigLoader;
pub use self::config::Config;
/// URL type used for the grant endpoint
pub use reqwest::Url;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
