/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::path::PathBuf;
use std::time::{self, Duration};

use aws_sdk_s3::error::DisplayErrorContext;
use clap::Parser;
use tracing::Instrument;
use tts_transfer::error::ErrorKind;
use tts_transfer::types::{PollSettings, UploadRequest, WorkflowStatus};

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "transfer")]
#[command(about = "Uploads a text file for speech synthesis and waits for the audio file.")]
pub struct Args {
    /// Local `.txt` file to upload
    #[arg(required = true)]
    file: PathBuf,

    /// Grant API endpoint issuing pre-signed upload URLs
    /// [default: $TTS_TRANSFER_GRANT_ENDPOINT]
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum number of checks for the audio file
    #[arg(long, default_value_t = 15)]
    max_checks: u32,

    /// Seconds between checks for the audio file
    #[arg(long, default_value_t = 3)]
    interval_secs: u64,

    /// Use the shorter poll budget (10 checks)
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    quick: bool,
}

impl Args {
    fn poll_settings(&self) -> PollSettings {
        if self.quick {
            PollSettings::quick()
        } else {
            PollSettings::new(self.max_checks, Duration::from_secs(self.interval_secs))
        }
    }
}

async fn do_transfer(args: Args) -> Result<(), BoxError> {
    let mut loader = tts_transfer::from_env().poll_settings(args.poll_settings());
    if let Some(endpoint) = &args.endpoint {
        loader = loader.grant_endpoint(endpoint);
    }
    let config = loader.load().await?;
    let tm = tts_transfer::Client::new(config);

    let request = UploadRequest::from_path(&args.file).await?;
    println!(
        "uploading {} ({} bytes)",
        request.file_name(),
        request.content_length()
    );

    let start = time::Instant::now();
    let handle = tm.transfer().request(request).initiate()?;

    let mut status = handle.subscribe();
    let printer = tokio::spawn(
        async move {
            println!("{}", *status.borrow_and_update());
            while status.changed().await.is_ok() {
                let current: WorkflowStatus = status.borrow_and_update().clone();
                println!("{current}");
            }
        }
        .instrument(tracing::debug_span!("print-status")),
    );

    let result = handle.join().await;
    let _ = printer.await;
    let elapsed = start.elapsed();

    match result {
        Ok(output) => {
            println!(
                "audio ready at {} after {} checks in {elapsed:?}",
                output.url(),
                output.attempts()
            );
            Ok(())
        }
        Err(err) if matches!(err.kind(), ErrorKind::TimedOut(_)) => {
            println!("gave up after {elapsed:?}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    tracing::debug!("using poll settings: {:?}", args.poll_settings());

    if let Err(ref err) = do_transfer(args).await {
        tracing::error!("transfer failed: {}", DisplayErrorContext(err.as_ref()));
        std::process::exit(1);
    }

    Ok(())
}
