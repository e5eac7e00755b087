//! image-mirror CLI entry point
//!
//! Pulls every configured image, retags it under the target registry and
//! pushes it. Any failure stops the batch and exits with status 1.

use image_mirror::cli::{Args, Runner};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args().with_env();

    let default_filter = if args.verbose { "image_mirror=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(args);
    match runner.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(stage = err.stage(), "run aborted");
            runner.logger().error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
