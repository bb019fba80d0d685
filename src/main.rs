//! gmlforge - Command-line build assistant for GML workshop projects

use std::process::ExitCode;

use gmlforge::cli;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    cli::run().await
}
