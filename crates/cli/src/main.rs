// direct-commit CLI entry point.

use clap::Parser;
use direct_commit_common::{default_coordinates, default_tasks};

mod credential;
mod exit_code;
mod github;
mod output;
mod publisher;
mod run;

use crate::credential::TOKEN_ENV_VAR;
use crate::exit_code::ExitCode;
use crate::github::GitHubContentsClient;
use crate::output::Console;

/// Commit the configured files straight to GitHub through the contents API.
///
/// Reads the access token from GITHUB_TOKEN. Takes no arguments.
#[derive(Parser)]
#[command(name = "direct-commit", version)]
struct Cli {}

fn main() -> std::process::ExitCode {
    let _cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut console = Console::stdio();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            console.error(&format!("failed to start async runtime: {err}"));
            return ExitCode::Failure.into();
        }
    };

    let coords = default_coordinates();
    let tasks = default_tasks();
    let result = runtime.block_on(run::run(
        std::env::var(TOKEN_ENV_VAR).ok(),
        coords.clone(),
        &tasks,
        GitHubContentsClient::new,
        &mut console,
    ));

    run::finish(result, &coords, &mut console).into()
}
