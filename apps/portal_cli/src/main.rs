use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    identifiers::ComplaintIdFormatError, load_settings_from, ApiFailure, InputError, OtpError,
    SubmitError, ValidationError,
};
use shared::error::{ApiError, ErrorCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod draft;
mod output;

use cli::{Cli, Command};

/// Maps a failure onto the error envelope printed for the user.
fn classify(err: &anyhow::Error) -> ApiError {
    let code = if let Some(submit) = err.downcast_ref::<SubmitError>() {
        submit.to_api_error().code
    } else if let Some(failure) = err.downcast_ref::<ApiFailure>() {
        failure.to_api_error().code
    } else if let Some(OtpError::Api(failure)) = err.downcast_ref::<OtpError>() {
        failure.to_api_error().code
    } else if err.downcast_ref::<ValidationError>().is_some()
        || err.downcast_ref::<InputError>().is_some()
        || err.downcast_ref::<OtpError>().is_some()
        || err.downcast_ref::<ComplaintIdFormatError>().is_some()
    {
        ErrorCode::Validation
    } else {
        ErrorCode::Internal
    };
    ApiError::new(code, format!("{err:#}"))
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = Arc::new(load_settings_from(&cli.config).context("failed to load settings")?);
    info!(
        app = %settings.app_name,
        version = %settings.app_version,
        api = %settings.api_base_url,
        "settings loaded"
    );

    match &cli.command {
        Command::Review { draft } => commands::review(cli.json, settings, draft).await,
        Command::Submit {
            draft,
            offline,
            access_key,
        } => commands::submit(cli.json, settings, draft, *offline, *access_key).await,
        Command::Otp { action } => commands::otp(cli.json, settings, action).await,
        Command::Taxonomy => commands::list_taxonomy(cli.json),
        Command::Track { complaint_id, pin } => {
            commands::track(cli.json, &settings, complaint_id, pin.as_deref())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(cli.json, &classify(&err));
            ExitCode::FAILURE
        }
    }
}
