use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "portal", about = "File and track university complaints from the terminal")]
pub struct Cli {
    /// Settings file; missing files fall back to built-in defaults.
    #[arg(long, global = true, default_value = client_core::config::DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk a draft through every step and print the review summary.
    Review {
        #[arg(long)]
        draft: PathBuf,
    },
    /// Walk a draft through every step and file it.
    Submit {
        #[arg(long)]
        draft: PathBuf,
        /// Issue identifiers locally instead of calling the complaint service.
        #[arg(long)]
        offline: bool,
        /// With --offline, issue an access key instead of a PIN.
        #[arg(long, requires = "offline")]
        access_key: bool,
    },
    /// Phone verification against the complaint service.
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
    /// List complaint categories and their sub-categories.
    Taxonomy,
    /// Check a complaint ID and print its tracking link.
    Track {
        complaint_id: String,
        #[arg(long)]
        pin: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum OtpAction {
    Send {
        #[arg(long)]
        phone: String,
    },
    Verify {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },
}
