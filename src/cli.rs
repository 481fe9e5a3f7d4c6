use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::upload::BackendId;

#[derive(Parser)]
#[command(name = "upmirror")]
#[command(author, version, about = "Telegram bot that mirrors media onto file hosts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Upload a local file to one backend and print the result
    Upload {
        /// Backend id: mixdrop, multiup, gofile, voe, viki or mux
        backend: BackendId,

        /// File to upload
        file: PathBuf,

        /// Name announced to the backend (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
