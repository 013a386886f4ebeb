// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use timecap::{Archiver, TarEngine};

use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "timecap [options] <source_dir> <dest_dir>",
    version
)]
struct Cli {
    /// Directory to archive. Must carry a .timecap configuration file.
    #[arg(value_name = "source_dir")]
    pub source_dir: PathBuf,

    /// Directory receiving artifacts, state, and the latest pointer.
    #[arg(value_name = "dest_dir")]
    pub dest_dir: PathBuf,

    /// Show debug-level diagnostics.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let archiver = Archiver::prepare(self.source_dir, self.dest_dir)?;

        println!("chain name: {}", archiver.name());
        println!("max depth: {}", archiver.max_depth());
        match archiver.previous_depth() {
            Some(depth) => println!("previous backup found at depth {depth}"),
            None => println!("no previous backup, starting a new baseline"),
        }

        let result = archiver.run(&TarEngine::new())?;

        match result.latest_path {
            Some(latest) => println!("latest archive: {}", latest.display()),
            None => println!(
                "created {} (latest pointer not updated, retry is safe)",
                result.artifact_path.display()
            ),
        }

        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer().compact();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(if cli.verbose { "debug" } else { "info" }))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}
