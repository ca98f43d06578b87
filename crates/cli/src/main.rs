// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! batchflow - the workflow orchestrator binary (spec.md §6). One process,
//! two modes: `app` runs the Submission API listener and admission loop
//! until a shutdown signal arrives, `job` runs exactly one job to
//! completion then exits. Both modes are implemented by `batchflow-daemon`;
//! this binary only parses flags and dispatches.

use std::path::PathBuf;

use anyhow::Result;
use batchflow_daemon::{CliOverrides, Config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "batchflow",
    version,
    disable_version_flag = true,
    about = "batchflow - a workflow orchestrator for batch compute jobs"
)]
struct Cli {
    /// Data volume root (default: under the state directory)
    #[arg(long = "volume", global = true, value_name = "DIR")]
    volume_path: Option<PathBuf>,

    /// WAL + snapshot directory (default: under the state directory)
    #[arg(long = "store", global = true, value_name = "DIR")]
    store_path: Option<PathBuf>,

    /// Path to a TOML config file (default: {state_dir}/config.toml, if present)
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Submission API port, recorded in config but not yet bound over TCP
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Backend account to submit jobs under
    #[arg(long, global = true)]
    account: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Submission API listener and admission loop
    App,
    /// Run one job to completion and exit
    Job {
        /// Task this job belongs to
        #[arg(long = "task-id")]
        task_id: String,
        /// Index of this job within the task
        #[arg(long = "job-index")]
        job_index: u32,
        /// Input file this job processes
        #[arg(long = "file-id")]
        file_id: String,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            volume_path: self.volume_path.clone(),
            store_path: self.store_path.clone(),
            config_file: self.config_file.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            account: self.account.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.overrides())?;

    match cli.command {
        Commands::App => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(batchflow_daemon::run_app(config))?;
        }
        Commands::Job { task_id, job_index, file_id } => {
            let args = batchflow_daemon::JobArgs { task_id, job_index, file_id };
            batchflow_daemon::run_job(config, args)?;
        }
    }
    Ok(())
}
