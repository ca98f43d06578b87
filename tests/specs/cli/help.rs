//! CLI help output specs
//!
//! Verify help text displays for the `app`/`job` subcommands.

use crate::prelude::*;

#[test]
fn batchflow_no_args_fails_with_usage() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn batchflow_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("app").stdout_has("job");
}

#[test]
fn batchflow_app_help_shows_usage() {
    cli().args(&["app", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn batchflow_job_help_shows_flags() {
    cli()
        .args(&["job", "--help"])
        .passes()
        .stdout_has("--task-id")
        .stdout_has("--job-index")
        .stdout_has("--file-id");
}

#[test]
fn batchflow_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
