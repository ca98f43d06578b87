//! `job` mode error specs
//!
//! Running a job for a task that was never submitted fails cleanly instead
//! of panicking, and doesn't require an `app` process to be running.

use crate::prelude::*;

#[test]
fn job_for_unknown_task_fails_with_message() {
    let project = Project::empty();
    project
        .batchflow()
        .args(&["job", "--task-id", "does-not-exist", "--job-index", "0", "--file-id", "f0"])
        .fails()
        .stderr_has("does-not-exist");
}
