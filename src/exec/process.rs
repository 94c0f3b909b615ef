// src/exec/process.rs

//! Run a single external command with `tokio::process`.

use std::fs::File;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::command::{CommandOutput, CommandSpec};

/// Run `spec` to completion.
///
/// Returns `Err` only if the process could not be started (or its output
/// file could not be created); a non-zero exit is reported through
/// [`CommandOutput::exit_code`].
pub async fn run_command(spec: &CommandSpec) -> Result<CommandOutput> {
    info!(cmd = %spec, cwd = %spec.cwd.display(), "running command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    match &spec.output {
        Some(path) => {
            // One file handle for both streams keeps their interleaving.
            let file = File::create(path)?;
            cmd.stdout(Stdio::from(file.try_clone()?))
                .stderr(Stdio::from(file));
        }
        None => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }

    let output = cmd.output().await?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(cmd = %spec, exit_code = ?result.exit_code, "command finished");
    Ok(result)
}
