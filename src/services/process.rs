//! Child process helpers shared by the git and build tool backends

use crate::error::{BuildchainError, BuildchainResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// Max number of output lines kept in command failure messages
const ERROR_TAIL_LINES: usize = 50;

/// Last [`ERROR_TAIL_LINES`] lines of a command's combined output
pub(crate) fn output_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Forward stdout and stderr of a child to the log line by line
///
/// Returns every line seen, in arrival order.
async fn stream_child_output(child: &mut Child, program: &str) -> Vec<String> {
    let mut all_output = Vec::new();

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return all_output;
    };

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_reader.next_line(), if !stdout_done => match line {
                Ok(Some(line)) => {
                    debug!(target: "buildchain::process", "[{}] {}", program, line);
                    all_output.push(line);
                }
                _ => stdout_done = true,
            },
            line = stderr_reader.next_line(), if !stderr_done => match line {
                Ok(Some(line)) => {
                    debug!(target: "buildchain::process", "[{}] {}", program, line);
                    all_output.push(line);
                }
                _ => stderr_done = true,
            },
        }
    }

    all_output
}

/// A command about to be run
///
/// `display` is what ends up in logs and errors, so it must never carry
/// credentials.
pub(crate) struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: Option<&'a Path>,
    pub envs: BTreeMap<String, String>,
    pub display: String,
}

impl<'a> Invocation<'a> {
    pub fn new<I, S>(program: &'a str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            cwd: None,
            envs: BTreeMap::new(),
            display,
        }
    }

    pub fn current_dir(mut self, dir: &'a Path) -> Self {
        self.cwd = Some(dir);
        self
    }

    pub fn envs(mut self, envs: BTreeMap<String, String>) -> Self {
        self.envs = envs;
        self
    }

    pub fn display_as(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Run to completion, failing on a non-zero exit
    pub async fn run(self) -> BuildchainResult<Vec<String>> {
        debug!("Executing: {}", self.display);

        let mut command = Command::new(self.program);
        command
            .args(&self.args)
            .envs(&self.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = self.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| BuildchainError::command_failed(&self.display, e))?;

        let output = stream_child_output(&mut child, self.program).await;
        let status = child
            .wait()
            .await
            .map_err(|e| BuildchainError::command_failed(&self.display, e))?;

        if status.success() {
            Ok(output)
        } else {
            Err(BuildchainError::command_exec(
                self.display,
                output_tail(&output),
            ))
        }
    }
}
