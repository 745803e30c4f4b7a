use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` timed out after {}s and was killed", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` exited with status {code}:\n{output}")]
    NonZeroExit {
        command: String,
        code: i32,
        output: String,
    },
}

impl ProcessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    /// stdout followed by stderr, the way a terminal would interleave them.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

static USERINFO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(https?://)[^/@\s]+@").expect("static regex"));

/// Strip `user:token@` from any URL embedded in `text`.
pub fn redact_credentials(text: &str) -> String {
    USERINFO.replace_all(text, "${1}***@").into_owned()
}

pub fn describe_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| a.to_string()));
    redact_credentials(&parts.join(" "))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run `program` in `working_dir`, waiting at most `timeout`.
///
/// A process still running at the deadline is killed and reported as
/// [`ProcessError::Timeout`], never as a non-zero exit.
pub fn run_command(
    program: &str,
    args: &[&str],
    working_dir: &Path,
    envs: &[(&str, &str)],
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let command = describe_command(program, args);
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: command.clone(),
        source,
    })?;

    // Pipes are drained on their own threads so a chatty build cannot fill
    // the pipe buffer and stall while we poll.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(command = %command, timeout_s = timeout.as_secs(), "process timed out");
                    return Err(ProcessError::Timeout { command, timeout });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(source) => {
                let _ = child.kill();
                return Err(ProcessError::Spawn { command, source });
            }
        }
    };

    let output = CommandOutput {
        stdout: redact_credentials(&stdout.join().unwrap_or_default()),
        stderr: redact_credentials(&stderr.join().unwrap_or_default()),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    tracing::debug!(command = %command, duration_ms = output.duration_ms, success = exit_status.success(), "process finished");

    if exit_status.success() {
        Ok(output)
    } else {
        Err(ProcessError::NonZeroExit {
            command,
            code: exit_status.code().unwrap_or(-1),
            output: output.combined(),
        })
    }
}
