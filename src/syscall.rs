// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External process invocation.
//!
//! Pushdock leans on external programs for everything it does not do through
//! libgit2: running installer scripts, and installing global packages. Each
//! call blocks until the child exits. A child that exits unsuccessfully is an
//! error carrying its exit status.

use std::{
    ffi::{OsStr, OsString},
    io::{ErrorKind, Write},
    process::{Command, ExitStatus, Stdio},
};
use tracing::{debug, instrument};

/// Run command with stdio inherited from current process.
///
/// # Errors
///
/// - Return [`SyscallError::Spawn`] if command cannot be started.
/// - Return [`SyscallError::Failed`] if command exits unsuccessfully.
#[instrument(skip(cmd, args), level = "debug")]
pub fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let command = cmd.as_ref().to_os_string();
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    debug!("run {command:?} with {args:?}");

    let status = Command::new(&command)
        .args(&args)
        .spawn()
        .and_then(|mut child| child.wait())
        .map_err(|source| SyscallError::Spawn {
            command: command.clone(),
            source,
        })?;

    check_status(command, status, String::new())
}

/// Run command with captured output.
///
/// Output to stdout and stderr is returned together as a [`String`].
///
/// # Errors
///
/// - Return [`SyscallError::Spawn`] if command cannot be started.
/// - Return [`SyscallError::Failed`] if command exits unsuccessfully.
#[instrument(skip(cmd, args), level = "debug")]
pub fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let command = cmd.as_ref().to_os_string();
    let output = Command::new(&command)
        .args(args)
        .output()
        .map_err(|source| SyscallError::Spawn {
            command: command.clone(),
            source,
        })?;

    let message = collect_output(&output.stdout, &output.stderr);
    check_status(command, output.status, message.clone())?;

    Ok(message)
}

/// Run command feeding target bytes through its stdin.
///
/// Stdout and stderr stay inherited so that whatever the child reports
/// reaches the operator directly.
///
/// # Errors
///
/// - Return [`SyscallError::Spawn`] if command cannot be started.
/// - Return [`SyscallError::Failed`] if command exits unsuccessfully, even
///   when it quit before reading all of its input.
/// - Return [`SyscallError::Stdin`] if input cannot be written to child for
///   any reason other than the child closing its end.
#[instrument(skip(cmd, args, input), level = "debug")]
pub fn syscall_with_stdin(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    input: &[u8],
) -> Result<()> {
    let command = cmd.as_ref().to_os_string();
    let mut child = Command::new(&command)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|source| SyscallError::Spawn {
            command: command.clone(),
            source,
        })?;

    // INVARIANT: Drop stdin handle after writing so the child sees EOF.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(input),
        None => Ok(()),
    };

    // INVARIANT: Always reap the child, even if it stopped reading early.
    let status = child.wait().map_err(|source| SyscallError::Spawn {
        command: command.clone(),
        source,
    })?;
    check_status(command.clone(), status, String::new())?;

    // A child that exits successfully without consuming all input is fine.
    match written {
        Err(source) if source.kind() != ErrorKind::BrokenPipe => {
            Err(SyscallError::Stdin { command, source })
        }
        _ => Ok(()),
    }
}

fn check_status(command: OsString, status: ExitStatus, message: String) -> Result<()> {
    if !status.success() {
        return Err(SyscallError::Failed {
            command,
            status,
            message,
        });
    }

    Ok(())
}

fn collect_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message)
}

/// External process error types.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// Command could not be started or waited on.
    #[error("failed to run command {command:?}")]
    Spawn {
        command: OsString,
        #[source]
        source: std::io::Error,
    },

    /// Input could not be fed to command.
    #[error("failed to write input to command {command:?}")]
    Stdin {
        command: OsString,
        #[source]
        source: std::io::Error,
    },

    /// Command ran, but exited unsuccessfully.
    #[error("command {command:?} failed with {status}\n{message}")]
    Failed {
        command: OsString,
        status: ExitStatus,
        message: String,
    },
}

/// Friendly result alias :3
type Result<T, E = SyscallError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_interactive_captures_output() -> anyhow::Result<()> {
        let result = syscall_non_interactive("sh", ["-c", "printf 'hello\\n'"])?;
        assert_eq!(result, "stdout: hello");

        Ok(())
    }

    #[test]
    fn non_zero_exit_is_error() {
        let result = syscall_non_interactive("sh", ["-c", "echo oops >&2; exit 3"]);
        match result {
            Err(SyscallError::Failed {
                status, message, ..
            }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(message, "stderr: oops");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_command_is_spawn_error() {
        let result = syscall_interactive("pushdock-definitely-missing-binary", ["--help"]);
        assert!(matches!(result, Err(SyscallError::Spawn { .. })));
    }

    #[test]
    fn stdin_is_fed_to_child() {
        let result = syscall_with_stdin("sh", ["-s"], b"exit 0\n");
        assert!(result.is_ok());

        let result = syscall_with_stdin("sh", ["-s"], b"exit 7\n");
        assert!(matches!(result, Err(SyscallError::Failed { .. })));
    }

    #[test]
    fn early_exit_reports_exit_status() {
        let input = format!("exit 5\n{}", "# padding\n".repeat(200_000));
        let result = syscall_with_stdin("sh", ["-s"], input.as_bytes());
        match result {
            Err(SyscallError::Failed { status, .. }) => assert_eq!(status.code(), Some(5)),
            other => panic!("expected failure, got {other:?}"),
        }

        let input = format!("exit 0\n{}", "# padding\n".repeat(200_000));
        assert!(syscall_with_stdin("sh", ["-s"], input.as_bytes()).is_ok());
    }
}
