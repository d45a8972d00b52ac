//! Version-control plumbing over the `git` executable.
//!
//! Every invocation is bounded by a timeout. Failures are logged and come back
//! as `None`/`false` so callers can fall back instead of aborting.

use std::io::Read as _;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::error::Error;

/// Upper bound on a single git invocation.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Files changed between `commit` and the working tree, project-relative.
/// The commit must already be validated as a hexadecimal hash.
pub fn changed_files_since(root: &Path, commit: &str) -> Option<Vec<String>> {
    let output = run_git(root, &["diff", "--name-only", commit, "--"])?;
    return Some(output.lines().map(str::trim).filter(|l| return !l.is_empty()).map(String::from).collect());
}

/// Checked-out branch name, `None` outside a repository.
pub fn current_branch(root: &Path) -> Option<String> {
    return run_git(root, &["rev-parse", "--abbrev-ref", "HEAD"])
        .map(|out| return out.trim().to_string())
        .filter(|branch| return !branch.is_empty());
}

/// Full hash of `HEAD`, `None` outside a repository or before the first commit.
pub fn head_commit(root: &Path) -> Option<String> {
    return run_git(root, &["rev-parse", "HEAD"])
        .map(|out| return out.trim().to_string())
        .filter(|hash| return !hash.is_empty());
}

/// History-preserving move with `git mv`. Returns whether git performed it.
pub fn move_path(root: &Path, from: &str, to: &str) -> bool {
    return run_git(root, &["mv", "--", from, to]).is_some();
}

/// Run git in `cwd`; stdout on success, `None` (with a warning) on any failure.
pub fn run_git(cwd: &Path, args: &[&str]) -> Option<String> {
    return match run_with_timeout(cwd, args, GIT_TIMEOUT) {
        Ok(stdout) => Some(stdout),
        Err(e) => {
            log::warn!("{e}");
            None
        },
    };
}

/// Run git in `cwd`, waiting at most `timeout`.
///
/// # Errors
///
/// Returns `Error::GitFailed` if git cannot start, exits non-zero or times out.
fn run_with_timeout(cwd: &Path, args: &[&str], timeout: Duration) -> Result<String, Error> {
    let mut command = Command::new("git");
    command.args(args).current_dir(cwd);
    return wait_for_output(command, &args.join(" "), timeout);
}

/// Spawn `command` and drain stdout and stderr on their own threads so a
/// chatty stderr cannot stall the child. The child is killed and reaped when
/// `timeout` expires.
///
/// # Errors
///
/// Returns `Error::GitFailed` labelled with `label` if the command cannot
/// start, exits non-zero or times out.
fn wait_for_output(mut command: Command, label: &str, timeout: Duration) -> Result<String, Error> {
    let failed = |reason: String| {
        return Error::GitFailed {
            args: label.to_string(),
            reason,
        };
    };

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| return failed(format!("could not start git: {e}")))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stderr_reader = std::thread::spawn(move || {
        let mut err = String::new();
        if let Some(mut pipe) = stderr {
            let _read = pipe.read_to_string(&mut err);
        }
        return err;
    });
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut out = String::new();
        if let Some(mut pipe) = stdout {
            let _read = pipe.read_to_string(&mut out);
        }
        let err = stderr_reader.join().unwrap_or_default();
        let _sent = tx.send((out, err));
    });

    let Ok((out, err)) = rx.recv_timeout(timeout) else {
        let _killed = child.kill();
        let _reaped = child.wait();
        return Err(failed(format!("timed out after {}s", timeout.as_secs())));
    };

    let status = child.wait().map_err(|e| return failed(e.to_string()))?;
    if !status.success() {
        let reason = match err.trim() {
            "" => format!("exit status {status}"),
            message => message.to_string(),
        };
        return Err(failed(reason));
    }
    return Ok(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fresh repository with one commit, or `None` when git is unavailable.
    fn repo() -> Option<tempfile::TempDir> {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init", "-q"])?;
        std::fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        run_git(dir.path(), &["add", "a.txt"])?;
        run_git(
            dir.path(),
            &["-c", "user.name=Docs", "-c", "user.email=docs@example.com", "commit", "-q", "-m", "init"],
        )?;
        return Some(dir);
    }

    #[test]
    fn head_and_changes() {
        let Some(dir) = repo() else {
            return;
        };
        let head = head_commit(dir.path()).unwrap();
        assert_eq!(head.len(), 40);
        assert!(current_branch(dir.path()).is_some());

        std::fs::write(dir.path().join("a.txt"), "two\n").unwrap();
        assert_eq!(changed_files_since(dir.path(), &head).unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn move_keeps_file_tracked() {
        let Some(dir) = repo() else {
            return;
        };
        assert!(move_path(dir.path(), "a.txt", "b.txt"));
        assert!(dir.path().join("b.txt").exists());
        assert!(!move_path(dir.path(), "missing.txt", "c.txt"));
    }

    #[test]
    fn outside_a_repository_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(head_commit(dir.path()), None);
    }

    #[test]
    fn large_stderr_does_not_stall() {
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 300000 /dev/zero | tr '\\0' e >&2; echo done"]);
        let started = std::time::Instant::now();
        let out = wait_for_output(command, "sh", Duration::from_secs(10)).unwrap();
        assert_eq!(out, "done\n");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn failures_name_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_with_timeout(dir.path(), &["rev-parse", "HEAD"], GIT_TIMEOUT).unwrap_err();
        assert!(err.to_string().starts_with("git rev-parse HEAD failed"));
    }
}
