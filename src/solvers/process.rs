//! Process plumbing shared by the external solver adapters.
//!
//! Command line solvers historically read and write fixed-name files in
//! their working directory, so every solve gets a uniquely named scoped
//! directory of its own: concurrent solves can never trample each other's
//! files. The directory is removed when the guard drops.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::debug;

use super::SolveError;

/// Extra time granted beyond the user's limit, so engines that honour their
/// own time limit option get to write their report before we give up.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A uniquely named working directory for one solve, freed on drop.
pub(crate) struct ScopedWorkdir {
    dir: TempDir,
}

impl ScopedWorkdir {
    pub(crate) fn create(prefix: &str) -> Result<Self, SolveError> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!(path = %dir.path().display(), "created solver working directory");
        Ok(ScopedWorkdir { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// What a finished solver process left behind.
pub(crate) struct SolverRun {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Run a solver command to completion inside `workdir`, killing it if it
/// overruns `time_limit` by more than a grace period.
///
/// stdout/stderr are captured through files rather than pipes: engines can
/// be chatty and a full pipe would deadlock the wait loop.
pub(crate) fn run_solver(
    mut command: Command,
    workdir: &Path,
    time_limit: Option<Duration>,
) -> Result<SolverRun, SolveError> {
    let stdout_path = workdir.join("solver.out.log");
    let stderr_path = workdir.join("solver.err.log");
    command
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(File::create(&stdout_path)?)
        .stderr(File::create(&stderr_path)?);

    let program = command.get_program().to_string_lossy().into_owned();
    debug!(%program, args = ?command.get_args().collect::<Vec<_>>(), "invoking solver");
    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => SolveError::Unavailable {
            command: program.clone(),
            source,
        },
        _ => SolveError::Io(source),
    })?;

    let deadline = time_limit.map(|limit| limit + DEADLINE_GRACE);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(deadline) = deadline {
            if started.elapsed() > deadline {
                debug!(%program, "killing solver process past its deadline");
                let _ = child.kill();
                let _ = child.wait();
                return Err(SolveError::Timeout(time_limit.unwrap_or_default()));
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = fs::read_to_string(&stdout_path).unwrap_or_default();
    let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
    debug!(
        %program,
        elapsed = ?started.elapsed(),
        code = ?status.code(),
        "solver process finished"
    );
    Ok(SolverRun {
        status,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workdirs_are_distinct_and_cleaned_up() {
        let first = ScopedWorkdir::create("almo-test").unwrap();
        let second = ScopedWorkdir::create("almo-test").unwrap();
        assert_ne!(first.path(), second.path());
        let remembered = first.path().to_path_buf();
        drop(first);
        assert!(!remembered.exists());
    }

    #[test]
    fn missing_binaries_are_reported_as_unavailable() {
        let workdir = ScopedWorkdir::create("almo-test").unwrap();
        let result = run_solver(
            Command::new("almo-no-such-solver-binary"),
            workdir.path(),
            None,
        );
        assert!(matches!(result, Err(SolveError::Unavailable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn overrunning_processes_are_killed() {
        let workdir = ScopedWorkdir::create("almo-test").unwrap();
        let mut command = Command::new("sleep");
        command.arg("30");
        let started = Instant::now();
        let result = run_solver(command, workdir.path(), Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(SolveError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
