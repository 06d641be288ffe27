use std::error::Error;
use std::fmt;
use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command};

/// Conventional exit code for "command not found".
pub(crate) const EXIT_NOT_FOUND: i32 = 127;

#[derive(Debug)]
pub enum ExecutionError {
    EmptyCommand,
    Spawn(io::Error),
    Wait(io::Error),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::EmptyCommand => write!(f, "empty command"),
            ExecutionError::Spawn(e) => write!(f, "spawn failed: {}", e),
            ExecutionError::Wait(e) => write!(f, "wait failed: {}", e),
        }
    }
}

impl Error for ExecutionError {}

#[derive(Debug)]
pub(crate) enum Outcome {
    /// Foreground child exited; 127 means the program was not found.
    Exited(i32),
    /// Foreground child was terminated by a signal.
    Signaled(i32),
    /// Background child, returned without waiting.
    Background(Child),
}

/// Spawns `argv` as an external process. Foreground blocks until the child
/// terminates and surfaces its exit status; background returns the child
/// handle immediately after a successful spawn.
///
/// The child restores default SIGINT/SIGQUIT dispositions before exec, so
/// the shell's own interrupt handling is never inherited.
pub(crate) fn run(argv: &[&str], background: bool) -> Result<Outcome, ExecutionError> {
    let program = *argv.first().ok_or(ExecutionError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(&argv[1..]);
    unsafe {
        command.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            Ok(())
        });
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if !background && e.kind() == io::ErrorKind::NotFound => {
            eprintln!("ish: exec failed for {}: {}", program, e);
            return Ok(Outcome::Exited(EXIT_NOT_FOUND));
        }
        Err(e) => return Err(ExecutionError::Spawn(e)),
    };

    if background {
        return Ok(Outcome::Background(child));
    }

    let status = child.wait().map_err(ExecutionError::Wait)?;
    match status.code() {
        Some(code) => Ok(Outcome::Exited(code)),
        None => Ok(Outcome::Signaled(status.signal().unwrap_or(0))),
    }
}

#[cfg(test)]
mod tests {
    use super::{run, ExecutionError, Outcome, EXIT_NOT_FOUND};
    use std::time::{Duration, Instant};

    #[test]
    fn test_foreground_success_status() {
        match run(&["true"], false) {
            Ok(Outcome::Exited(0)) => {}
            other => panic!("expected Exited(0), got {:?}", other),
        }
    }

    #[test]
    fn test_foreground_failure_status() {
        match run(&["false"], false) {
            Ok(Outcome::Exited(code)) => assert_ne!(code, 0),
            other => panic!("expected non-zero Exited, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_exits_127() {
        match run(&["definitely-not-a-real-program-ish"], false) {
            Ok(Outcome::Exited(code)) => assert_eq!(code, EXIT_NOT_FOUND),
            other => panic!("expected Exited(127), got {:?}", other),
        }
    }

    #[test]
    fn test_background_returns_before_completion() {
        let start = Instant::now();
        let outcome = run(&["sleep", "5"], true).unwrap();
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "background spawn blocked the caller"
        );

        match outcome {
            Outcome::Background(mut child) => {
                child.kill().unwrap();
                child.wait().unwrap();
            }
            other => panic!("expected Background, got {:?}", other),
        }
    }

    #[test]
    fn test_background_missing_program_is_spawn_error() {
        match run(&["definitely-not-a-real-program-ish"], true) {
            Err(ExecutionError::Spawn(_)) => {}
            other => panic!("expected Spawn error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_argv_rejected() {
        match run(&[], false) {
            Err(ExecutionError::EmptyCommand) => {}
            other => panic!("expected EmptyCommand, got {:?}", other),
        }
    }
}
