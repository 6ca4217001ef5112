//! Builder for `git` subprocesses.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::BackendError;
use crate::Result;

/// Captured result of a finished git process.
#[derive(Debug)]
pub struct GitOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, if the process was not killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Fluent wrapper over `std::process::Command` for running `git`.
///
/// Output streams are always piped. The environment is pinned so that
/// porcelain output stays parseable regardless of user configuration.
pub struct GitProcess {
    program: OsString,
    args: Vec<OsString>,
    env_vars: Vec<(OsString, OsString)>,
    working_dir: Option<PathBuf>,
}

impl GitProcess {
    /// A process running the `git` found on `PATH`.
    pub fn git() -> Self {
        Self::new("git")
    }

    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            env_vars: vec![
                ("LC_ALL".into(), "C".into()),
                ("GIT_TERMINAL_PROMPT".into(), "0".into()),
            ],
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, val: impl AsRef<OsStr>) -> Self {
        self.env_vars
            .push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, val) in &self.env_vars {
            cmd.env(key, val);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Command line for error messages.
    pub fn command_string(&self) -> String {
        let mut s = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            s.push(' ');
            s.push_str(&arg.to_string_lossy());
        }
        s
    }

    /// Run to completion and capture both streams. A non-zero exit is not
    /// an error here; see [`GitProcess::run_checked`].
    pub fn run(&self) -> Result<GitOutput> {
        let output = self
            .build_command()
            .output()
            .map_err(|source| BackendError::Spawn {
                command: self.command_string(),
                source,
            })?;
        Ok(GitOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run to completion, failing on a non-zero exit status.
    pub fn run_checked(&self) -> Result<GitOutput> {
        let output = self.run()?;
        if !output.success() {
            return Err(self.failure(&output));
        }
        Ok(output)
    }

    /// Spawn without waiting; stdout is left for the caller to stream.
    pub fn spawn(&self) -> Result<Child> {
        self.build_command()
            .spawn()
            .map_err(|source| BackendError::Spawn {
                command: self.command_string(),
                source,
            })
    }

    /// Error describing a failed run of this process.
    pub fn failure(&self, output: &GitOutput) -> BackendError {
        BackendError::CommandFailed {
            command: self.command_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
