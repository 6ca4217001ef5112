//! Backend that drives the `git` executable.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout};
use std::thread::{self, JoinHandle};

use bstr::ByteSlice;
use git_hash::CommitId;
use tracing::debug;

use crate::process::GitProcess;
use crate::{
    Backend, BackendError, BranchListing, CommitIter, RawCommit, RefKind, Result, TagListing,
    Upstream,
};

/// `git log` format: fields separated by NUL, records terminated by RS.
const LOG_FORMAT: &str = "--format=%H%x00%P%x00%an%x00%ae%x00%at%x00%B%x1e";
const RECORD_SEPARATOR: u8 = 0x1e;

/// A repository accessed through `git` subprocesses.
#[derive(Debug, Clone)]
pub struct CliBackend {
    location: PathBuf,
}

impl CliBackend {
    /// Open the repository containing `path`.
    ///
    /// The location is the top of the working tree, or the git directory
    /// for a bare repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toplevel = GitProcess::git()
            .working_dir(path)
            .args(["rev-parse", "--show-toplevel"])
            .run()?;
        let location = if toplevel.success() {
            first_line(&toplevel.stdout)
        } else {
            let git_dir = GitProcess::git()
                .working_dir(path)
                .args(["rev-parse", "--absolute-git-dir"]);
            first_line(&git_dir.run_checked()?.stdout)
        };
        debug!(location = %location, "opened repository");
        Ok(Self {
            location: PathBuf::from(location),
        })
    }

    fn git(&self) -> GitProcess {
        GitProcess::git().working_dir(&self.location)
    }

    /// Run a query that exits 1 with no output when the answer is "nothing".
    fn optional_line(&self, args: &[&str]) -> Result<Option<String>> {
        let process = self.git().args(args);
        let output = process.run()?;
        match output.code() {
            Some(0) => Ok(Some(first_line(&output.stdout))),
            Some(1) => Ok(None),
            _ => Err(process.failure(&output)),
        }
    }
}

fn first_line(bytes: &[u8]) -> String {
    bytes
        .lines()
        .next()
        .map(|line| line.to_str_lossy().into_owned())
        .unwrap_or_default()
}

fn parse_id(field: &[u8]) -> Result<CommitId> {
    let text = field
        .to_str()
        .map_err(|_| BackendError::Parse(format!("non-UTF-8 object id: {:?}", field.as_bstr())))?;
    Ok(CommitId::from_hex(text.trim())?)
}

impl Backend for CliBackend {
    fn location(&self) -> &Path {
        &self.location
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<CommitId>> {
        let spec = format!("{name}^{{commit}}");
        match self.optional_line(&["rev-parse", "--verify", "--quiet", &spec])? {
            Some(hex) => Ok(Some(CommitId::from_hex(&hex)?)),
            None => Ok(None),
        }
    }

    fn current_branch(&self) -> Result<Option<String>> {
        if let Some(target) = self.optional_line(&["symbolic-ref", "-q", "HEAD"])? {
            return Ok(Some(target));
        }
        self.optional_line(&["rev-parse", "--verify", "--quiet", "HEAD"])
    }

    fn list_branches(&self, kind: RefKind) -> Result<Vec<BranchListing>> {
        let prefix = kind.prefix();
        let output = self
            .git()
            .args([
                "for-each-ref",
                "--format=%(objectname)%00%(refname)",
                prefix,
            ])
            .run_checked()?;

        let mut branches = Vec::new();
        for line in output.stdout.lines() {
            let Some((oid, ref_path)) = line.split_once_str(b"\0") else {
                return Err(BackendError::Parse(format!(
                    "for-each-ref line: {:?}",
                    line.as_bstr()
                )));
            };
            let ref_path = ref_path.to_str_lossy().into_owned();
            let name = ref_path
                .strip_prefix(prefix)
                .unwrap_or(&ref_path)
                .to_string();
            branches.push(BranchListing {
                name,
                ref_path,
                head: parse_id(oid)?,
            });
        }
        Ok(branches)
    }

    fn walk_ancestry<'a>(&'a self, starts: &[CommitId]) -> Result<CommitIter<'a>> {
        if starts.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        let process = self
            .git()
            .args(["log", "--topo-order", "--reverse", "--no-color", LOG_FORMAT])
            .args(starts.iter().map(|id| id.to_hex()))
            .arg("--");
        Ok(Box::new(LogRecords::start(&process)?))
    }

    fn branch_config(&self, branch: &str) -> Result<Option<Upstream>> {
        let remote_key = format!("branch.{branch}.remote");
        let merge_key = format!("branch.{branch}.merge");
        let Some(merge_ref) = self.optional_line(&["config", "--get", &merge_key])? else {
            return Ok(None);
        };
        let remote = self
            .optional_line(&["config", "--get", &remote_key])?
            .unwrap_or_else(|| ".".to_string());
        Ok(Some(Upstream { remote, merge_ref }))
    }

    fn list_tags(&self) -> Result<Vec<TagListing>> {
        let output = self
            .git()
            .args([
                "for-each-ref",
                "--format=%(refname:strip=2)%00%(objectname)%00%(*objectname)",
                "refs/tags/",
            ])
            .run_checked()?;

        let mut tags = Vec::new();
        for line in output.stdout.lines() {
            let fields: Vec<&[u8]> = line.split_str(b"\0").collect();
            let [name, direct, peeled] = fields[..] else {
                return Err(BackendError::Parse(format!(
                    "for-each-ref line: {:?}",
                    line.as_bstr()
                )));
            };
            let target = if peeled.is_empty() { direct } else { peeled };
            tags.push(TagListing {
                name: name.to_str_lossy().into_owned(),
                target: parse_id(target)?,
            });
        }
        Ok(tags)
    }
}

/// Streaming reader over `git log` records.
///
/// Stderr is drained on its own thread so a chatty child never blocks on a
/// full pipe while records are being consumed.
struct LogRecords {
    command: String,
    child: Option<Child>,
    reader: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    buf: Vec<u8>,
}

impl LogRecords {
    fn start(process: &GitProcess) -> Result<Self> {
        let mut child = process.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Parse("git log stdout was not captured".into()))?;
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                use std::io::Read;

                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                bytes
            })
        });
        Ok(Self {
            command: process.command_string(),
            child: Some(child),
            reader: BufReader::new(stdout),
            stderr,
            buf: Vec::new(),
        })
    }

    /// Reap the child once stdout is exhausted; a failing exit becomes the
    /// last item of the walk.
    fn finish(&mut self) -> Option<Result<RawCommit>> {
        let mut child = self.child.take()?;
        let status = match child.wait() {
            Ok(status) => status,
            Err(err) => return Some(Err(err.into())),
        };
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if status.success() {
            return None;
        }
        Some(Err(BackendError::CommandFailed {
            command: self.command.clone(),
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }))
    }
}

impl Iterator for LogRecords {
    type Item = Result<RawCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        use std::io::BufRead;

        self.child.as_ref()?;
        self.buf.clear();
        match self.reader.read_until(RECORD_SEPARATOR, &mut self.buf) {
            Ok(0) => self.finish(),
            Ok(_) => {
                let record = self.buf.strip_suffix(&[RECORD_SEPARATOR]).unwrap_or(&self.buf);
                let record = record.trim_start_with(|c| c == '\n');
                if record.is_empty() {
                    return self.finish();
                }
                Some(parse_log_record(record))
            }
            Err(err) => {
                self.child = None;
                Some(Err(err.into()))
            }
        }
    }
}

impl Drop for LogRecords {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn parse_log_record(record: &[u8]) -> Result<RawCommit> {
    let fields: Vec<&[u8]> = record.splitn_str(6, b"\0").collect();
    let [id, parents, name, email, time, message] = fields[..] else {
        return Err(BackendError::Parse(format!(
            "truncated log record: {:?}",
            record.as_bstr()
        )));
    };
    let parents = parents
        .fields()
        .map(parse_id)
        .collect::<Result<Vec<_>>>()?;
    let timestamp = time
        .to_str()
        .ok()
        .and_then(|t| t.trim().parse::<i64>().ok())
        .ok_or_else(|| BackendError::Parse(format!("bad timestamp: {:?}", time.as_bstr())))?;
    Ok(RawCommit {
        id: parse_id(id)?,
        parents,
        author_name: name.to_str_lossy().into_owned(),
        author_email: email.to_str_lossy().into_owned(),
        timestamp,
        message: message.trim_end_with(|c| c == '\n').to_str_lossy().into_owned(),
    })
}
