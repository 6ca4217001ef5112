use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use git_commitgraph::{BranchModel, BranchRef};
use git_session::Session;

use super::open_context;

#[derive(Args)]
pub struct BranchesArgs {
    /// Only list local branches
    #[arg(short, long, conflicts_with = "remotes")]
    local: bool,

    /// Only list remote-tracking branches
    #[arg(short, long)]
    remotes: bool,
}

pub fn run(args: &BranchesArgs, session: &Session) -> Result<i32> {
    let ctx = open_context(session)?;
    let model = ctx.branches();
    model.update_all_branches()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !args.remotes {
        if let Some(current) = model.current_branch() {
            if !model.local_branches().iter().any(|b| b.ref_path == current.ref_path) {
                writeln!(out, "* (HEAD detached at {})", current.head.short())?;
            }
        }
        for branch in model.local_branches().iter() {
            writeln!(out, "{}", format_branch(model, branch))?;
        }
    }
    if !args.local {
        for branch in model.remote_branches().iter() {
            writeln!(out, "{}", format_branch(model, branch))?;
        }
    }
    out.flush()?;
    Ok(0)
}

/// `* name head [upstream]` for locals; remotes carry `[tracked]` when a
/// local branch follows them.
fn format_branch(model: &BranchModel, branch: &BranchRef) -> String {
    let mark = if branch.is_local() && model.is_current(branch) { '*' } else { ' ' };
    let mut line = format!("{} {} {}", mark, branch.name, branch.head.short());
    if let Some(upstream) = branch.upstream_ref_path() {
        line.push_str(&format!(" [{upstream}]"));
    } else if branch.is_remote() && model.is_tracked(branch) {
        line.push_str(" [tracked]");
    }
    line
}
