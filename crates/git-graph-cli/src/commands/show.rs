use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use git_session::{RepoContext, Session};

use super::open_context;

#[derive(Args)]
pub struct ShowArgs {
    /// Include invisible placeholder cells
    #[arg(long)]
    all: bool,

    /// Print at most <n> cells
    #[arg(short = 'n', long, value_name = "n")]
    limit: Option<usize>,
}

pub fn run(args: &ShowArgs, session: &Session) -> Result<i32> {
    let ctx = open_context(session)?;
    ctx.refresh_and_update()?;

    let cells = if args.all {
        ctx.tree().cells()
    } else {
        ctx.visible_cells()
    };
    let limit = args.limit.unwrap_or(usize::MAX);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for cell in cells.iter().rev().take(limit) {
        writeln!(out, "{}", format_line(&ctx, cell))?;
    }
    out.flush()?;
    Ok(0)
}

/// `<short> <L|R|B|-> [(refs)] <subject>`
fn format_line(ctx: &RepoContext, cell: &git_session::Cell) -> String {
    let marker = ctx
        .classify_commit(&cell.id)
        .map_or('-', |locality| locality.marker());
    let subject = cell.label.rsplit('\n').next().unwrap_or_default();
    let refs = ctx.ref_labels(&cell.id);
    if refs.is_empty() {
        format!("{} {} {}", cell.id.short(), marker, subject)
    } else {
        format!("{} {} ({}) {}", cell.id.short(), marker, refs.join(", "), subject)
    }
}
