use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use git_session::{Monitor, MonitorEvent, Session};
use tracing::info;

use super::open_context;

#[derive(Args)]
pub struct WatchArgs {
    /// Exit after <n> reported events
    #[arg(long, value_name = "n")]
    cycles: Option<usize>,

    /// Poll interval in milliseconds (defaults to the config value)
    #[arg(long, value_name = "ms")]
    interval: Option<u64>,
}

pub fn run(args: &WatchArgs, session: &Session) -> Result<i32> {
    let ctx = open_context(session)?;
    let interval = match args.interval {
        Some(ms) if ms > 0 => Duration::from_millis(ms),
        Some(_) => anyhow::bail!("--interval must be greater than zero"),
        None => session.config().poll_interval(),
    };
    info!(path = %ctx.location().display(), ?interval, "watching");
    let mut monitor = Monitor::start(Arc::clone(&ctx), interval)?;

    let stdout = io::stdout();
    let mut failed = false;
    let mut seen = 0;
    while args.cycles.map_or(true, |n| seen < n) {
        let Ok(event) = monitor.events().recv() else {
            break;
        };
        seen += 1;
        let mut out = stdout.lock();
        match event {
            MonitorEvent::Changed { generation } => {
                failed = false;
                writeln!(
                    out,
                    "generation {generation}: {} cells, {} visible",
                    ctx.tree().len(),
                    ctx.visible_cells().len()
                )?;
            }
            MonitorEvent::Failed(message) => {
                failed = true;
                writeln!(out, "error: {message}")?;
            }
        }
        out.flush()?;
    }
    monitor.stop();
    Ok(if failed { 1 } else { 0 })
}
