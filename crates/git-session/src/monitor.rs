//! Background polling of one repository context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::context::RepoContext;

/// Published by a [`Monitor`] after each poll that did something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The tree model changed; carries its new generation.
    Changed { generation: u64 },
    /// The poll failed; the model was left unchanged.
    Failed(String),
}

struct Control {
    paused: AtomicUsize,
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// One worker thread calling [`RepoContext::refresh_and_update`] on a fixed
/// interval. Stopped explicitly or on drop.
pub struct Monitor {
    control: Arc<Control>,
    events: Receiver<MonitorEvent>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Start polling `context` every `interval`. The first poll happens
    /// immediately.
    pub fn start(context: Arc<RepoContext>, interval: Duration) -> std::io::Result<Self> {
        let control = Arc::new(Control {
            paused: AtomicUsize::new(0),
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let (sender, events) = crossbeam_channel::unbounded();
        let worker_control = Arc::clone(&control);
        let handle = thread::Builder::new()
            .name("gitgraph-monitor".into())
            .spawn(move || run(&context, &worker_control, &sender, interval))?;
        Ok(Self {
            control,
            events,
            handle: Some(handle),
        })
    }

    pub fn events(&self) -> &Receiver<MonitorEvent> {
        &self.events
    }

    /// Suspend polling. Calls nest; each needs a matching [`resume`](Self::resume).
    pub fn pause(&self) {
        self.control.paused.fetch_add(1, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        let _ = self
            .control
            .paused
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn is_paused(&self) -> bool {
        self.control.paused.load(Ordering::SeqCst) > 0
    }

    /// Stop the worker and wait for it to exit.
    pub fn stop(&mut self) {
        *self.control.stopped.lock() = true;
        self.control.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("monitor thread panicked");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    context: &RepoContext,
    control: &Control,
    sender: &Sender<MonitorEvent>,
    interval: Duration,
) {
    debug!(path = %context.location().display(), ?interval, "monitor started");
    loop {
        if control.paused.load(Ordering::SeqCst) == 0 {
            let event = match context.refresh_and_update() {
                Ok(true) => Some(MonitorEvent::Changed {
                    generation: context.tree().generation(),
                }),
                Ok(false) => None,
                Err(err) => {
                    warn!(path = %context.location().display(), error = %err, "poll failed");
                    Some(MonitorEvent::Failed(err.to_string()))
                }
            };
            if let Some(event) = event {
                if sender.send(event).is_err() {
                    break;
                }
            }
        }

        let mut stopped = control.stopped.lock();
        if !*stopped {
            control.wake.wait_for(&mut stopped, interval);
        }
        if *stopped {
            break;
        }
    }
    debug!(path = %context.location().display(), "monitor stopped");
}
