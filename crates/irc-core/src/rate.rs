use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::session::Outbound;
use crate::shutdown::Shutdown;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

const HANDOFF_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundItem {
    pub target: String,
    pub text: String,
}

#[derive(Clone)]
pub struct RateLimiter {
    tx: mpsc::Sender<OutboundItem>,
    shutdown: Shutdown,
}

impl RateLimiter {
    pub fn spawn(out: Outbound, interval: Duration) -> (Self, JoinHandle<()>) {
        let shutdown = out.shutdown().clone();
        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        let registry = tokio::spawn(run_registry(rx, out, interval));
        (Self { tx, shutdown }, registry)
    }

    /// Hands `text` to the worker for `target`. Returns without delivering if
    /// the session is, or becomes, cancelled.
    pub async fn enqueue(&self, target: &str, text: &str) {
        let item = OutboundItem {
            target: target.to_string(),
            text: text.to_string(),
        };
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                trace!(dest = %target, "dropping item after shutdown");
            }
            res = self.tx.send(item) => {
                if res.is_err() {
                    trace!("rate limiter registry gone");
                }
            }
        }
    }
}

async fn run_registry(mut rx: mpsc::Receiver<OutboundItem>, out: Outbound, interval: Duration) {
    let shutdown = out.shutdown().clone();
    let mut workers: HashMap<String, mpsc::UnboundedSender<String>> = HashMap::new();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            item = rx.recv() => {
                let Some(OutboundItem { target, text }) = item else { break };
                let worker = workers.entry(target.clone()).or_insert_with(|| {
                    debug!(dest = %target, "starting target worker");
                    let (tx, rx) = mpsc::unbounded_channel();
                    tasks.spawn(run_worker(target.clone(), rx, out.clone(), interval));
                    tx
                });
                if worker.send(text).is_err() {
                    // Workers only exit on shutdown.
                    break;
                }
            }
        }
    }

    rx.close();
    drop(workers);
    let count = tasks.len();
    while tasks.join_next().await.is_some() {}
    debug!(targets = count, "rate limiter stopped");
}

async fn run_worker(
    target: String,
    mut rx: mpsc::UnboundedReceiver<String>,
    out: Outbound,
    interval: Duration,
) {
    let shutdown = out.shutdown().clone();
    let mut pending: VecDeque<String> = VecDeque::new();
    let mut last_delivery: Option<Instant> = None;
    let mut timer: Option<Instant> = None;
    let mut open = true;

    loop {
        if !open && pending.is_empty() {
            return;
        }
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                if !pending.is_empty() {
                    debug!(dest = %target, dropped = pending.len(), "abandoning queue");
                }
                return;
            }
            _ = wait_for(timer) => {
                timer = None;
                if let Some(text) = pending.pop_front() {
                    if deliver(&out, &target, &text).await.is_err() {
                        return;
                    }
                    let now = Instant::now();
                    last_delivery = Some(now);
                    if !pending.is_empty() {
                        timer = Some(now + interval);
                    }
                }
            }
            text = rx.recv(), if open => {
                let Some(text) = text else {
                    open = false;
                    continue;
                };
                if timer.is_some() || !pending.is_empty() {
                    pending.push_back(text);
                    continue;
                }
                // Idle. Deliver now unless the previous delivery is too recent.
                let now = Instant::now();
                match last_delivery {
                    Some(last) if now < last + interval => {
                        pending.push_back(text);
                        timer = Some(last + interval);
                    }
                    _ => {
                        if deliver(&out, &target, &text).await.is_err() {
                            return;
                        }
                        last_delivery = Some(now);
                        timer = Some(now + interval);
                    }
                }
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn deliver(out: &Outbound, target: &str, text: &str) -> Result<(), SessionError> {
    out.send("PRIVMSG", &[target, text]).await
}
