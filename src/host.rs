//! The host decides who may try to eat.
//!
//! Requests are handled one at a time in arrival order. The host only counts
//! admitted philosophers. It never looks at forks, so correctness rests on the
//! capacity being below half the table.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::{sync::oneshot, task::JoinSet};
use tracing::{debug, trace, warn};

use crate::{
    channel::{self, Receiver, Sender},
    error::PartyError,
    lock,
};

/// Queued requests the host accepts before a sender has to wait.
pub const REQUEST_QUEUE_DEPTH: usize = 1;

#[derive(Debug, Default)]
struct Tally {
    active: usize,
    peak: usize,
}

/// One admission attempt. Both slots are single-use and die with the request.
#[derive(Debug)]
pub struct Request {
    philosopher: usize,
    reply: oneshot::Sender<bool>,
    done: oneshot::Receiver<()>,
}

#[derive(Debug)]
pub enum Admission {
    Granted(Completion),
    Denied,
}

/// Signals the host that an admitted meal is over.
///
/// Dropping it without calling [`finish`](Completion::finish) also frees the
/// slot, so a philosopher that dies mid-meal cannot leak capacity.
#[derive(Debug)]
#[must_use = "the host keeps the slot occupied until the completion is finished or dropped"]
pub struct Completion {
    philosopher: usize,
    done: oneshot::Sender<()>,
}

impl Completion {
    pub fn finish(self) {
        if self.done.send(()).is_err() {
            debug!(philosopher = self.philosopher, "host stopped watching this meal");
        }
    }
}

/// What a philosopher holds to talk to the host.
#[derive(Clone)]
pub struct HostHandle {
    requests: Sender<Request>,
    tally: Arc<Mutex<Tally>>,
}

impl HostHandle {
    pub async fn request(&self, philosopher: usize) -> Result<Admission, PartyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let request = Request {
            philosopher,
            reply: reply_tx,
            done: done_rx,
        };
        self.requests
            .send(request)
            .await
            .map_err(|_| PartyError::HostGone { philosopher })?;

        match reply_rx.await {
            Ok(true) => Ok(Admission::Granted(Completion {
                philosopher,
                done: done_tx,
            })),
            Ok(false) => Ok(Admission::Denied),
            Err(_) => Err(PartyError::HostGone { philosopher }),
        }
    }

    /// Snapshot of how many philosophers are admitted right now.
    pub fn active(&self) -> usize {
        lock(&self.tally).active
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostReport {
    pub granted: u64,
    pub denied: u64,
    pub peak_active: usize,
    /// Active count after every watcher has finished. Always 0 for a clean run.
    pub final_active: usize,
}

pub struct Host {
    capacity: usize,
    tally: Arc<Mutex<Tally>>,
    requests: Receiver<Request>,
    granted: u64,
    denied: u64,
}

impl Host {
    pub fn new(capacity: usize) -> (Host, HostHandle) {
        let (tx, rx) = channel::channel(REQUEST_QUEUE_DEPTH);
        let tally = Arc::new(Mutex::new(Tally::default()));
        let host = Host {
            capacity,
            tally: tally.clone(),
            requests: rx,
            granted: 0,
            denied: 0,
        };
        let handle = HostHandle {
            requests: tx,
            tally,
        };
        (host, handle)
    }

    /// Serves requests until every [`HostHandle`] is dropped, then waits for
    /// the outstanding meals to be reported.
    pub async fn run(mut self) -> HostReport {
        let mut watchers = JoinSet::new();

        while let Some(request) = self.requests.recv().await {
            if let Some(done) = self.admit(request) {
                let tally = self.tally.clone();
                watchers.spawn(async move {
                    let finished = done.await.is_ok();
                    let mut tally = lock(&tally);
                    tally.active -= 1;
                    let active = tally.active;
                    (finished, active)
                });
            }
            // reap watchers that are already done
            while let Some(Some(joined)) = watchers.join_next().now_or_never() {
                self.reaped(joined);
            }
        }

        while let Some(joined) = watchers.join_next().await {
            self.reaped(joined);
        }

        let tally = lock(&self.tally);
        let report = HostReport {
            granted: self.granted,
            denied: self.denied,
            peak_active: tally.peak,
            final_active: tally.active,
        };
        debug!(?report, "host closed");
        report
    }

    // Decides one request. On a grant, returns the completion slot to watch.
    fn admit(&mut self, request: Request) -> Option<oneshot::Receiver<()>> {
        let Request {
            philosopher,
            reply,
            done,
        } = request;

        let mut tally = lock(&self.tally);
        if tally.active < self.capacity {
            tally.active += 1;
            if reply.send(true).is_err() {
                // nobody is waiting for this grant
                tally.active -= 1;
                warn!(philosopher, "philosopher left before admission");
                return None;
            }
            tally.peak = tally.peak.max(tally.active);
            self.granted += 1;
            debug!(philosopher, active = tally.active, "admitted");
            Some(done)
        } else {
            self.denied += 1;
            if reply.send(false).is_err() {
                trace!(philosopher, "philosopher left before denial");
                return None;
            }
            trace!(philosopher, active = tally.active, "denied");
            None
        }
    }

    fn reaped(&self, joined: Result<(bool, usize), tokio::task::JoinError>) {
        match joined {
            Ok((true, active)) => trace!(active, "meal finished"),
            Ok((false, active)) => warn!(active, "meal abandoned without a completion signal"),
            Err(e) => warn!("completion watcher failed: {}", e),
        }
    }
}
