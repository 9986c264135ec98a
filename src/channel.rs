//! Bounded FIFO channel for admission requests.
//!
//! A fair semaphore bounds how many items can sit in the queue, so senders
//! get their slots in arrival order. A `Notify` wakes the single receiver.
//! `recv` returns `None` once every sender is gone and the queue is empty.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use thiserror::Error;
use tokio::sync::{Notify, Semaphore};

use crate::lock;

struct Shared<T> {
    semaphore: Semaphore,   // free slots in the queue
    buf: Mutex<VecDeque<T>>, // queue
    notify: Notify,
    senders: AtomicUsize,
}

pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

/// The receiver is gone; the value comes back to the caller.
#[derive(Error)]
#[error("channel receiver dropped")]
pub struct SendError<T>(pub T);

// no `T: Debug` bound, so any request type can travel
impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError(..)")
    }
}

impl<T> Sender<T> {
    /// Waits for a free slot, then enqueues `data`.
    pub async fn send(&self, data: T) -> Result<(), SendError<T>> {
        match self.shared.semaphore.acquire().await {
            // the receiver hands the slot back when it pops
            Ok(permit) => permit.forget(),
            Err(_) => return Err(SendError(data)),
        }
        lock(&self.shared.buf).push_back(data);
        self.shared.notify.notify_one();
        Ok(())
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Sender {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // last sender: wake the receiver so it can observe the close
            self.shared.notify.notify_one();
        }
    }
}

impl<T> Receiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            {
                let mut buf = lock(&self.shared.buf);
                if let Some(data) = buf.pop_front() {
                    self.shared.semaphore.add_permits(1);
                    return Some(data);
                }
                if self.shared.senders.load(Ordering::Acquire) == 0 {
                    return None;
                }
            }
            // notify_one stores a permit when nobody waits, so no wakeup is lost
            self.shared.notify.notified().await;
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shared.semaphore.close();
    }
}

pub fn channel<T>(max: usize) -> (Sender<T>, Receiver<T>) {
    assert!(max > 0);
    let shared = Arc::new(Shared {
        semaphore: Semaphore::new(max),
        buf: Mutex::new(VecDeque::with_capacity(max)),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
    });
    let tx = Sender {
        shared: shared.clone(),
    };
    let rx = Receiver { shared };
    (tx, rx)
}
