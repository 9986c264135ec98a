use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

const FREE: usize = 0;

/// One fork on the table.
///
/// The guard is held across `.await` while eating, so this uses tokio's
/// `Mutex`. Waiters are served in FIFO order.
#[derive(Debug)]
pub struct Fork {
    id: usize,
    lock: Mutex<()>,
    holder: AtomicUsize, // philosopher id, or FREE
}

/// Holding this means holding the fork. Dropping it puts the fork down.
#[must_use = "the fork is put down as soon as the guard is dropped"]
pub struct ForkGuard<'a> {
    fork: &'a Fork,
    _guard: MutexGuard<'a, ()>,
}

impl Fork {
    pub fn new(id: usize) -> Self {
        Fork {
            id,
            lock: Mutex::new(()),
            holder: AtomicUsize::new(FREE),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Philosopher holding the fork right now, if any.
    pub fn holder(&self) -> Option<usize> {
        match self.holder.load(Ordering::Acquire) {
            FREE => None,
            id => Some(id),
        }
    }

    pub async fn acquire(&self, philosopher: usize) -> ForkGuard<'_> {
        let guard = self.lock.lock().await;
        self.pick_up(philosopher, guard)
    }

    pub fn try_acquire(&self, philosopher: usize) -> Option<ForkGuard<'_>> {
        let guard = self.lock.try_lock().ok()?;
        Some(self.pick_up(philosopher, guard))
    }

    fn pick_up<'a>(&'a self, philosopher: usize, guard: MutexGuard<'a, ()>) -> ForkGuard<'a> {
        let prev = self.holder.swap(philosopher, Ordering::AcqRel);
        debug_assert_eq!(prev, FREE, "fork {} picked up while held by {}", self.id, prev);
        trace!(fork = self.id, philosopher, "picked up fork");
        ForkGuard {
            fork: self,
            _guard: guard,
        }
    }
}

impl ForkGuard<'_> {
    pub fn fork(&self) -> usize {
        self.fork.id
    }
}

impl Drop for ForkGuard<'_> {
    // runs before `_guard` unlocks the mutex
    fn drop(&mut self) {
        let philosopher = self.fork.holder.swap(FREE, Ordering::AcqRel);
        trace!(fork = self.fork.id, philosopher, "put down fork");
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[tokio::test]
    async fn tracks_holder() {
        let fork = Fork::new(1);
        assert_eq!(fork.holder(), None);

        let guard = fork.acquire(3).await;
        assert_eq!(guard.fork(), 1);
        assert_eq!(fork.holder(), Some(3));

        drop(guard);
        assert_eq!(fork.holder(), None);
    }

    #[tokio::test]
    async fn exclusive_while_held() {
        let fork = Fork::new(1);
        let guard = fork.acquire(1).await;
        assert!(fork.try_acquire(2).is_none());
        drop(guard);

        let guard = fork.try_acquire(2).expect("fork is free");
        assert_eq!(fork.holder(), Some(2));
        drop(guard);
    }

    #[tokio::test]
    async fn waiter_gets_fork_after_release() {
        let fork = Arc::new(Fork::new(1));
        let guard = fork.acquire(1).await;

        let fork0 = fork.clone();
        let waiter = tokio::spawn(async move {
            let _guard = fork0.acquire(2).await;
            fork0.holder()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        drop(guard);

        assert_eq!(waiter.await.unwrap(), Some(2));
        assert_eq!(fork.holder(), None);
    }
}
