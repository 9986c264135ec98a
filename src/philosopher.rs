use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    config::{Pace, PartyConfig},
    error::PartyError,
    fork::Fork,
    host::{Admission, Completion, HostHandle},
    journal::Journal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingAdmission,
    Eating,
    Done,
}

/// What a philosopher reports when it leaves the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dinner {
    pub philosopher: usize,
    pub meals: usize,
    pub denials: u64,
}

pub struct Philosopher {
    id: usize,
    // always picked up in this order
    first: Arc<Fork>,
    second: Arc<Fork>,
    meals: usize,
    required: usize,
    denials: u64,
    state: watch::Sender<State>,
    host: HostHandle,
    journal: Journal,
    pace: Pace,
    retry_limit: Option<u64>,
    rng: StdRng,
}

impl Philosopher {
    pub fn new(
        id: usize,
        first: Arc<Fork>,
        second: Arc<Fork>,
        host: HostHandle,
        journal: Journal,
        config: &PartyConfig,
    ) -> Self {
        Philosopher {
            id,
            first,
            second,
            meals: 0,
            required: config.meals,
            denials: 0,
            state: watch::channel(State::Idle).0,
            host,
            journal,
            pace: config.pace,
            retry_limit: config.retry_limit,
            // one stream per seat so runs with the same seed line up
            rng: StdRng::seed_from_u64(config.seed ^ id as u64),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Follows the state after the philosopher has been handed to [`dine`](Self::dine).
    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Ids of the first and second fork.
    pub fn forks(&self) -> (usize, usize) {
        (self.first.id(), self.second.id())
    }

    /// Eats the required number of meals, then leaves.
    pub async fn dine(mut self) -> Result<Dinner, PartyError> {
        while self.meals < self.required {
            let completion = self.seek_admission().await?;
            self.eat(completion).await;
            self.meals += 1;
            self.enter(State::Idle);

            if self.meals < self.required && !self.pace.think_time.is_zero() {
                tokio::time::sleep(self.pace.think_time).await;
            }
        }

        self.enter(State::Done);
        debug!(
            philosopher = self.id,
            meals = self.meals,
            denials = self.denials,
            "leaves the table"
        );
        Ok(Dinner {
            philosopher: self.id,
            meals: self.meals,
            denials: self.denials,
        })
    }

    // A denial is not an error: ask again right away.
    async fn seek_admission(&mut self) -> Result<Completion, PartyError> {
        let mut attempts = 0;
        loop {
            if let Some(limit) = self.retry_limit {
                if attempts >= limit {
                    return Err(PartyError::Starved {
                        philosopher: self.id,
                        attempts,
                    });
                }
            }
            attempts += 1;

            self.enter(State::AwaitingAdmission);
            match self.host.request(self.id).await? {
                Admission::Granted(completion) => {
                    self.enter(State::Eating);
                    return Ok(completion);
                }
                Admission::Denied => {
                    self.denials += 1;
                    self.enter(State::Idle);
                    self.jitter().await;
                }
            }
        }
    }

    async fn eat(&mut self, completion: Completion) {
        let first = self.first.clone();
        let second = self.second.clone();

        let f1 = first.acquire(self.id).await;
        let f2 = second.acquire(self.id).await;

        self.journal.begin(self.id);
        info!(philosopher = self.id, "starts eating");
        self.jitter().await;
        if !self.pace.eat_time.is_zero() {
            tokio::time::sleep(self.pace.eat_time).await;
        }
        info!(philosopher = self.id, "finishes eating");
        self.journal.end(self.id);

        drop(f2);
        drop(f1);
        completion.finish();
    }

    fn enter(&self, state: State) {
        let from = self.state.send_replace(state);
        debug!(philosopher = self.id, ?from, to = ?state, "state");
    }

    async fn jitter(&mut self) {
        if self.pace.jitter == 0 {
            return;
        }
        let n = self.rng.gen_range(0..=self.pace.jitter);
        for _ in 0..n {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::host::Host;

    fn seat(id: usize, host: &HostHandle, config: &PartyConfig) -> (Philosopher, Journal) {
        let journal = Journal::new();
        let p = Philosopher::new(
            id,
            Arc::new(Fork::new(1)),
            Arc::new(Fork::new(2)),
            host.clone(),
            journal.clone(),
            config,
        );
        (p, journal)
    }

    #[tokio::test]
    async fn eats_required_meals() {
        let (host, handle) = Host::new(1);
        let host = tokio::spawn(host.run());
        let config = PartyConfig::new(5, 3, 1);
        let (p, journal) = seat(1, &handle, &config);
        drop(handle);

        assert_eq!(p.state(), State::Idle);
        assert_eq!(p.forks(), (1, 2));

        let dinner = p.dine().await.unwrap();
        assert_eq!(
            dinner,
            Dinner {
                philosopher: 1,
                meals: 3,
                denials: 0
            }
        );
        assert_eq!(journal.len(), 6);
        assert_eq!(journal.transcript().total_meals(), 3);

        let report = host.await.unwrap();
        assert_eq!(report.granted, 3);
        assert_eq!(report.final_active, 0);
    }

    async fn reach(rx: &mut watch::Receiver<State>, state: State) {
        let wait = rx.wait_for(|s| *s == state);
        tokio::time::timeout(std::time::Duration::from_secs(5), wait)
            .await
            .expect("state never reached")
            .unwrap();
    }

    #[tokio::test]
    async fn publishes_each_state() {
        // host not serving yet: the request sits in the queue
        let (host, handle) = Host::new(1);
        let (p, journal) = seat(1, &handle, &PartyConfig::new(5, 1, 1));
        drop(handle);
        let mut states = p.watch_state();

        let second = p.second.clone();
        let guard = second.acquire(7).await;
        let dining = tokio::spawn(p.dine());

        reach(&mut states, State::AwaitingAdmission).await;
        let host = tokio::spawn(host.run());

        // admitted but still waiting for the second fork
        reach(&mut states, State::Eating).await;
        assert!(journal.is_empty());
        assert_eq!(second.holder(), Some(7));

        drop(guard);
        reach(&mut states, State::Done).await;
        assert_eq!(dining.await.unwrap().unwrap().meals, 1);
        assert_eq!(*states.borrow(), State::Done);
        assert_eq!(host.await.unwrap().final_active, 0);
    }

    #[tokio::test]
    async fn no_meals_means_no_requests() {
        let (host, handle) = Host::new(1);
        let host = tokio::spawn(host.run());
        let (p, journal) = seat(2, &handle, &PartyConfig::new(5, 0, 1));
        drop(handle);

        let dinner = p.dine().await.unwrap();
        assert_eq!(dinner.meals, 0);
        assert!(journal.is_empty());
        assert_eq!(host.await.unwrap().granted, 0);
    }

    #[tokio::test]
    async fn gives_up_after_retry_limit() {
        let (host, handle) = Host::new(1);
        let host = tokio::spawn(host.run());

        // hold the only slot for the whole test
        let held = match handle.request(9).await.unwrap() {
            Admission::Granted(c) => c,
            Admission::Denied => panic!("expected a grant"),
        };

        let config = PartyConfig::new(5, 1, 1).with_retry_limit(4);
        let (p, journal) = seat(1, &handle, &config);
        drop(handle);

        let err = p.dine().await.unwrap_err();
        assert!(matches!(
            err,
            PartyError::Starved {
                philosopher: 1,
                attempts: 4
            }
        ));
        assert!(journal.is_empty());

        held.finish();
        let report = host.await.unwrap();
        assert_eq!(report.denied, 4);
        assert_eq!(report.final_active, 0);
    }

    #[tokio::test]
    async fn waits_for_busy_fork() {
        let (host, handle) = Host::new(1);
        let host = tokio::spawn(host.run());
        let config = PartyConfig::new(5, 1, 1);
        let (p, journal) = seat(1, &handle, &config);
        drop(handle);

        let second = p.second.clone();
        let guard = second.acquire(7).await;
        let dining = tokio::spawn(p.dine());

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(journal.is_empty());
        drop(guard);

        assert_eq!(dining.await.unwrap().unwrap().meals, 1);
        assert_eq!(host.await.unwrap().final_active, 0);
    }
}
