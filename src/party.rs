use std::{collections::BTreeMap, sync::Arc};

use tracing::info;

use crate::{
    config::PartyConfig,
    error::{ConfigError, PartyError},
    fork::Fork,
    host::{Host, HostReport},
    journal::{Journal, Overlap, Transcript},
    philosopher::{Dinner, Philosopher},
};

/// Pairs of philosopher ids that share a fork around a table of `philosophers`.
pub fn neighbours(philosophers: usize) -> Vec<(usize, usize)> {
    (1..=philosophers).map(|i| (i, i % philosophers + 1)).collect()
}

/// A table set for dinner: forks laid out, philosophers seated, host waiting.
pub struct DinnerParty {
    config: PartyConfig,
    forks: Vec<Arc<Fork>>,
    philosophers: Vec<Philosopher>,
    host: Host,
    journal: Journal,
}

impl DinnerParty {
    pub fn new(config: PartyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let n = config.philosophers;
        let forks: Vec<_> = (1..=n).map(|id| Arc::new(Fork::new(id))).collect();
        let (host, handle) = Host::new(config.capacity);
        let journal = Journal::new();

        // philosopher i takes fork i first, then the next fork around the table
        let philosophers = (0..n)
            .map(|i| {
                Philosopher::new(
                    i + 1,
                    forks[i].clone(),
                    forks[(i + 1) % n].clone(),
                    handle.clone(),
                    journal.clone(),
                    &config,
                )
            })
            .collect();

        Ok(DinnerParty {
            config,
            forks,
            philosophers,
            host,
            journal,
        })
    }

    pub fn config(&self) -> &PartyConfig {
        &self.config
    }

    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    /// Runs until every philosopher has left. The host stops once the last
    /// philosopher drops its handle.
    pub async fn run(self) -> Result<PartyReport, PartyError> {
        let DinnerParty {
            config,
            philosophers,
            host,
            journal,
            ..
        } = self;
        info!(
            philosophers = config.philosophers,
            meals = config.meals,
            capacity = config.capacity,
            seed = config.seed,
            "dinner starts"
        );

        let host = tokio::spawn(host.run());

        let mut v = Vec::new();
        for p in philosophers {
            v.push(tokio::spawn(p.dine()));
        }

        let mut dinners = Vec::with_capacity(v.len());
        for joined in futures::future::join_all(v).await {
            dinners.push(joined??);
        }

        let host = host.await?;
        info!(
            granted = host.granted,
            denied = host.denied,
            peak_active = host.peak_active,
            "dinner is over"
        );

        Ok(PartyReport {
            philosophers: config.philosophers,
            dinners,
            host,
            transcript: journal.transcript(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PartyReport {
    pub philosophers: usize,
    /// One entry per philosopher, in seat order.
    pub dinners: Vec<Dinner>,
    pub host: HostReport,
    pub transcript: Transcript,
}

impl PartyReport {
    pub fn total_meals(&self) -> usize {
        self.transcript.total_meals()
    }

    pub fn meals_by_philosopher(&self) -> BTreeMap<usize, usize> {
        self.transcript.meals_by_philosopher()
    }

    pub fn total_denials(&self) -> u64 {
        self.dinners.iter().map(|d| d.denials).sum()
    }

    pub fn max_concurrent_eaters(&self) -> usize {
        self.transcript.max_concurrent_eaters()
    }

    /// No two philosophers sharing a fork ever ate at the same time.
    pub fn check_exclusive(&self) -> Result<(), Overlap> {
        self.transcript
            .check_exclusive(&neighbours(self.philosophers))
    }
}
