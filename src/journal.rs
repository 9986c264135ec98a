//! Ordered record of meals and the checks run over it.
//!
//! Philosophers write `Begin` while they already hold both forks and `End`
//! before putting them down. The event order therefore nests inside the real
//! holding intervals, and any overlap between neighbours in the transcript is a
//! real overlap.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meal {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub seq: usize,
    pub philosopher: usize,
    pub meal: Meal,
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    pub fn new() -> Self {
        Journal::default()
    }

    pub fn begin(&self, philosopher: usize) {
        self.record(philosopher, Meal::Begin);
    }

    pub fn end(&self, philosopher: usize) {
        self.record(philosopher, Meal::End);
    }

    fn record(&self, philosopher: usize, meal: Meal) {
        let mut events = lock(&self.events);
        let seq = events.len();
        events.push(Event {
            seq,
            philosopher,
            meal,
        });
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transcript(&self) -> Transcript {
        Transcript(lock(&self.events).clone())
    }
}

/// Two philosophers who share a fork were eating at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("philosophers {a} and {b} were eating together at event {seq}")]
pub struct Overlap {
    pub a: usize,
    pub b: usize,
    pub seq: usize,
}

/// Frozen copy of a journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript(pub Vec<Event>);

impl Transcript {
    pub fn events(&self) -> &[Event] {
        &self.0
    }

    /// Completed begin/end pairs per philosopher. An `End` without an open
    /// `Begin` is not counted.
    pub fn meals_by_philosopher(&self) -> BTreeMap<usize, usize> {
        let mut open = BTreeSet::new();
        let mut meals = BTreeMap::new();
        for e in &self.0 {
            match e.meal {
                Meal::Begin => {
                    open.insert(e.philosopher);
                }
                Meal::End => {
                    if open.remove(&e.philosopher) {
                        *meals.entry(e.philosopher).or_insert(0) += 1;
                    }
                }
            }
        }
        meals
    }

    pub fn total_meals(&self) -> usize {
        self.meals_by_philosopher().values().sum()
    }

    /// Most philosophers between `Begin` and `End` at once.
    pub fn max_concurrent_eaters(&self) -> usize {
        let mut open = BTreeSet::new();
        let mut max = 0;
        for e in &self.0 {
            match e.meal {
                Meal::Begin => {
                    open.insert(e.philosopher);
                    max = max.max(open.len());
                }
                Meal::End => {
                    open.remove(&e.philosopher);
                }
            }
        }
        max
    }

    /// Fails on the first `Begin` of a philosopher whose partner in any of
    /// `pairs` is still eating.
    pub fn check_exclusive(&self, pairs: &[(usize, usize)]) -> Result<(), Overlap> {
        let mut open = BTreeSet::new();
        for e in &self.0 {
            match e.meal {
                Meal::Begin => {
                    for &(a, b) in pairs {
                        let other = if a == e.philosopher {
                            b
                        } else if b == e.philosopher {
                            a
                        } else {
                            continue;
                        };
                        if open.contains(&other) {
                            return Err(Overlap { a, b, seq: e.seq });
                        }
                    }
                    open.insert(e.philosopher);
                }
                Meal::End => {
                    open.remove(&e.philosopher);
                }
            }
        }
        Ok(())
    }
}
