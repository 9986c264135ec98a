use std::time::Duration;

use crate::error::ConfigError;

/// How long the philosophers linger at each step.
///
/// Everything is zero by default, which makes a meal instantaneous. `jitter` adds
/// up to that many extra scheduler yields around each meal and after a denial,
/// drawn from the philosopher's seeded RNG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pace {
    pub eat_time: Duration,
    pub think_time: Duration,
    pub jitter: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyConfig {
    /// Philosophers around the table, and therefore forks.
    pub philosophers: usize,
    /// Meals each philosopher eats before leaving.
    pub meals: usize,
    /// Philosophers the host admits at the same time.
    pub capacity: usize,
    pub pace: Pace,
    /// Admission attempts allowed per meal before giving up; `None` retries forever.
    pub retry_limit: Option<u64>,
    pub seed: u64,
}

impl Default for PartyConfig {
    fn default() -> Self {
        PartyConfig::new(5, 3, 2)
    }
}

impl PartyConfig {
    pub fn new(philosophers: usize, meals: usize, capacity: usize) -> Self {
        PartyConfig {
            philosophers,
            meals,
            capacity,
            pace: Pace::default(),
            retry_limit: None,
            seed: 0,
        }
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_retry_limit(mut self, limit: u64) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that `2 * capacity < philosophers`.
    ///
    /// The host does not know who sits next to whom. Only this bound keeps a
    /// full ring of first forks from forming.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.philosophers < 3 {
            return Err(ConfigError::TooFewPhilosophers {
                philosophers: self.philosophers,
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity * 2 >= self.philosophers {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.capacity,
                philosophers: self.philosophers,
            });
        }
        if self.retry_limit == Some(0) {
            return Err(ConfigError::ZeroRetryLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classic_table_is_valid() {
        assert_eq!(PartyConfig::default().validate(), Ok(()));
        assert_eq!(PartyConfig::new(3, 1, 1).validate(), Ok(()));
        assert_eq!(PartyConfig::new(5, 0, 2).validate(), Ok(()));
    }

    #[test]
    fn rejects_small_tables() {
        assert_eq!(
            PartyConfig::new(2, 3, 1).validate(),
            Err(ConfigError::TooFewPhilosophers { philosophers: 2 })
        );
        assert_eq!(
            PartyConfig::new(0, 3, 1).validate(),
            Err(ConfigError::TooFewPhilosophers { philosophers: 0 })
        );
    }

    #[test]
    fn rejects_capacity_out_of_range() {
        assert_eq!(
            PartyConfig::new(5, 3, 0).validate(),
            Err(ConfigError::ZeroCapacity)
        );
        assert_eq!(
            PartyConfig::new(6, 3, 3).validate(),
            Err(ConfigError::CapacityTooLarge {
                capacity: 3,
                philosophers: 6
            })
        );
        assert_eq!(PartyConfig::new(7, 3, 3).validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_retry_limit() {
        assert_eq!(
            PartyConfig::new(5, 1, 2).with_retry_limit(0).validate(),
            Err(ConfigError::ZeroRetryLimit)
        );
        assert_eq!(PartyConfig::new(5, 1, 2).with_retry_limit(1).validate(), Ok(()));
    }

    #[test]
    fn builders_set_fields() {
        let pace = Pace {
            eat_time: Duration::from_millis(1),
            think_time: Duration::ZERO,
            jitter: 4,
        };
        let config = PartyConfig::new(5, 3, 2)
            .with_pace(pace)
            .with_retry_limit(100)
            .with_seed(42);
        assert_eq!(config.pace, pace);
        assert_eq!(config.retry_limit, Some(100));
        assert_eq!(config.seed, 42);
    }
}
