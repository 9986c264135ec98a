//! Dining philosophers with a host.
//!
//! A [`Host`](host::Host) admits at most `capacity` philosophers at a time.
//! Every admitted philosopher picks up its first fork and then its second,
//! always in that order. Keeping `2 * capacity < philosophers` together with
//! the fixed pick-up order rules out circular wait, so every party finishes.
//!
//! ```no_run
//! use dinner_party::{DinnerParty, PartyConfig};
//!
//! # async fn demo() -> Result<(), dinner_party::PartyError> {
//! let report = DinnerParty::new(PartyConfig::new(5, 3, 2))?.run().await?;
//! assert_eq!(report.total_meals(), 15);
//! report.check_exclusive().expect("neighbours never share a fork");
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod fork;
pub mod host;
pub mod journal;
pub mod party;
pub mod philosopher;

pub use config::{Pace, PartyConfig};
pub use error::{ConfigError, PartyError};
pub use fork::{Fork, ForkGuard};
pub use host::{Admission, Completion, Host, HostHandle, HostReport};
pub use journal::{Event, Journal, Meal, Overlap, Transcript};
pub use party::{neighbours, DinnerParty, PartyReport};
pub use philosopher::{Dinner, Philosopher, State};

pub(crate) fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // the guarded values are plain counters and logs; a panic elsewhere leaves them usable
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
