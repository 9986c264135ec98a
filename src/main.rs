//! Runs one dinner party and prints who ate how often.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dinner_party::{DinnerParty, Pace, PartyConfig};

#[derive(Parser)]
#[command(name = "dinner-party")]
#[command(version)]
#[command(about = "Dining philosophers seated by a host")]
struct Cli {
    /// Philosophers (and forks) around the table
    #[arg(short = 'n', long, env = "DINNER_PHILOSOPHERS", default_value = "5")]
    philosophers: usize,

    /// Meals each philosopher eats before leaving
    #[arg(short, long, env = "DINNER_MEALS", default_value = "3")]
    meals: usize,

    /// Philosophers the host admits at once; must be below half the table
    #[arg(short = 'k', long, env = "DINNER_CAPACITY", default_value = "2")]
    capacity: usize,

    /// Milliseconds spent eating
    #[arg(long, env = "DINNER_EAT_MS", default_value = "0")]
    eat_ms: u64,

    /// Milliseconds spent thinking between meals
    #[arg(long, env = "DINNER_THINK_MS", default_value = "0")]
    think_ms: u64,

    /// Up to this many extra scheduler yields around each meal
    #[arg(long, env = "DINNER_JITTER", default_value = "0")]
    jitter: u32,

    /// Seed for the jitter; random when omitted
    #[arg(long, env = "DINNER_SEED")]
    seed: Option<u64>,

    /// Give up when one meal takes more admission attempts than this
    #[arg(long, env = "DINNER_RETRY_LIMIT")]
    retry_limit: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> PartyConfig {
        let mut config = PartyConfig::new(self.philosophers, self.meals, self.capacity)
            .with_pace(Pace {
                eat_time: Duration::from_millis(self.eat_ms),
                think_time: Duration::from_millis(self.think_ms),
                jitter: self.jitter,
            })
            .with_seed(self.seed.unwrap_or_else(rand::random));
        if let Some(limit) = self.retry_limit {
            config = config.with_retry_limit(limit);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let report = DinnerParty::new(cli.config())?.run().await?;

    for dinner in &report.dinners {
        println!(
            "philosopher {}: {} meals, {} denials",
            dinner.philosopher, dinner.meals, dinner.denials
        );
    }
    println!(
        "granted {} / denied {} / peak active {}",
        report.host.granted, report.host.denied, report.host.peak_active
    );

    report.check_exclusive()?;
    Ok(())
}
