//! Dutch auction CLI - price inspection and scripted simulation
//!
//! Inspects the decay schedule of the auction engine, probes the checked
//! 256-bit arithmetic, and runs TOML scenarios end to end against an
//! in-memory ledger.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dutch_auction::DecaySchedule;
use std::path::PathBuf;

mod arith;
mod config;
mod pricing;
mod report;
mod simulate;

use config::{parse_amount, Scenario};

#[derive(Parser)]
#[command(name = "dutch")]
#[command(about = "Dutch auction CLI - inspect price curves and simulate auctions", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show price and cap at one point in time
    Price {
        /// Sale quantity in base units (decimal or `<digits>e<exp>`)
        quantity: String,

        /// Seconds since the auction started
        #[arg(short, long, default_value = "0")]
        elapsed: u64,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },

    /// Tabulate price and cap over time
    Schedule {
        /// Sale quantity in base units
        quantity: String,

        /// Last elapsed second to tabulate
        #[arg(long, default_value = "3196800")]
        until: u64,

        /// Seconds between rows
        #[arg(long, default_value = "86400")]
        step: u64,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        schedule: ScheduleArgs,
    },

    /// Run a scenario file
    Simulate {
        /// Path to the scenario TOML
        scenario: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a checked signed 256-bit operation
    Math {
        #[arg(value_enum)]
        op: arith::Op,

        #[arg(allow_hyphen_values = true)]
        a: String,

        #[arg(allow_hyphen_values = true)]
        b: String,
    },
}

/// Decay schedule overrides
#[derive(Args)]
struct ScheduleArgs {
    /// Decay period length in seconds
    #[arg(long)]
    period: Option<u64>,

    /// Opening price exponent (price = 10^E at start)
    #[arg(long)]
    ceiling_exponent: Option<u32>,

    /// Fraction of the price shed per period, as `num/den`
    #[arg(long)]
    decay: Option<String>,
}

impl ScheduleArgs {
    fn resolve(&self) -> anyhow::Result<DecaySchedule> {
        let mut schedule = DecaySchedule::default();
        if let Some(period) = self.period {
            schedule.period_secs = period;
        }
        if let Some(exp) = self.ceiling_exponent {
            schedule.ceiling_exponent = exp;
        }
        if let Some(decay) = &self.decay {
            let (num, den) = decay
                .split_once('/')
                .with_context(|| format!("Decay must be num/den: {}", decay))?;
            schedule.decay_numerator = num.trim().parse().context("Invalid decay numerator")?;
            schedule.decay_denominator = den.trim().parse().context("Invalid decay denominator")?;
        }
        Ok(schedule)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Price { quantity, elapsed, schedule } => {
            pricing::show_price(parse_amount(&quantity)?, elapsed, schedule.resolve()?)?;
        }
        Commands::Schedule { quantity, until, step, json, schedule } => {
            pricing::show_schedule(parse_amount(&quantity)?, until, step, schedule.resolve()?, json)?;
        }
        Commands::Simulate { scenario, json } => {
            let scenario = Scenario::load(&scenario)?;
            let report = simulate::run(&scenario)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
        Commands::Math { op, a, b } => {
            arith::run(op, &a, &b)?;
        }
    }

    if cli.verbose {
        println!("\n{}", "Done.".dimmed());
    }

    Ok(())
}
